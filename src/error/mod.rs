//! Error handling module for shortclip

use thiserror::Error;

use crate::domain::errors::DomainError;

/// Main error type for service startup and configuration
#[derive(Error, Debug)]
pub enum ShortclipError {
    /// Configuration file missing or unreadable
    #[error("Failed to read config file {path}: {message}")]
    ConfigRead { path: String, message: String },

    /// Configuration file is not valid TOML for the expected schema
    #[error("Failed to parse config file {path}: {message}")]
    ConfigParse { path: String, message: String },

    /// Configuration values are inconsistent
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Environment override could not be parsed
    #[error("Invalid value for {var}: {value}")]
    InvalidEnv { var: String, value: String },

    /// Logging subscriber could not be installed
    #[error("Failed to initialize logging: {message}")]
    LoggingInit { message: String },

    /// HTTP client construction failed
    #[error("Failed to build HTTP client: {message}")]
    HttpClient { message: String },

    /// Domain error surfaced at startup
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for shortclip operations
pub type ShortclipResult<T> = std::result::Result<T, ShortclipError>;
