//! shortclip library
//!
//! Picks a random window of a source video, crops it to a vertical frame and
//! runs it through optional transcription and render steps. Exposed as an HTTP
//! service and a small CLI.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod error;
pub mod http;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use adapters::toml_config::AppConfig;
pub use domain::errors::DomainError;
pub use domain::model::{ClipPlan, DurationRange, SessionId, ShortSourcePolicy};
pub use domain::rules::ClipSelector;
pub use error::{ShortclipError, ShortclipResult};
