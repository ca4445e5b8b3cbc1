// Domain errors - Error types for the domain layer

use thiserror::Error;

/// Domain-specific error types
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DomainError {
    /// Invalid arguments provided
    #[error("Bad arguments: {0}")]
    BadArgs(String),

    /// Source video could not be fetched
    #[error("Download failed: {0}")]
    DownloadFailure(String),

    /// Duration probe failed or produced unusable output
    #[error("Probe failed: {0}")]
    ProbeFailure(String),

    /// Source is shorter than the sampled clip and the policy rejects it
    #[error("Source too short: {total:.2}s available, {requested:.0}s requested")]
    ClipTooLong { total: f64, requested: f64 },

    /// Extraction tool exited unsuccessfully
    #[error("Extraction failed: {message}")]
    ExtractionFailure {
        message: String,
        stderr: Option<String>,
    },

    /// Transcription script exited unsuccessfully
    #[error("Transcription failed: {0}")]
    TranscriptionFailure(String),

    /// Render pipeline exited unsuccessfully
    #[error("Render failed: {0}")]
    RenderFailure(String),

    /// Requested file or session does not exist
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Path escapes its allowed root or names a root that is not allowed
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(String),
}

impl DomainError {
    /// Stable machine-readable kind used in error payloads
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::BadArgs(_) => "bad_args",
            DomainError::DownloadFailure(_) => "download_failure",
            DomainError::ProbeFailure(_) => "probe_failure",
            DomainError::ClipTooLong { .. } => "clip_too_long",
            DomainError::ExtractionFailure { .. } => "extraction_failure",
            DomainError::TranscriptionFailure(_) => "transcription_failure",
            DomainError::RenderFailure(_) => "render_failure",
            DomainError::FileNotFound(_) => "file_not_found",
            DomainError::Forbidden(_) => "forbidden",
            DomainError::Io(_) => "io",
        }
    }

    /// Wrap an I/O error with the path it concerns
    pub fn io(context: impl std::fmt::Display, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            DomainError::FileNotFound(context.to_string())
        } else {
            DomainError::Io(format!("{}: {}", context, err))
        }
    }
}
