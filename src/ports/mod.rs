// Ports - Interface definitions (contracts)
//
// One trait per external collaborator so that alternate backends can be
// swapped in without touching the selection logic.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::errors::*;
use crate::domain::model::*;

/// Port for fetching the source video to a local path
#[async_trait]
pub trait SourcePort: Send + Sync {
    /// Make sure the source is present locally, downloading it when needed
    async fn ensure_local(&self) -> Result<PathBuf, DomainError>;

    /// The external downloader this source depends on, if any
    async fn status(&self) -> Option<ToolStatus> {
        None
    }
}

/// Port for reading a media file's container duration
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Total duration in seconds
    async fn probe_duration(&self, file_path: &Path) -> Result<f64, DomainError>;

    /// Whether the backing tool can be used at all
    async fn status(&self) -> ToolStatus;
}

/// Port for cutting, cropping and re-encoding a clip
#[async_trait]
pub trait ExtractPort: Send + Sync {
    /// Run the extraction; `Ok` carries the tool's diagnostic output
    async fn extract(&self, job: &ExtractionJob) -> Result<ToolOutput, DomainError>;

    /// Whether the backing tool can be used at all
    async fn status(&self) -> ToolStatus;
}

/// Request handed to transcription and render tools
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub session: SessionId,
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Port for producing a transcript next to a clip
#[async_trait]
pub trait TranscribePort: Send + Sync {
    async fn transcribe(&self, invocation: &ToolInvocation) -> Result<ToolOutput, DomainError>;
}

/// Port for rendering the captioned video
#[async_trait]
pub trait RenderPort: Send + Sync {
    async fn render(&self, invocation: &ToolInvocation) -> Result<ToolOutput, DomainError>;
}
