// Probe LibAV adapter - In-process duration probing through libav

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ffmpeg_next as ffmpeg;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// LibAV-based probe adapter; avoids spawning ffprobe per request
pub struct ProbeLibavAdapter;

impl ProbeLibavAdapter {
    /// Create new LibAV probing adapter
    pub fn new() -> Result<Self, DomainError> {
        ffmpeg::init().map_err(|e| DomainError::ProbeFailure(e.to_string()))?;
        Ok(Self)
    }

    fn read_duration(path: PathBuf) -> Result<f64, DomainError> {
        let context = ffmpeg::format::input(&path).map_err(|e| {
            DomainError::ProbeFailure(format!("Cannot open {}: {}", path.display(), e))
        })?;
        let raw = context.duration();
        if raw <= 0 {
            return Err(DomainError::ProbeFailure(format!(
                "Container reports no duration for {}",
                path.display()
            )));
        }
        Ok(raw as f64 / f64::from(ffmpeg::ffi::AV_TIME_BASE))
    }
}

#[async_trait]
impl ProbePort for ProbeLibavAdapter {
    async fn probe_duration(&self, file_path: &Path) -> Result<f64, DomainError> {
        if !file_path.exists() {
            return Err(DomainError::FileNotFound(file_path.display().to_string()));
        }
        let path = file_path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::read_duration(path))
            .await
            .map_err(|e| DomainError::ProbeFailure(format!("Probe task failed: {}", e)))?
    }

    async fn status(&self) -> ToolStatus {
        ToolStatus {
            name: "probe".to_string(),
            program: "libav".to_string(),
            available: true,
        }
    }
}
