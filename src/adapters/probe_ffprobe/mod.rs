//! FFprobe adapter for media file probing
//!
//! Reads the container duration with
//! `ffprobe -v quiet -show_entries format=duration -of default=noprint_wrappers=1:nokey=1`.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::adapters::process::{is_program_available, ToolCommand};
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// FFprobe-based probe adapter
pub struct FFprobeAdapter {
    program: String,
    timeout: Option<Duration>,
}

impl FFprobeAdapter {
    /// Create new FFprobe adapter
    pub fn new(program: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    fn command(&self, file_path: &Path) -> ToolCommand {
        ToolCommand::new(&self.program)
            .args([
                "-v",
                "quiet",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(file_path.to_string_lossy())
            .timeout(self.timeout)
    }
}

/// Parse the bare duration ffprobe prints
pub fn parse_duration_output(stdout: &str) -> Result<f64, DomainError> {
    let trimmed = stdout.trim();
    let duration = trimmed.parse::<f64>().map_err(|_| {
        DomainError::ProbeFailure(format!("Unparsable duration output: {:?}", trimmed))
    })?;
    if !duration.is_finite() || duration <= 0.0 {
        return Err(DomainError::ProbeFailure(format!(
            "Probe reported unusable duration: {}",
            trimmed
        )));
    }
    Ok(duration)
}

#[async_trait]
impl ProbePort for FFprobeAdapter {
    async fn probe_duration(&self, file_path: &Path) -> Result<f64, DomainError> {
        if !file_path.exists() {
            return Err(DomainError::FileNotFound(file_path.display().to_string()));
        }

        let output = self
            .command(file_path)
            .run()
            .await
            .map_err(|e| DomainError::ProbeFailure(e.to_string()))?;

        if !output.success {
            warn!(
                path = %file_path.display(),
                stderr = %output.stderr_tail(5),
                "ffprobe failed"
            );
            return Err(DomainError::ProbeFailure(format!(
                "ffprobe exited with {:?}: {}",
                output.exit_code,
                output.stderr_tail(5)
            )));
        }

        let duration = parse_duration_output(&output.stdout)?;
        debug!(path = %file_path.display(), duration, "Probed source duration");
        Ok(duration)
    }

    async fn status(&self) -> ToolStatus {
        ToolStatus {
            name: "probe".to_string(),
            program: self.program.clone(),
            available: is_program_available(&self.program),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_output() {
        assert_eq!(parse_duration_output("123.456000\n").unwrap(), 123.456);
        assert_eq!(parse_duration_output("  45 ").unwrap(), 45.0);
    }

    #[test]
    fn test_parse_duration_output_rejects_garbage() {
        for bad in ["", "N/A", "-1", "0", "inf"] {
            let err = parse_duration_output(bad).unwrap_err();
            assert_eq!(err.kind(), "probe_failure", "{bad}");
        }
    }

    #[test]
    fn test_command_line() {
        let adapter = FFprobeAdapter::new("ffprobe", None);
        let command = adapter.command(Path::new("/tmp/video.mp4"));
        assert_eq!(command.program(), "ffprobe");
        assert_eq!(
            command.get_args().last().map(String::as_str),
            Some("/tmp/video.mp4")
        );
        assert!(command
            .get_args()
            .windows(2)
            .any(|w| w[0] == "-show_entries" && w[1] == "format=duration"));
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let adapter = FFprobeAdapter::new("ffprobe", None);
        let err = adapter
            .probe_duration(Path::new("/nonexistent/shortclip.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::FileNotFound(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_tool_is_probe_failure() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let adapter = FFprobeAdapter::new("false", None);
        let err = adapter.probe_duration(file.path()).await.unwrap_err();
        assert!(matches!(err, DomainError::ProbeFailure(_)));
    }
}
