//! yt-dlp source adapter
//!
//! Resolves a video page URL (YouTube and similar sites) and downloads the best
//! video and audio streams merged into a single mp4.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::adapters::process::{is_program_available, ToolCommand};
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// Output template naming the download after the video title
pub const TITLE_TEMPLATE: &str = "%(title)s.%(ext)s";

/// The yt-dlp command line tool
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: String,
    timeout: Option<Duration>,
}

impl YtDlp {
    pub fn new(program: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn command(&self, url: &str, template: &Path) -> ToolCommand {
        ToolCommand::new(&self.program)
            .args([
                "--no-playlist",
                "--no-progress",
                "-f",
                "bestvideo+bestaudio/best",
                "--merge-output-format",
                "mp4",
                // Report the final file name once merging is done
                "--no-simulate",
                "--print",
                "after_move:filepath",
                "-o",
            ])
            .arg(template.to_string_lossy())
            .arg(url)
            .timeout(self.timeout)
    }

    /// Download `url` to a file named by the output `template`; returns the file written
    pub async fn download(&self, url: &str, template: &Path) -> Result<PathBuf, DomainError> {
        info!(url, template = %template.display(), "Fetching video with yt-dlp");

        let output = self
            .command(url, template)
            .run()
            .await
            .map_err(|e| DomainError::DownloadFailure(e.to_string()))?;

        if !output.success {
            warn!(url, stderr = %output.stderr_tail(5), "yt-dlp failed");
            return Err(DomainError::DownloadFailure(format!(
                "yt-dlp exited with {:?}: {}",
                output.exit_code,
                output.stderr_tail(5)
            )));
        }

        let path = parse_printed_path(&output.stdout)?;
        if !path.is_file() {
            return Err(DomainError::DownloadFailure(format!(
                "yt-dlp reported {} but the file does not exist",
                path.display()
            )));
        }
        info!(url, path = %path.display(), "yt-dlp download complete");
        Ok(path)
    }

    pub fn status(&self) -> ToolStatus {
        ToolStatus {
            name: "download".to_string(),
            program: self.program.clone(),
            available: is_program_available(&self.program),
        }
    }
}

/// The last non-empty line yt-dlp printed is the downloaded file
pub fn parse_printed_path(stdout: &str) -> Result<PathBuf, DomainError> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .map(PathBuf::from)
        .ok_or_else(|| DomainError::DownloadFailure("yt-dlp did not report an output file".to_string()))
}

/// Source fetched with yt-dlp and cached at a fixed path
pub struct YtDlpSourceAdapter {
    ytdlp: YtDlp,
    url: Option<String>,
    path: PathBuf,
    refresh: bool,
    fetch_lock: Mutex<()>,
}

impl YtDlpSourceAdapter {
    pub fn new(ytdlp: YtDlp, url: Option<String>, path: impl Into<PathBuf>, refresh: bool) -> Self {
        Self {
            ytdlp,
            url,
            path: path.into(),
            refresh,
            fetch_lock: Mutex::new(()),
        }
    }

    async fn fetch(&self, url: &str) -> Result<(), DomainError> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&parent)
            .await
            .map_err(|e| DomainError::io(parent.display(), e))?;

        // Staged next to the target so the final rename stays on one filesystem
        let staging = tempfile::Builder::new()
            .prefix(".ytdlp-")
            .tempdir_in(&parent)
            .map_err(|e| DomainError::io(parent.display(), e))?;
        let fetched = self
            .ytdlp
            .download(url, &staging.path().join("source.%(ext)s"))
            .await?;

        tokio::fs::rename(&fetched, &self.path)
            .await
            .map_err(|e| DomainError::io(self.path.display(), e))
    }
}

#[async_trait]
impl SourcePort for YtDlpSourceAdapter {
    async fn ensure_local(&self) -> Result<PathBuf, DomainError> {
        let _guard = self.fetch_lock.lock().await;

        let present = tokio::fs::metadata(&self.path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if present && !self.refresh {
            return Ok(self.path.clone());
        }

        match self.url.as_deref() {
            Some(url) => {
                self.fetch(url).await?;
                Ok(self.path.clone())
            }
            None if present => Ok(self.path.clone()),
            None => Err(DomainError::DownloadFailure(format!(
                "Source {} is missing and no source URL is configured",
                self.path.display()
            ))),
        }
    }

    async fn status(&self) -> Option<ToolStatus> {
        Some(self.ytdlp.status())
    }
}
