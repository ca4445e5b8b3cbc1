//! HTTP source adapter
//!
//! Streams the configured source URL into a temp file next to the target and
//! renames it into place, so readers never see a partial download.

use std::path::PathBuf;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::domain::errors::*;
use crate::ports::*;

/// Downloads the source video on demand and caches it locally
pub struct HttpSourceAdapter {
    client: reqwest::Client,
    url: Option<String>,
    path: PathBuf,
    refresh: bool,
    // Serializes fetches so concurrent requests never race on the cached file
    fetch_lock: Mutex<()>,
}

impl HttpSourceAdapter {
    pub fn new(
        client: reqwest::Client,
        url: Option<String>,
        path: impl Into<PathBuf>,
        refresh: bool,
    ) -> Self {
        Self {
            client,
            url,
            path: path.into(),
            refresh,
            fetch_lock: Mutex::new(()),
        }
    }

    async fn download(&self, url: &str) -> Result<u64, DomainError> {
        info!(url, destination = %self.path.display(), "Downloading source video");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| DomainError::DownloadFailure(e.to_string()))?;

        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&parent)
            .await
            .map_err(|e| DomainError::io(parent.display(), e))?;

        let staging = tempfile::Builder::new()
            .prefix(".download-")
            .suffix(".part")
            .tempfile_in(&parent)
            .map_err(|e| DomainError::io(parent.display(), e))?;
        let std_file = staging
            .reopen()
            .map_err(|e| DomainError::io(staging.path().display(), e))?;
        let mut file = tokio::fs::File::from_std(std_file);

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| DomainError::DownloadFailure(e.to_string()))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| DomainError::io(staging.path().display(), e))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| DomainError::io(staging.path().display(), e))?;
        drop(file);

        if written == 0 {
            return Err(DomainError::DownloadFailure(format!(
                "{} returned an empty body",
                url
            )));
        }

        staging
            .persist(&self.path)
            .map_err(|e| DomainError::io(self.path.display(), e.error))?;

        info!(bytes = written, destination = %self.path.display(), "Source video downloaded");
        Ok(written)
    }
}

#[async_trait]
impl SourcePort for HttpSourceAdapter {
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
                self.download(url).await?;
                Ok(self.path.clone())
            }
            None if present => Ok(self.path.clone()),
            None => {
                warn!(path = %self.path.display(), "Source missing and no URL configured");
                Err(DomainError::DownloadFailure(format!(
                    "Source {} is missing and no source URL is configured",
                    self.path.display()
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_existing_file_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("video.mp4");
        std::fs::write(&path, b"cached").unwrap();

        let adapter = HttpSourceAdapter::new(reqwest::Client::new(), None, &path, false);
        assert_eq!(adapter.ensure_local().await.unwrap(), path);
        assert_eq!(std::fs::read(&path).unwrap(), b"cached");
    }

    #[tokio::test]
    async fn test_missing_file_without_url_fails() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = HttpSourceAdapter::new(
            reqwest::Client::new(),
            None,
            dir.path().join("video.mp4"),
            false,
        );
        let err = adapter.ensure_local().await.unwrap_err();
        assert_eq!(err.kind(), "download_failure");
    }

    #[tokio::test]
    async fn test_downloads_missing_source() {
        let base = serve(Router::new().route("/video.mp4", get(|| async { "fake-video-bytes" }))).await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("video.mp4");

        let adapter = HttpSourceAdapter::new(
            reqwest::Client::new(),
            Some(format!("{}/video.mp4", base)),
            &path,
            false,
        );
        adapter.ensure_local().await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"fake-video-bytes");
        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_http_error_is_download_failure() {
        let base = serve(Router::new().route(
            "/video.mp4",
            get(|| async { (StatusCode::NOT_FOUND, "gone") }),
        ))
        .await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("video.mp4");

        let adapter = HttpSourceAdapter::new(
            reqwest::Client::new(),
            Some(format!("{}/video.mp4", base)),
            &path,
            false,
        );
        let err = adapter.ensure_local().await.unwrap_err();
        assert!(matches!(err, DomainError::DownloadFailure(_)));
        assert!(!path.exists());
    }
}
