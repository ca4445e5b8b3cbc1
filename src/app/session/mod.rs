// Session storage - Per-request artifact layout and scheduled cleanup

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::adapters::toml_config::StorageConfig;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::utils::path::PathUtils;

/// Where each artifact of a session lives.
///
/// ```text
/// <work_dir>/<session>-XXXX/      scratch, removed when the request ends
/// <public_dir>/<session>/clip.mp4 published clip and transcript
/// <out_dir>/<session>/...         rendered video
/// ```
#[derive(Debug, Clone)]
pub struct SessionManager {
    work_dir: PathBuf,
    public_dir: PathBuf,
    out_dir: PathBuf,
    clip_name: String,
    transcript_name: String,
    render_name: String,
}

impl SessionManager {
    pub fn new(
        storage: &StorageConfig,
        transcript_name: impl Into<String>,
        render_name: impl Into<String>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            work_dir: PathUtils::absolutize(&storage.work_dir)?,
            public_dir: PathUtils::absolutize(&storage.public_dir)?,
            out_dir: PathUtils::absolutize(&storage.out_dir)?,
            clip_name: storage.clip_name.clone(),
            transcript_name: transcript_name.into(),
            render_name: render_name.into(),
        })
    }

    pub fn public_dir(&self) -> &Path {
        &self.public_dir
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Fresh scratch directory; dropped (and deleted) with the returned guard
    pub fn scratch(&self, session: &SessionId) -> Result<tempfile::TempDir, DomainError> {
        std::fs::create_dir_all(&self.work_dir)
            .map_err(|e| DomainError::io(self.work_dir.display(), e))?;
        tempfile::Builder::new()
            .prefix(&format!("{}-", session))
            .tempdir_in(&self.work_dir)
            .map_err(|e| DomainError::io(self.work_dir.display(), e))
    }

    pub fn clip_name(&self) -> &str {
        &self.clip_name
    }

    pub fn clip_path(&self, session: &SessionId) -> PathBuf {
        self.public_dir.join(session.as_str()).join(&self.clip_name)
    }

    pub fn transcript_path(&self, session: &SessionId) -> PathBuf {
        self.public_dir
            .join(session.as_str())
            .join(&self.transcript_name)
    }

    pub fn render_path(&self, session: &SessionId) -> PathBuf {
        self.out_dir.join(session.as_str()).join(&self.render_name)
    }

    /// Every directory that may hold outputs of `session`
    pub fn session_dirs(&self, session: &SessionId) -> [PathBuf; 2] {
        [
            self.public_dir.join(session.as_str()),
            self.out_dir.join(session.as_str()),
        ]
    }

    /// Move a finished artifact into place, copying when a rename crosses filesystems
    pub async fn publish(&self, from: &Path, to: &Path) -> Result<(), DomainError> {
        if let Some(parent) = to.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DomainError::io(parent.display(), e))?;
        }
        if tokio::fs::rename(from, to).await.is_err() {
            tokio::fs::copy(from, to)
                .await
                .map_err(|e| DomainError::io(to.display(), e))?;
            let _ = tokio::fs::remove_file(from).await;
        }
        Ok(())
    }

    /// Locate a file produced by `session`, searching its public then output directory
    pub fn session_file(&self, session: &SessionId, file: &str) -> Result<PathBuf, DomainError> {
        let mut last_err = DomainError::FileNotFound(format!("{}/{}", session, file));
        for dir in self.session_dirs(session) {
            if !dir.is_dir() {
                continue;
            }
            match PathUtils::resolve_within(&dir, file) {
                Ok(path) if path.is_file() => return Ok(path),
                Ok(_) => {}
                Err(DomainError::FileNotFound(_)) => {}
                Err(e) => last_err = e,
            }
        }
        Err(last_err)
    }

    /// Remove every output of `session`; returns whether anything existed
    pub async fn remove(&self, session: &SessionId) -> Result<bool, DomainError> {
        let mut removed = false;
        for dir in self.session_dirs(session) {
            match tokio::fs::remove_dir_all(&dir).await {
                Ok(()) => {
                    debug!(session = %session, dir = %dir.display(), "Removed session directory");
                    removed = true;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(DomainError::io(dir.display(), e)),
            }
        }
        Ok(removed)
    }
}

struct Pending {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Deletes session outputs after a delay; every schedule replaces the previous one
#[derive(Clone)]
pub struct CleanupScheduler {
    sessions: Arc<SessionManager>,
    tasks: Arc<Mutex<HashMap<SessionId, Pending>>>,
    generation: Arc<AtomicU64>,
}

impl CleanupScheduler {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self {
            sessions,
            tasks: Arc::new(Mutex::new(HashMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, Pending>> {
        self.tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Arm (or re-arm) deletion of `session` after `delay`
    pub fn schedule(&self, session: SessionId, delay: Duration) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let sessions = Arc::clone(&self.sessions);
        let tasks = Arc::clone(&self.tasks);
        let id = session.clone();

        // Held across the spawn so a zero-delay task cannot finish before it is registered
        let mut registry = self.lock();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match sessions.remove(&id).await {
                Ok(true) => info!(session = %id, "Session expired and was removed"),
                Ok(false) => debug!(session = %id, "Session already gone at expiry"),
                Err(e) => warn!(session = %id, error = %e, "Failed to remove expired session"),
            }
            let mut tasks = tasks.lock().unwrap_or_else(|p| p.into_inner());
            if tasks.get(&id).map(|p| p.generation) == Some(generation) {
                tasks.remove(&id);
            }
        });

        debug!(session = %session, delay_secs = delay.as_secs_f64(), "Cleanup scheduled");
        if let Some(previous) = registry.insert(session, Pending { generation, handle }) {
            previous.handle.abort();
        }
    }

    /// Drop the pending deletion of `session`; returns whether one was armed
    pub fn cancel(&self, session: &SessionId) -> bool {
        match self.lock().remove(session) {
            Some(pending) => {
                pending.handle.abort();
                debug!(session = %session, "Cleanup cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_scheduled(&self, session: &SessionId) -> bool {
        self.lock().contains_key(session)
    }

    pub fn pending(&self) -> usize {
        self.lock().len()
    }
}
