// Library interactor - Listing, serving and deleting generated files

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde::Serialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::app::clip_interactor::download_url;
use crate::app::session::{CleanupScheduler, SessionManager};
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::utils::path::PathUtils;
use crate::utils::{format_file_size, time};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    pub size_display: String,
    pub modified: String,
    pub download_url: String,
}

/// Files produced by one session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionListing {
    pub session_id: SessionId,
    pub modified: String,
    pub scheduled_for_cleanup: bool,
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteOutcome {
    pub session_id: SessionId,
    pub removed: bool,
    pub cancelled_cleanup: bool,
}

/// Interactor for browsing generated output
pub struct LibraryInteractor {
    sessions: Arc<SessionManager>,
    cleanup: CleanupScheduler,
    retention: Option<Duration>,
    static_roots: BTreeMap<String, PathBuf>,
}

impl LibraryInteractor {
    pub fn new(
        sessions: Arc<SessionManager>,
        cleanup: CleanupScheduler,
        retention: Option<Duration>,
        static_roots: &BTreeMap<String, PathBuf>,
    ) -> Result<Self, DomainError> {
        let mut roots = BTreeMap::new();
        for (name, dir) in static_roots {
            roots.insert(name.clone(), PathUtils::absolutize(dir)?);
        }
        Ok(Self {
            sessions,
            cleanup,
            retention,
            static_roots: roots,
        })
    }

    /// Every session with files on disk, most recently modified first
    pub fn list_sessions(&self) -> Result<Vec<SessionListing>, DomainError> {
        let mut grouped: HashMap<SessionId, (SystemTime, Vec<FileEntry>)> = HashMap::new();

        for root in [self.sessions.public_dir(), self.sessions.out_dir()] {
            if !root.is_dir() {
                continue;
            }
            for entry in WalkDir::new(root)
                .min_depth(2)
                .max_depth(2)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file())
            {
                let Some(session) = entry
                    .path()
                    .parent()
                    .and_then(|p| p.file_name())
                    .and_then(|n| SessionId::parse(&n.to_string_lossy()).ok())
                else {
                    continue;
                };
                let metadata = entry
                    .metadata()
                    .map_err(|e| DomainError::Io(e.to_string()))?;
                let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                let name = entry.file_name().to_string_lossy().into_owned();

                let slot = grouped
                    .entry(session.clone())
                    .or_insert((SystemTime::UNIX_EPOCH, Vec::new()));
                slot.0 = slot.0.max(modified);
                slot.1.push(FileEntry {
                    download_url: download_url(&session, &name),
                    name,
                    size: metadata.len(),
                    size_display: format_file_size(metadata.len()),
                    modified: time::rfc3339(modified),
                });
            }
        }

        let mut listings: Vec<(SystemTime, SessionListing)> = grouped
            .into_iter()
            .map(|(session_id, (modified, mut files))| {
                files.sort_by(|a, b| a.name.cmp(&b.name));
                let listing = SessionListing {
                    scheduled_for_cleanup: self.cleanup.is_scheduled(&session_id),
                    session_id,
                    modified: time::rfc3339(modified),
                    files,
                };
                (modified, listing)
            })
            .collect();
        listings.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then_with(|| b.1.session_id.cmp(&a.1.session_id))
        });

        debug!(sessions = listings.len(), "Listed generated sessions");
        Ok(listings.into_iter().map(|(_, listing)| listing).collect())
    }

    /// Resolve a session file for download and re-arm the session's retention
    pub fn open_session_file(&self, session: &str, file: &str) -> Result<PathBuf, DomainError> {
        let session = SessionId::parse(session)?;
        let path = self.sessions.session_file(&session, file)?;
        if let Some(retention) = self.retention {
            self.cleanup.schedule(session, retention);
        }
        Ok(path)
    }

    /// Cancel pending cleanup and delete a session's outputs now
    pub async fn delete_session(&self, session: &str) -> Result<DeleteOutcome, DomainError> {
        let session = SessionId::parse(session)?;
        let cancelled_cleanup = self.cleanup.cancel(&session);
        let removed = self.sessions.remove(&session).await?;
        if !removed && !cancelled_cleanup {
            return Err(DomainError::FileNotFound(format!("Session {}", session)));
        }
        info!(session = %session, removed, cancelled_cleanup, "Session deleted");
        Ok(DeleteOutcome {
            session_id: session,
            removed,
            cancelled_cleanup,
        })
    }

    /// Resolve a file under an allow-listed static directory
    pub fn resolve_static(&self, root: &str, path: &str) -> Result<PathBuf, DomainError> {
        let dir = self.static_roots.get(root).ok_or_else(|| {
            DomainError::Forbidden(format!("Directory '{}' is not served", root))
        })?;
        let resolved = PathUtils::resolve_within(dir, path)?;
        if !resolved.is_file() {
            return Err(DomainError::FileNotFound(format!("{}/{}", root, path)));
        }
        Ok(resolved)
    }
}
