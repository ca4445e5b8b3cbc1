//! Path utilities for keeping served and generated files inside their roots

use std::path::{Component, Path, PathBuf};

use crate::domain::errors::DomainError;

/// Path helpers shared by the session store and the file library
pub struct PathUtils;

impl PathUtils {
    /// Make `path` absolute against the current directory without touching the filesystem.
    ///
    /// External tools run in their own working directories, so every path
    /// handed to them goes through here first.
    pub fn absolutize(path: &Path) -> Result<PathBuf, DomainError> {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|e| DomainError::io("current directory", e))?
                .join(path)
        };
        Ok(Self::normalize(&joined))
    }

    /// Drop `.` components and fold `..` into their parent, lexically
    pub fn normalize(path: &Path) -> PathBuf {
        let mut out = PathBuf::new();
        for component in path.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    out.pop();
                }
                other => out.push(other.as_os_str()),
            }
        }
        out
    }

    /// Check that a request-supplied relative path only descends
    pub fn validate_relative(relative: &str) -> Result<PathBuf, DomainError> {
        let candidate = Path::new(relative);
        if relative.is_empty() {
            return Err(DomainError::BadArgs("Empty path".to_string()));
        }
        let safe = candidate
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe || relative.contains('\\') {
            return Err(DomainError::Forbidden(format!(
                "Path escapes its root: {}",
                relative
            )));
        }
        Ok(candidate.to_path_buf())
    }

    /// Resolve `relative` under `root`, refusing anything that lands outside it.
    ///
    /// Symlinks are followed, so a link pointing out of the root is refused too.
    pub fn resolve_within(root: &Path, relative: &str) -> Result<PathBuf, DomainError> {
        let relative = Self::validate_relative(relative)?;
        let root = root
            .canonicalize()
            .map_err(|e| DomainError::io(root.display(), e))?;
        let joined = root.join(&relative);
        let resolved = joined
            .canonicalize()
            .map_err(|e| DomainError::io(relative.display(), e))?;
        if !resolved.starts_with(&root) {
            return Err(DomainError::Forbidden(format!(
                "Path escapes its root: {}",
                relative.display()
            )));
        }
        Ok(resolved)
    }
}
