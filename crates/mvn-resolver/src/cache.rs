//! Local artifact cache.
//!
//! Layout: `{root}/{repository-hash}/{maven layout path}`. The hash segment
//! keeps identical coordinates served by different repositories apart.
//! Entries are written to a temporary sibling and renamed into place, so a
//! reader never observes a partially written file.

use crate::checksum::digest_hex;
use mvn_model::{Artifact, ChecksumKind, DataLevel, Repository, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct LocalCache {
    root: PathBuf,
}

impl LocalCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn repository_dir(&self, repository: &Repository) -> PathBuf {
        let hash = digest_hex(ChecksumKind::Md5, repository.base_url().as_bytes());
        self.root.join(format!("repo-{hash}"))
    }

    pub fn path_for(&self, repository: &Repository, artifact: &Artifact, level: DataLevel) -> Result<PathBuf> {
        let relative = artifact.local_path(level)?;
        let mut path = self.repository_dir(repository);
        path.extend(relative.split('/'));
        Ok(path)
    }

    /// True when `path` exists and was modified less than `ttl` ago.
    pub async fn is_fresh(&self, path: &Path, ttl: Duration) -> bool {
        let Ok(metadata) = tokio::fs::metadata(path).await else {
            return false;
        };
        let Ok(modified) = metadata.modified() else {
            return false;
        };
        match SystemTime::now().duration_since(modified) {
            Ok(age) => age < ttl,
            // Modified in the future: clock skew, keep using it.
            Err(_) => true,
        }
    }

    pub async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    /// Removes a cached entry; a missing file is not an error.
    pub async fn invalidate(&self, path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "cache entry invalidated");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Unique temporary sibling of `path` in the same directory, so the final
    /// rename stays on one filesystem.
    pub fn temp_path(path: &Path) -> PathBuf {
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!(".{name}.{}-{counter}.part", std::process::id()))
    }

    /// Moves a fully written temporary file into place.
    pub async fn commit(&self, temp: &Path, path: &Path) -> Result<()> {
        tokio::fs::rename(temp, path).await?;
        tracing::debug!(path = %path.display(), "cache entry written");
        Ok(())
    }

    pub async fn ensure_parent(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}
