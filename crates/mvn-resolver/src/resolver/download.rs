//! Cache-aware, checksum-verified downloads.

use super::MavenResolver;
use crate::cache::LocalCache;
use crate::checksum::{ChecksumHasher, parse_checksum};
use crate::config::ResolutionStrategy;
use crate::transport::RemoteBody;
use mvn_model::{Artifact, ChecksumKind, DataLevel, MavenError, Repository, Result, SnapshotBuild, VersionMetadata};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

impl MavenResolver {
    /// Downloads one artifact file into the cache and returns its path, or
    /// `None` when `repository` does not serve it. Unresolved snapshots are
    /// first pinned to the latest build listed in version metadata.
    pub async fn download_artifact(&self, repository: &Repository, artifact: &Artifact) -> Result<Option<PathBuf>> {
        if !artifact.has_gavce() {
            return Err(MavenError::IncompleteCoordinates {
                artifact: artifact.to_string(),
            });
        }
        let artifact = if artifact.is_snapshot() && !artifact.is_snapshot_resolved() {
            match self.resolve_snapshot(repository, artifact).await? {
                Some(resolved) => resolved,
                None => return Ok(None),
            }
        } else {
            artifact.clone()
        };
        self.fetch(repository, &artifact, DataLevel::Artifact).await
    }

    async fn resolve_snapshot(&self, repository: &Repository, artifact: &Artifact) -> Result<Option<Artifact>> {
        let Some(path) = self.fetch(repository, artifact, DataLevel::VersionMetadata).await? else {
            tracing::debug!(%artifact, repository = %repository.base_url(), "no snapshot metadata");
            return Ok(None);
        };
        let xml = tokio::fs::read_to_string(&path).await?;
        let metadata = VersionMetadata::from_xml(&xml)
            .map_err(|e| e.context(format!("invalid snapshot metadata for {artifact}")))?;

        let resolved = match metadata.latest_build() {
            Some(SnapshotBuild::Timestamped {
                timestamp,
                build_number,
            }) => {
                self.record_snapshot_timestamp(&timestamp);
                artifact.with_snapshot_build(&timestamp, build_number)?
            }
            Some(SnapshotBuild::Plain) | None => artifact.with_plain_snapshot()?,
        };
        tracing::debug!(%artifact, version = ?resolved.concrete_version(), "snapshot resolved");
        Ok(Some(resolved))
    }

    /// Returns the cached copy of one file family, fetching it according to
    /// the resolution strategy.
    ///
    /// Non-metadata files are reused from cache unless the strategy is
    /// `ForceRemote`; metadata is reused only within its TTL. `Offline`
    /// never goes to the network for non-metadata files.
    pub async fn fetch(&self, repository: &Repository, artifact: &Artifact, level: DataLevel) -> Result<Option<PathBuf>> {
        let path = self.cache.path_for(repository, artifact, level)?;
        let is_metadata = level.is_metadata();

        let mut strategy = self.config.strategy;
        if strategy == ResolutionStrategy::ForceRemote && !is_metadata && self.refreshed.contains(&path) {
            strategy = ResolutionStrategy::Remote;
        }

        let cached = self.cache.exists(&path).await;
        if strategy != ResolutionStrategy::ForceRemote && cached {
            if !is_metadata {
                tracing::debug!(path = %path.display(), "cache hit");
                return Ok(Some(path));
            }
            if self.cache.is_fresh(&path, self.config.metadata_expiration()).await {
                tracing::debug!(path = %path.display(), "metadata cache hit");
                return Ok(Some(path));
            }
        }
        if strategy == ResolutionStrategy::Offline && !is_metadata {
            tracing::debug!(%artifact, "offline, not in cache");
            return Ok(None);
        }

        let url = repository.artifact_url(artifact, level, None)?;
        match self.fetch_remote(repository, artifact, level, &url, &path).await {
            Ok(true) => {
                self.refreshed.insert(path.clone());
                Ok(Some(path))
            }
            Ok(false) => Ok(None),
            Err(e) if is_metadata && cached && !matches!(e, MavenError::ChecksumMismatch { .. }) => {
                tracing::warn!(url, error = %e, "metadata refresh failed, reusing cached copy");
                Ok(Some(path))
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch_remote(
        &self,
        repository: &Repository,
        artifact: &Artifact,
        level: DataLevel,
        url: &str,
        path: &Path,
    ) -> Result<bool> {
        let Some(mut body) = self.transport.get(repository, url).await? else {
            return Ok(false);
        };
        let expected = self.fetch_checksum(repository, artifact, level).await;

        self.cache.ensure_parent(path).await?;
        let temp = LocalCache::temp_path(path);
        let written = self.write_verified(&mut body, url, &temp, expected).await;
        match written {
            Ok(()) => {
                self.cache.commit(&temp, path).await?;
                Ok(true)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&temp).await;
                if matches!(e, MavenError::ChecksumMismatch { .. }) {
                    self.cache.invalidate(path).await?;
                }
                Err(e)
            }
        }
    }

    async fn write_verified(
        &self,
        body: &mut RemoteBody,
        url: &str,
        temp: &Path,
        expected: Option<(ChecksumKind, String)>,
    ) -> Result<()> {
        let mut file = tokio::fs::File::create(temp).await?;
        let mut hasher = expected.as_ref().map(|(kind, _)| ChecksumHasher::new(*kind));
        while let Some(chunk) = body.next_chunk(url).await? {
            if let Some(hasher) = &mut hasher {
                hasher.update(&chunk);
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        if let (Some(hasher), Some((kind, expected))) = (hasher, expected) {
            let actual = hasher.finalize_hex();
            if actual != expected {
                return Err(MavenError::ChecksumMismatch {
                    url: format!("{url}{}", kind.suffix()),
                    expected,
                    actual,
                });
            }
            tracing::debug!(url, %kind, "checksum verified");
        } else {
            tracing::debug!(url, "no checksum available, stored unverified");
        }
        Ok(())
    }

    /// First checksum sidecar the repository serves. Errors and malformed
    /// sidecars count as not served.
    async fn fetch_checksum(
        &self,
        repository: &Repository,
        artifact: &Artifact,
        level: DataLevel,
    ) -> Option<(ChecksumKind, String)> {
        for kind in ChecksumKind::ALL {
            let Ok(url) = repository.artifact_url(artifact, level, Some(kind)) else {
                return None;
            };
            let body = match self.transport.get_bytes(repository, &url).await {
                Ok(Some(body)) => body,
                Ok(None) => {
                    tracing::debug!(url, "checksum not served");
                    continue;
                }
                Err(e) => {
                    tracing::debug!(url, error = %e, "checksum skipped");
                    continue;
                }
            };
            match parse_checksum(kind, &String::from_utf8_lossy(&body), &url) {
                Ok(checksum) => return Some((kind, checksum)),
                Err(e) => tracing::debug!(url, error = %e, "checksum skipped"),
            }
        }
        None
    }

    /// Removes the cached copy of one file family of `artifact`.
    pub async fn invalidate(&self, repository: &Repository, artifact: &Artifact, level: DataLevel) -> Result<()> {
        let path = self.cache.path_for(repository, artifact, level)?;
        self.refreshed.remove(&path);
        self.cache.invalidate(&path).await
    }

    /// True when the file family is already in the local cache.
    pub async fn is_in_cache(&self, repository: &Repository, artifact: &Artifact, level: DataLevel) -> Result<bool> {
        let path = self.cache.path_for(repository, artifact, level)?;
        Ok(self.cache.exists(&path).await)
    }
}
