//! Dependency resolution against Maven repositories.
//!
//! [`MavenResolver::resolve`] walks a [`DependencyGraph`] depth first,
//! building the nested graph of every reached group from its POM, then
//! downloads the files of the groups included in the requested
//! [`ScopeBucket`]. The output lists each group's dependencies before the
//! group's own files, without duplicates.

mod download;
mod pom;

use crate::cache::LocalCache;
use crate::config::{ResolutionStrategy, ResolverConfig};
use crate::transport::Transport;
use chrono::{DateTime, NaiveDateTime, Utc};
use dashmap::DashSet;
use futures::FutureExt;
use futures::future::BoxFuture;
use mvn_model::{
    Artifact, DependencyGraph, Exclusion, MavenError, Repository, Result, Scope, ScopeBucket, TransitiveEntry,
};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

const SNAPSHOT_TIMESTAMP_FORMATS: [&str; 2] = ["%Y%m%d.%H%M%S", "%Y%m%d-%H%M%S"];

pub struct MavenResolver {
    config: ResolverConfig,
    cache: LocalCache,
    transport: Transport,
    /// Cache entries fetched from the network during this session.
    refreshed: DashSet<PathBuf>,
    last_snapshot: Mutex<Option<DateTime<Utc>>>,
}

/// A file selected for download during traversal.
struct Selected {
    entry: TransitiveEntry,
    scope: Scope,
    repository: Option<Repository>,
    depth: usize,
}

/// Group and artifact ids on the current traversal path.
type TraversalPath = Vec<(String, String)>;

/// State shared across one traversal.
#[derive(Default)]
struct Traversal {
    bucket: Option<ScopeBucket>,
    selected: Vec<Selected>,
    /// Shallowest depth at which each group and artifact id was resolved.
    defined: HashMap<(String, String), usize>,
}

impl MavenResolver {
    pub fn new(config: ResolverConfig) -> Result<Self> {
        let transport = Transport::new(config.remote_timeout())?;
        Ok(Self {
            cache: LocalCache::new(config.cache_root.clone()),
            config,
            transport,
            refreshed: DashSet::new(),
            last_snapshot: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    pub(crate) fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Timestamp of the newest snapshot build resolved by this resolver.
    pub fn last_snapshot_timestamp(&self) -> Option<DateTime<Utc>> {
        *self.last_snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_snapshot_timestamp(&self, timestamp: &str) {
        let Some(parsed) = SNAPSHOT_TIMESTAMP_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(timestamp, format).ok())
        else {
            tracing::debug!(timestamp, "unrecognized snapshot timestamp");
            return;
        };
        let parsed = parsed.and_utc();
        let mut last = self.last_snapshot.lock().unwrap_or_else(PoisonError::into_inner);
        if last.is_none_or(|current| current < parsed) {
            *last = Some(parsed);
        }
    }

    /// Builds every missing nested graph reachable from `graph` without
    /// downloading artifact files.
    pub async fn resolve_graph(&self, graph: &mut DependencyGraph) -> Result<()> {
        if self.config.strategy == ResolutionStrategy::ForceRemote {
            graph.clear_resolved();
        }
        let mut traversal = Traversal::default();
        self.traverse(graph, Vec::new(), Vec::new(), &mut traversal).await
    }

    /// Resolves `graph` and downloads the files of every group included in
    /// `bucket`. Any failure of a non-optional file aborts the call.
    pub async fn resolve(&self, graph: &mut DependencyGraph, bucket: ScopeBucket) -> Result<Vec<PathBuf>> {
        if self.config.strategy == ResolutionStrategy::ForceRemote {
            graph.clear_resolved();
        }
        let mut traversal = Traversal {
            bucket: Some(bucket),
            ..Traversal::default()
        };
        self.traverse(graph, Vec::new(), Vec::new(), &mut traversal).await?;
        let mut selected = traversal.selected;
        if self.config.nearest_wins {
            selected = nearest_wins(selected);
        }

        tracing::debug!(%bucket, files = selected.len(), "downloading resolved files");
        let mut files = Vec::new();
        let mut seen_artifacts = HashSet::new();
        let mut seen_paths = HashSet::new();
        for selection in selected {
            if !seen_artifacts.insert(selection.entry.artifact.clone()) {
                continue;
            }
            if let Some(path) = self.materialize(&selection).await?
                && seen_paths.insert(path.clone())
            {
                files.push(path);
            }
        }
        Ok(files)
    }

    fn traverse<'a>(
        &'a self,
        graph: &'a mut DependencyGraph,
        excluded: Vec<Exclusion>,
        path: TraversalPath,
        traversal: &'a mut Traversal,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let repositories = graph.repositories().to_vec();
            let parent = DependencyGraph::with_repositories(repositories);
            let depth = path.len();

            for group in graph.transitive_groups_mut() {
                if group.is_excluded_by(&excluded) {
                    tracing::debug!(group = %group.group, "excluded");
                    continue;
                }
                let key = (group.group.group_id.clone(), group.group.artifact_id.clone());
                // The occurrence further up the path selects these files.
                if path.contains(&key) {
                    tracing::debug!(group = %group.group, "dependency cycle, not descending");
                    continue;
                }

                if group.scope != Scope::System {
                    if group.graph().is_none() {
                        let pom = group.group.pom_artifact();
                        let Some(child) = self.resolve_graph_pom(&parent, &pom, group.scope).await? else {
                            if self.config.nearest_wins
                                && traversal.defined.get(&key).is_some_and(|defined| *defined <= depth)
                            {
                                tracing::warn!(group = %group.group, "POM not found, a nearer version is already defined");
                                continue;
                            }
                            return Err(MavenError::PomNotFound {
                                artifact: group.group.to_string(),
                            });
                        };
                        group.set_graph(child);
                    }
                }
                traversal
                    .defined
                    .entry(key.clone())
                    .and_modify(|defined| *defined = (*defined).min(depth))
                    .or_insert(depth);

                let mut child_excluded = excluded.clone();
                child_excluded.extend(group.excludes().iter().cloned());
                if let Some(child) = group.graph_mut() {
                    let mut child_path = path.clone();
                    child_path.push(key);
                    self.traverse(child, child_excluded, child_path, traversal).await?;
                }

                if traversal.bucket.is_some_and(|b| b.includes(group.scope)) {
                    let repository = group.resolution_repository().cloned();
                    for entry in group.entries() {
                        traversal.selected.push(Selected {
                            entry: entry.clone(),
                            scope: group.scope,
                            repository: repository.clone(),
                            depth,
                        });
                    }
                }
            }
            Ok(())
        }
        .boxed()
    }

    /// Local file for one selected entry; `None` for a skipped optional entry.
    async fn materialize(&self, selection: &Selected) -> Result<Option<PathBuf>> {
        let entry = &selection.entry;
        let artifact = &entry.artifact;

        let outcome = if selection.scope == Scope::System {
            self.system_file(entry).await
        } else {
            match &selection.repository {
                Some(repository) => match self.download_artifact(repository, artifact).await {
                    Ok(Some(path)) => Ok(path),
                    Ok(None) => Err(MavenError::ArtifactUnavailable {
                        artifact: artifact.to_string(),
                        repository: repository.base_url().to_string(),
                    }),
                    Err(e) => Err(e),
                },
                None => Err(MavenError::GraphUnresolved {
                    artifact: artifact.to_string(),
                }),
            }
        };

        match outcome {
            Ok(path) => Ok(Some(path)),
            Err(e) if entry.optional => {
                tracing::warn!(%artifact, error = %e, "skipping optional dependency");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn system_file(&self, entry: &TransitiveEntry) -> Result<PathBuf> {
        let Some(system_path) = &entry.system_path else {
            return Err(MavenError::FileNotFound {
                path: PathBuf::from(entry.artifact.to_string()),
            });
        };
        let path = PathBuf::from(system_path);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            Ok(path)
        } else {
            Err(MavenError::FileNotFound { path })
        }
    }
}

/// Keeps, per group and artifact id, only the version declared closest to
/// the root; ties go to the earliest selection.
fn nearest_wins(selected: Vec<Selected>) -> Vec<Selected> {
    let mut chosen: HashMap<(String, String), (usize, String)> = HashMap::new();
    for selection in &selected {
        let artifact = &selection.entry.artifact;
        let key = (artifact.group_id.clone(), artifact.artifact_id.clone());
        let version = artifact.version().unwrap_or_default();
        match chosen.get(&key) {
            Some((depth, _)) if *depth <= selection.depth => {}
            _ => {
                chosen.insert(key, (selection.depth, version.to_string()));
            }
        }
    }

    selected
        .into_iter()
        .filter(|selection| {
            let artifact = &selection.entry.artifact;
            let key = (artifact.group_id.clone(), artifact.artifact_id.clone());
            chosen
                .get(&key)
                .is_some_and(|(_, version)| artifact.version() == Some(version.as_str()))
        })
        .collect()
}

impl std::fmt::Debug for MavenResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MavenResolver")
            .field("cache_root", &self.cache.root())
            .field("strategy", &self.config.strategy)
            .field("refreshed", &self.refreshed.len())
            .finish_non_exhaustive()
    }
}

/// Resolves `artifact` as a top-level dependency: adds it to a graph over
/// `repositories` and downloads the files of `bucket`.
pub async fn resolve_artifact(
    resolver: &MavenResolver,
    repositories: impl IntoIterator<Item = Repository>,
    artifact: Artifact,
    scope: Scope,
    bucket: ScopeBucket,
) -> Result<(DependencyGraph, Vec<PathBuf>)> {
    let mut graph = DependencyGraph::with_repositories(repositories);
    graph.add_transitive(scope, artifact, [], None, false)?;
    let files = resolver.resolve(&mut graph, bucket).await?;
    Ok((graph, files))
}
