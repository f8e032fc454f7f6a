//! Publishing build outputs to Maven repositories.

use crate::checksum::digest_hex;
use crate::config::{ResolutionStrategy, ResolverConfig};
use crate::resolver::MavenResolver;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use mvn_model::pom::{Dependency, ExclusionEntry, Exclusions};
use mvn_model::{
    Artifact, ArtifactMetadata, ChecksumKind, DataLevel, DependencyGraph, MavenError, Pom, PomRepository, Repository,
    Result, Scope, VersionMetadata,
};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

const SNAPSHOT_TIMESTAMP_FORMAT: &str = "%Y%m%d.%H%M%S";
const LAST_UPDATED_FORMAT: &str = "%Y%m%d%H%M%S";

/// Everything needed to publish one build.
#[derive(Debug, Clone)]
pub struct PublishRequest<'a> {
    /// Coordinates of the main artifact; snapshots get a fresh build number
    /// per repository.
    pub coordinates: Artifact,
    /// Files to upload by classifier, `""` for the main artifact.
    pub artifacts: BTreeMap<String, PathBuf>,
    /// Resolved dependencies written into the published POM.
    pub graph: &'a DependencyGraph,
    pub repositories: Vec<Repository>,
    pub time_of_creation: DateTime<Utc>,
}

#[derive(Debug)]
pub struct MavenPublisher {
    resolver: MavenResolver,
}

impl MavenPublisher {
    /// Publishing always reads remote metadata, so the strategy is forced to
    /// `ForceRemote`.
    pub fn new(config: ResolverConfig) -> Result<Self> {
        let config = config.with_strategy(ResolutionStrategy::ForceRemote);
        Ok(Self {
            resolver: MavenResolver::new(config)?,
        })
    }

    pub fn resolver(&self) -> &MavenResolver {
        &self.resolver
    }

    /// Builds the POM published for `coordinates` from a resolved graph.
    ///
    /// Every transitive entry becomes a dependency; the repositories that
    /// served non-system groups are listed unless they are local.
    pub fn make_pom(coordinates: &Artifact, graph: &DependencyGraph) -> Result<Pom> {
        let mut pom = Pom::new(coordinates);
        let mut seen_repositories = HashSet::new();

        for group in graph.transitive_groups() {
            if group.scope != Scope::System {
                let repository = group.resolution_repository().ok_or_else(|| MavenError::GraphUnresolved {
                    artifact: group.group.to_string(),
                })?;
                if !repository.is_local && seen_repositories.insert(repository.base_url().to_string()) {
                    pom.add_repository(PomRepository {
                        id: Some(repository.id()),
                        name: Some(repository.name.clone()),
                        url: repository.base_url().to_string(),
                    });
                }
            }

            let exclusions = (!group.excludes().is_empty()).then(|| Exclusions {
                exclusion: group
                    .excludes()
                    .iter()
                    .map(|e| ExclusionEntry {
                        group_id: e.group_id.clone(),
                        artifact_id: e.artifact_id.clone(),
                    })
                    .collect(),
            });
            for entry in group.entries() {
                let mut dependency = Dependency::from_artifact(&entry.artifact, group.scope);
                dependency.system_path.clone_from(&entry.system_path);
                dependency.optional = entry.optional.then(|| "true".to_string());
                dependency.exclusions.clone_from(&exclusions);
                pom.add_dependency(dependency);
            }
        }
        Ok(pom)
    }

    /// Publishes to every target repository. A failing repository does not
    /// stop the others; the call fails if any repository failed.
    pub async fn publish(&self, request: &PublishRequest<'_>) -> Result<()> {
        for path in request.artifacts.values() {
            if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                return Err(MavenError::FileNotFound { path: path.clone() });
            }
        }
        let pom = Self::make_pom(&request.coordinates, request.graph)?;

        let total = request.repositories.len();
        let mut failed = 0;
        for repository in &request.repositories {
            tracing::info!(artifact = %request.coordinates, repository = %repository.base_url(), "publishing");
            match self.publish_to(repository, request, &pom).await {
                Ok(version) => {
                    tracing::info!(artifact = %request.coordinates, %version, repository = %repository.base_url(), "published");
                }
                Err(e) => {
                    tracing::error!(artifact = %request.coordinates, repository = %repository.base_url(), error = %e, "publishing failed");
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(MavenError::PublishFailed { failed, total });
        }
        Ok(())
    }

    /// Returns the concrete version uploaded.
    async fn publish_to(&self, repository: &Repository, request: &PublishRequest<'_>, pom: &Pom) -> Result<String> {
        let time = request.time_of_creation;
        let last_updated = time.format(LAST_UPDATED_FORMAT).to_string();
        let mut target = request.coordinates.clone();

        let uploads = request
            .artifacts
            .iter()
            .map(|(classifier, path)| {
                let extension = file_extension(path).unwrap_or_else(|| {
                    target.extension().unwrap_or(mvn_model::artifact::DEFAULT_EXTENSION).to_string()
                });
                (classifier.clone(), extension, path.clone())
            })
            .collect::<Vec<_>>();

        if target.is_snapshot() {
            let mut metadata = match self.resolver.fetch(repository, &target, DataLevel::VersionMetadata).await? {
                Some(path) => VersionMetadata::from_xml(&tokio::fs::read_to_string(&path).await?)?,
                None => VersionMetadata::default(),
            };
            let build_number = metadata.next_build_number();
            let timestamp = time.format(SNAPSHOT_TIMESTAMP_FORMAT).to_string();
            target = target.with_snapshot_build(&timestamp, build_number)?;

            let mut files: Vec<(String, String)> = vec![(String::new(), "pom".to_string())];
            files.extend(uploads.iter().map(|(c, e, _)| (c.clone(), e.clone())));
            metadata.record_snapshot(&target, &timestamp, build_number, &last_updated, &files);

            let url = repository.artifact_url(&target, DataLevel::VersionMetadata, None)?;
            self.upload(repository, &url, Bytes::from(metadata.to_xml()?)).await?;
            self.resolver
                .invalidate(repository, &target, DataLevel::VersionMetadata)
                .await?;
        }

        let pom_url = repository.artifact_url(&target.pom_artifact()?, DataLevel::Artifact, None)?;
        self.upload(repository, &pom_url, Bytes::from(pom.to_xml()?)).await?;

        for (classifier, extension, path) in &uploads {
            let file = target.with_classifier(classifier, extension)?;
            let url = repository.artifact_url(&file, DataLevel::Artifact, None)?;
            let body = tokio::fs::read(path).await?;
            self.upload(repository, &url, Bytes::from(body)).await?;
        }

        let mut metadata = match self.resolver.fetch(repository, &target, DataLevel::ArtifactMetadata).await? {
            Some(path) => ArtifactMetadata::from_xml(&tokio::fs::read_to_string(&path).await?)?,
            None => ArtifactMetadata::default(),
        };
        metadata.record_version(&target, &last_updated);
        let url = repository.artifact_url(&target, DataLevel::ArtifactMetadata, None)?;
        self.upload(repository, &url, Bytes::from(metadata.to_xml()?)).await?;
        self.resolver
            .invalidate(repository, &target, DataLevel::ArtifactMetadata)
            .await?;

        Ok(target.concrete_version().unwrap_or_default().to_string())
    }

    /// Uploads `body` followed by one sidecar per checksum kind.
    async fn upload(&self, repository: &Repository, url: &str, body: Bytes) -> Result<()> {
        let transport = self.resolver.transport();
        for kind in ChecksumKind::ALL {
            let checksum = digest_hex(kind, &body);
            transport
                .put(repository, &format!("{url}{}", kind.suffix()), Bytes::from(checksum))
                .await?;
        }
        transport.put(repository, url, body).await
    }
}

/// Extension of `path`, keeping compound `tar.*` extensions whole.
fn file_extension(path: &Path) -> Option<String> {
    let extension = path.extension()?.to_string_lossy().into_owned();
    if extension.is_empty() {
        return None;
    }
    let inner = path.file_stem().map(Path::new).and_then(Path::extension);
    match inner {
        Some(tar) if tar.eq_ignore_ascii_case("tar") => Some(format!("tar.{extension}")),
        _ => Some(extension),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvn_model::Exclusion;

    fn resolved_graph() -> DependencyGraph {
        let central = Repository::new("Central", "https://repo.example.com/maven2").unwrap();
        let local = Repository::new("local", "file:///tmp/m2").unwrap().local();

        let mut graph = DependencyGraph::with_repositories([central.clone()]);
        graph
            .add_transitive(
                Scope::Compile,
                Artifact::parse("com.example:lib:1.0").unwrap(),
                [Exclusion::new("org.unwanted", "*").unwrap()],
                None,
                false,
            )
            .unwrap();
        graph
            .add_transitive(
                Scope::Runtime,
                Artifact::parse("com.example:driver:2.0").unwrap(),
                [],
                None,
                true,
            )
            .unwrap();
        graph
            .add_transitive(
                Scope::System,
                Artifact::parse("com.sun:tools:1.8").unwrap(),
                [],
                Some("/opt/jdk/lib/tools.jar".into()),
                false,
            )
            .unwrap();

        for (index, repository) in [central.clone(), local].into_iter().enumerate() {
            let mut nested = DependencyGraph::new();
            nested.set_resolution_repository(repository);
            graph.transitive_groups_mut()[index].set_graph(nested);
        }
        graph
    }

    #[test]
    fn test_make_pom() {
        let coordinates = Artifact::parse("com.example:pub:2.0").unwrap();
        let pom = MavenPublisher::make_pom(&coordinates, &resolved_graph()).unwrap();

        assert_eq!(pom.dependencies().len(), 3);
        let lib = &pom.dependencies()[0];
        assert_eq!(lib.scope, None);
        assert_eq!(lib.exclusion_filters().unwrap().len(), 1);
        let driver = &pom.dependencies()[1];
        assert_eq!(driver.scope.as_deref(), Some("runtime"));
        assert!(driver.is_optional());
        let tools = &pom.dependencies()[2];
        assert_eq!(tools.system_path.as_deref(), Some("/opt/jdk/lib/tools.jar"));

        // The local repository is never advertised.
        assert_eq!(pom.declared_repositories().len(), 1);
        assert_eq!(pom.declared_repositories()[0].id.as_deref(), Some("central"));
    }

    #[test]
    fn test_make_pom_requires_resolved_graph() {
        let mut graph = DependencyGraph::new();
        graph
            .add_transitive(Scope::Compile, Artifact::parse("com.example:lib:1.0").unwrap(), [], None, false)
            .unwrap();
        let coordinates = Artifact::parse("com.example:pub:2.0").unwrap();
        assert!(matches!(
            MavenPublisher::make_pom(&coordinates, &graph),
            Err(MavenError::GraphUnresolved { .. })
        ));
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension(Path::new("build/pub-2.0.jar")).as_deref(), Some("jar"));
        assert_eq!(file_extension(Path::new("build/pub-2.0-dist.tar.gz")).as_deref(), Some("tar.gz"));
        assert_eq!(file_extension(Path::new("build/pub-2.0-src.tar.bz2")).as_deref(), Some("tar.bz2"));
        assert_eq!(file_extension(Path::new("build/pub-2.0.zip")).as_deref(), Some("zip"));
        assert_eq!(file_extension(Path::new("build/noext")), None);
    }
}
