//! Full POM resolution and dependency graph construction.

use super::MavenResolver;
use futures::FutureExt;
use futures::future::BoxFuture;
use mvn_model::pom::Dependency;
use mvn_model::{Artifact, DependencyGraph, MavenError, Pom, PomRepository, Repository, Result, Scope};
use std::collections::{HashMap, HashSet};

impl MavenResolver {
    /// Downloads the POM of `artifact` from the first repository serving it
    /// and merges its `import`-scoped BOMs and then its parent chain into it.
    ///
    /// Parents and imports are searched in the POM's own repositories first,
    /// then in `repositories`. Returns the merged POM and the repository it
    /// came from, or `None` when no repository serves it. A missing parent
    /// or non-optional import is a hard error.
    pub fn resolve_full_pom<'a>(
        &'a self,
        repositories: &'a [Repository],
        artifact: &'a Artifact,
    ) -> BoxFuture<'a, Result<Option<(Pom, Repository)>>> {
        async move {
            let pom_artifact = artifact.pom_artifact()?;
            let system = &self.config.system_properties;

            for repository in repositories {
                tracing::info!(artifact = %pom_artifact, repository = %repository.base_url(), "resolving POM");
                let Some(path) = self.download_artifact(repository, &pom_artifact).await? else {
                    continue;
                };
                let xml = tokio::fs::read_to_string(&path).await?;
                let mut pom = Pom::from_xml(&xml)
                    .map_err(|e| e.context(format!("invalid POM {pom_artifact} from {}", repository.base_url())))?;

                let mut extended = declared_repositories(&pom);
                for candidate in repositories {
                    if !extended.contains(candidate) {
                        extended.push(candidate.clone());
                    }
                }

                let imports: Vec<Dependency> = pom
                    .managed_dependencies()
                    .iter()
                    .filter(|d| d.declared_scope() == Some(Scope::Import))
                    .filter(|d| !(self.config.ignore_optional && d.is_optional()))
                    .cloned()
                    .collect();

                let parent_pom = match pom.parent_artifact(system)? {
                    Some(parent) => match self.resolve_full_pom(&extended, &parent).await? {
                        Some((parent_pom, _)) => Some(parent_pom),
                        None => {
                            return Err(MavenError::PomNotFound {
                                artifact: parent.to_string(),
                            }
                            .context(format!("parent of {pom_artifact}")));
                        }
                    },
                    None => None,
                };

                // Import coordinates may use inherited properties.
                let mut inherited = pom.clone();
                if let Some(parent_pom) = &parent_pom {
                    inherited.import_pom(parent_pom, true);
                }

                // Imports are merged before the parent, so a BOM imported
                // here beats the parent's own management entries.
                for import in imports {
                    match self.resolve_import(&extended, &inherited, &import, &pom_artifact).await {
                        Ok(Some(bom_pom)) => pom.import_pom(&bom_pom, false),
                        Ok(None) => {}
                        Err(e) if import.is_optional() => {
                            tracing::warn!(
                                import = %format!("{}:{}", import.group_id, import.artifact_id),
                                error = %e,
                                "skipping optional import"
                            );
                        }
                        Err(e) => return Err(e),
                    }
                }
                if let Some(parent_pom) = &parent_pom {
                    pom.import_pom(parent_pom, true);
                }

                tracing::info!(artifact = %pom_artifact, repository = %repository.base_url(), "POM resolved");
                return Ok(Some((pom, repository.clone())));
            }
            Ok(None)
        }
        .boxed()
    }

    /// Resolves one `import`-scoped BOM, interpolated with its own
    /// properties. `None` only for a missing optional import.
    async fn resolve_import(
        &self,
        repositories: &[Repository],
        importer: &Pom,
        import: &Dependency,
        pom_artifact: &Artifact,
    ) -> Result<Option<Pom>> {
        let system = &self.config.system_properties;
        let bom = Artifact::new(
            &importer.fill_properties_with(&import.group_id, system),
            &importer.fill_properties_with(&import.artifact_id, system),
            import
                .version
                .as_deref()
                .map(|v| importer.fill_properties_with(v, system))
                .as_deref(),
        )?;
        match self.resolve_full_pom(repositories, &bom).await? {
            Some((mut bom_pom, _)) => {
                bom_pom.interpolate(system);
                Ok(Some(bom_pom))
            }
            None if import.is_optional() => {
                tracing::warn!(%bom, "optional import not found");
                Ok(None)
            }
            None => Err(MavenError::PomNotFound {
                artifact: bom.to_string(),
            }
            .context(format!("import in {pom_artifact}"))),
        }
    }

    /// Builds the graph of direct dependencies declared by the POM of
    /// `artifact`, reached under `scope`. Candidate repositories come from
    /// `parent`; `None` when no repository serves the POM.
    pub async fn resolve_graph_pom(
        &self,
        parent: &DependencyGraph,
        artifact: &Artifact,
        scope: Scope,
    ) -> Result<Option<DependencyGraph>> {
        let Some((mut pom, source)) = self.resolve_full_pom(parent.repositories(), artifact).await? else {
            return Ok(None);
        };
        pom.interpolate(&self.config.system_properties);

        let mut graph = DependencyGraph::with_repositories(parent.repositories().to_vec());
        for repository in declared_repositories(&pom) {
            graph.add_repository(repository);
        }
        graph.set_resolution_repository(source);

        let ignore_optional = self.config.ignore_optional;
        let mut managed: HashMap<(String, String), &Dependency> = HashMap::new();
        for dependency in pom.managed_dependencies() {
            if dependency.declared_scope() == Some(Scope::Import) || (ignore_optional && dependency.is_optional()) {
                continue;
            }
            managed.entry(dependency.management_key()).or_insert(dependency);
        }

        let mut seen = HashSet::new();
        for dependency in pom.dependencies() {
            if ignore_optional && dependency.is_optional() {
                continue;
            }
            let management = managed.get(&dependency.management_key()).copied();
            let version = dependency
                .version
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .or_else(|| management.and_then(|m| m.version.as_deref()))
                .map(str::to_string);

            let declared = dependency
                .declared_scope()
                .or_else(|| management.and_then(Dependency::declared_scope))
                .unwrap_or_default();
            let Some(effective) = scope.effective(declared) else {
                tracing::debug!(
                    dependency = %format!("{}:{}", dependency.group_id, dependency.artifact_id),
                    %scope,
                    %declared,
                    "edge dropped by scope"
                );
                continue;
            };

            let Some(version) = version else {
                return Err(MavenError::MissingVersion {
                    artifact: format!("{}:{}", dependency.group_id, dependency.artifact_id),
                }
                .context(format!("dependency of {artifact}")));
            };
            let entry = dependency.artifact()?.with_version(&version)?;
            if !seen.insert(entry.clone()) {
                continue;
            }

            let mut excludes = dependency.exclusion_filters()?;
            if let Some(management) = management {
                excludes.extend(management.exclusion_filters()?);
            }
            let system_path = if declared == Scope::System {
                dependency
                    .system_path
                    .clone()
                    .or_else(|| management.and_then(|m| m.system_path.clone()))
            } else {
                None
            };

            let with_sources = self.config.auto_include_sources
                && effective != Scope::System
                && entry.classifier() == Some("")
                && entry.extension() == Some("jar");
            let sources = if with_sources {
                Some(entry.with_classifier("sources", "jar")?)
            } else {
                None
            };

            graph.add_transitive(effective, entry, excludes, system_path, dependency.is_optional())?;
            if let Some(sources) = sources
                && seen.insert(sources.clone())
            {
                graph.add_transitive(effective, sources, [], None, true)?;
            }
        }

        Ok(Some(graph))
    }
}

/// Repositories a POM declares, skipping unusable URLs.
fn declared_repositories(pom: &Pom) -> Vec<Repository> {
    let mut repositories: Vec<Repository> = Vec::new();
    for declared in pom.declared_repositories() {
        match to_repository(declared) {
            Ok(repository) if !repositories.contains(&repository) => repositories.push(repository),
            Ok(_) => {}
            Err(e) => tracing::warn!(url = %declared.url, error = %e, "ignoring repository declared in POM"),
        }
    }
    repositories
}

fn to_repository(declared: &PomRepository) -> Result<Repository> {
    let url = declared.url.trim();
    let name = declared
        .name
        .as_deref()
        .or(declared.id.as_deref())
        .unwrap_or(url);
    Repository::new(name, url)
}
