//! Dependency graphs.
//!
//! A [`DependencyGraph`] holds the candidate repositories and the transitive
//! groups reached from one POM. Groups live in an arena indexed by
//! `(GAV, scope)`; each group may carry the nested graph of its own POM once
//! the resolver has built it.

use crate::artifact::{Artifact, Exclusion, Gav};
use crate::error::{MavenError, Result};
use crate::repository::Repository;
use crate::scope::Scope;
use std::collections::HashMap;

/// One file reached through a dependency edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransitiveEntry {
    pub artifact: Artifact,
    /// Filesystem location for `system` scoped dependencies.
    pub system_path: Option<String>,
    pub optional: bool,
}

/// Every variant of one GAV reached under one scope.
#[derive(Debug, Clone)]
pub struct TransitiveGroup {
    pub scope: Scope,
    pub group: Gav,
    entries: Vec<TransitiveEntry>,
    excludes: Vec<Exclusion>,
    graph: Option<Box<DependencyGraph>>,
}

impl TransitiveGroup {
    fn new(scope: Scope, group: Gav) -> Self {
        Self {
            scope,
            group,
            entries: Vec::new(),
            excludes: Vec::new(),
            graph: None,
        }
    }

    pub fn entries(&self) -> &[TransitiveEntry] {
        &self.entries
    }

    pub fn excludes(&self) -> &[Exclusion] {
        &self.excludes
    }

    pub fn graph(&self) -> Option<&DependencyGraph> {
        self.graph.as_deref()
    }

    pub fn graph_mut(&mut self) -> Option<&mut DependencyGraph> {
        self.graph.as_deref_mut()
    }

    /// Stores the nested graph unless one is already present. Returns whether
    /// `graph` was stored.
    pub fn set_graph(&mut self, graph: DependencyGraph) -> bool {
        if self.graph.is_some() {
            return false;
        }
        self.graph = Some(Box::new(graph));
        true
    }

    pub fn clear_graph(&mut self) {
        self.graph = None;
    }

    /// Repository the nested graph's POM came from.
    pub fn resolution_repository(&self) -> Option<&Repository> {
        self.graph.as_ref().and_then(|g| g.resolution_repository())
    }

    /// True when any filter in `exclusions` matches this group.
    pub fn is_excluded_by(&self, exclusions: &[Exclusion]) -> bool {
        exclusions
            .iter()
            .any(|e| e.matches(&self.group.group_id, &self.group.artifact_id))
    }

    fn merge(&mut self, entry: TransitiveEntry, excludes: impl IntoIterator<Item = Exclusion>) {
        if !self.entries.contains(&entry) {
            self.entries.push(entry);
        }
        for exclusion in excludes {
            if !self.excludes.contains(&exclusion) {
                self.excludes.push(exclusion);
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    repositories: Vec<Repository>,
    resolution_repository: Option<Repository>,
    groups: Vec<TransitiveGroup>,
    index: HashMap<(Gav, Scope), usize>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repositories(repositories: impl IntoIterator<Item = Repository>) -> Self {
        let mut graph = Self::new();
        for repository in repositories {
            graph.add_repository(repository);
        }
        graph
    }

    /// Registers a candidate repository. A URL that is already present keeps
    /// its first registration; returns whether `repository` was added.
    pub fn add_repository(&mut self, repository: Repository) -> bool {
        if let Some(existing) = self.repositories.iter().find(|r| **r == repository) {
            if existing.name != repository.name || existing.credentials.is_some() != repository.credentials.is_some() {
                tracing::debug!(
                    "repository {} already registered as '{}', keeping the first registration",
                    repository.base_url(),
                    existing.name
                );
            }
            return false;
        }
        self.repositories.push(repository);
        true
    }

    pub fn repositories(&self) -> &[Repository] {
        &self.repositories
    }

    pub fn resolution_repository(&self) -> Option<&Repository> {
        self.resolution_repository.as_ref()
    }

    pub fn set_resolution_repository(&mut self, repository: Repository) {
        self.resolution_repository = Some(repository);
    }

    /// Adds `artifact` under `scope`, merging into the existing group for its
    /// GAV and scope. Requires GAVCE coordinates.
    pub fn add_transitive(
        &mut self,
        scope: Scope,
        artifact: Artifact,
        excludes: impl IntoIterator<Item = Exclusion>,
        system_path: Option<String>,
        optional: bool,
    ) -> Result<()> {
        if !artifact.has_gavce() {
            return Err(MavenError::IncompleteCoordinates {
                artifact: artifact.to_string(),
            });
        }
        let gav = artifact.gav()?;
        let entry = TransitiveEntry {
            artifact,
            system_path,
            optional,
        };

        let index = match self.index.get(&(gav.clone(), scope)) {
            Some(&index) => index,
            None => {
                self.groups.push(TransitiveGroup::new(scope, gav.clone()));
                let index = self.groups.len() - 1;
                self.index.insert((gav, scope), index);
                index
            }
        };
        self.groups[index].merge(entry, excludes);
        Ok(())
    }

    /// Unions repositories and transitive groups of `other` into this graph.
    /// Resolved nested graphs are deep-copied; a group that already has a
    /// nested graph keeps it.
    pub fn import_from(&mut self, other: &Self) -> Result<()> {
        for repository in &other.repositories {
            self.add_repository(repository.clone());
        }
        for group in &other.groups {
            for entry in &group.entries {
                self.add_transitive(
                    group.scope,
                    entry.artifact.clone(),
                    group.excludes.iter().cloned(),
                    entry.system_path.clone(),
                    entry.optional,
                )?;
            }
            if let Some(nested) = &group.graph
                && let Some(&index) = self.index.get(&(group.group.clone(), group.scope))
            {
                self.groups[index].set_graph(nested.as_ref().clone());
            }
        }
        Ok(())
    }

    pub fn transitive_groups(&self) -> &[TransitiveGroup] {
        &self.groups
    }

    pub fn transitive_groups_mut(&mut self) -> &mut [TransitiveGroup] {
        &mut self.groups
    }

    pub fn group(&self, gav: &Gav, scope: Scope) -> Option<&TransitiveGroup> {
        self.index
            .get(&(gav.clone(), scope))
            .map(|&index| &self.groups[index])
    }

    /// Scopes under which `gav` has been reached.
    pub fn scopes_of(&self, gav: &Gav) -> Vec<Scope> {
        self.groups
            .iter()
            .filter(|g| g.group == *gav)
            .map(|g| g.scope)
            .collect()
    }

    /// True when every non-system group carries a resolved nested graph, recursively.
    pub fn is_resolved(&self) -> bool {
        self.groups.iter().all(|group| {
            group.scope == Scope::System || group.graph.as_ref().is_some_and(|g| g.is_resolved())
        })
    }

    /// Drops every nested graph so the next pass rebuilds them.
    pub fn clear_resolved(&mut self) {
        for group in &mut self.groups {
            group.clear_graph();
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
