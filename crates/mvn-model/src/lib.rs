//! Maven repository model.
//!
//! Coordinates ([`Artifact`]), repositories, POM and `maven-metadata.xml`
//! documents, scope propagation rules and the [`DependencyGraph`] the
//! resolver fills in.

pub mod artifact;
pub mod error;
pub mod graph;
pub mod metadata;
pub mod pom;
pub mod repository;
pub mod scope;
pub mod version;

pub use artifact::{Artifact, DataLevel, Exclusion, Gav};
pub use error::{MavenError, Result};
pub use graph::{DependencyGraph, TransitiveEntry, TransitiveGroup};
pub use metadata::{ArtifactMetadata, SnapshotBuild, VersionMetadata};
pub use pom::{Dependency, Pom, PomRepository};
pub use repository::{ChecksumKind, Credentials, Repository};
pub use scope::{Scope, ScopeBucket};
pub use version::compare_versions;
