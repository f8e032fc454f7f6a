//! Maven repository resolver and publisher.
//!
//! [`MavenResolver`] computes the transitive closure of a
//! [`DependencyGraph`](mvn_model::DependencyGraph) per scope bucket and
//! downloads the files into a checksum-verified local cache.
//! [`MavenPublisher`] uploads build outputs together with a generated POM
//! and updated repository metadata.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the caller.

pub mod cache;
pub mod checksum;
pub mod config;
pub mod publisher;
pub mod resolver;
pub mod transport;

pub use cache::LocalCache;
pub use config::{ResolutionStrategy, ResolverConfig};
pub use publisher::{MavenPublisher, PublishRequest};
pub use resolver::{MavenResolver, resolve_artifact};
pub use transport::Transport;
