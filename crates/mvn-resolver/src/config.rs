//! Resolver configuration.

use mvn_model::{MavenError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_METADATA_EXPIRATION_SECS: u64 = 60;

/// When the local cache may be bypassed for the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// Cached files only; metadata may still be refreshed.
    Offline,
    /// Cached files are reused, metadata is refreshed after its TTL.
    #[default]
    Remote,
    /// Every file is fetched again.
    ForceRemote,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub cache_root: PathBuf,
    pub strategy: ResolutionStrategy,
    /// Connect and read timeout applied to every request.
    pub remote_timeout_secs: u64,
    /// How long cached `maven-metadata.xml` files stay fresh.
    pub metadata_expiration_secs: u64,
    pub ignore_optional: bool,
    /// Adds an optional `sources` jar next to every jar dependency.
    pub auto_include_sources: bool,
    /// Downloads only the version of each group/artifact declared closest to
    /// the root, and tolerates a missing POM when a nearer version exists.
    pub nearest_wins: bool,
    /// Consulted before POM properties during `${}` substitution.
    pub system_properties: BTreeMap<String, String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache_root: default_cache_root(),
            strategy: ResolutionStrategy::default(),
            remote_timeout_secs: DEFAULT_REMOTE_TIMEOUT_SECS,
            metadata_expiration_secs: DEFAULT_METADATA_EXPIRATION_SECS,
            ignore_optional: false,
            auto_include_sources: false,
            nearest_wins: true,
            system_properties: BTreeMap::new(),
        }
    }
}

fn default_cache_root() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("mvn-resolver"))
        .unwrap_or_else(|| PathBuf::from(".mvn-cache"))
}

impl ResolverConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| MavenError::ParseError {
            document: "resolver configuration",
            message: e.to_string(),
        })
    }

    pub fn with_cache_root(mut self, cache_root: impl Into<PathBuf>) -> Self {
        self.cache_root = cache_root.into();
        self
    }

    pub fn with_strategy(mut self, strategy: ResolutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs)
    }

    pub fn metadata_expiration(&self) -> Duration {
        Duration::from_secs(self.metadata_expiration_secs)
    }
}
