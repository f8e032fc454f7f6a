//! Errors for Maven coordinate, document and repository handling.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MavenError {
    #[error("Failed to parse {document}: {message}")]
    ParseError {
        document: &'static str,
        message: String,
    },

    #[error("Failed to serialize {document}: {message}")]
    SerializeError {
        document: &'static str,
        message: String,
    },

    #[error("Invalid Maven coordinates '{coordinates}': {message}")]
    InvalidCoordinates { coordinates: String, message: String },

    #[error("Artifact '{artifact}' does not define complete GAVCE coordinates")]
    IncompleteCoordinates { artifact: String },

    #[error("Artifact '{artifact}' has no version declared in dependency management")]
    MissingVersion { artifact: String },

    #[error("POM '{artifact}' not found on any repository")]
    PomNotFound { artifact: String },

    #[error("Dependency graph of '{artifact}' is not resolved")]
    GraphUnresolved { artifact: String },

    #[error("Artifact '{artifact}' could not be acquired from {repository}")]
    ArtifactUnavailable {
        artifact: String,
        repository: String,
    },

    #[error("Checksum mismatch for {url}: expected {expected}, computed {actual}")]
    ChecksumMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("Malformed checksum '{checksum}' received from {url}")]
    MalformedChecksum { url: String, checksum: String },

    #[error("{method} {url} failed with HTTP status {status}")]
    HttpStatus {
        method: &'static str,
        url: String,
        status: u16,
    },

    #[error("Request to {url} failed: {source}")]
    RegistryError {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid repository URL '{url}': {message}")]
    InvalidRepositoryUrl { url: String, message: String },

    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Publishing failed on {failed} of {total} repositories")]
    PublishFailed { failed: usize, total: usize },

    #[error("{message}: {source}")]
    Context {
        message: String,
        #[source]
        source: Box<MavenError>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MavenError>;

impl MavenError {
    /// Wraps this error with a higher level message, keeping it as the source.
    pub fn context(self, message: impl Into<String>) -> Self {
        Self::Context {
            message: message.into(),
            source: Box::new(self),
        }
    }

    pub(crate) fn invalid_coordinates(coordinates: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidCoordinates {
            coordinates: coordinates.into(),
            message: message.into(),
        }
    }

    /// Returns the innermost error of a [`MavenError::Context`] chain.
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::Context { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
