//! Remote and local Maven repositories.

use crate::artifact::{Artifact, DataLevel};
use crate::error::{MavenError, Result};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Deferred secret accessor, evaluated on every request.
pub type SecretFn = Arc<dyn Fn() -> String + Send + Sync>;

/// Per-repository authentication.
#[derive(Clone)]
pub enum Credentials {
    Basic { username: SecretFn, password: SecretFn },
    Bearer { token: SecretFn },
}

impl Credentials {
    pub fn basic<U, P>(username: U, password: P) -> Self
    where
        U: Fn() -> String + Send + Sync + 'static,
        P: Fn() -> String + Send + Sync + 'static,
    {
        Self::Basic {
            username: Arc::new(username),
            password: Arc::new(password),
        }
    }

    pub fn bearer<T>(token: T) -> Self
    where
        T: Fn() -> String + Send + Sync + 'static,
    {
        Self::Bearer { token: Arc::new(token) }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic { .. } => f.write_str("Credentials::Basic(<redacted>)"),
            Self::Bearer { .. } => f.write_str("Credentials::Bearer(<redacted>)"),
        }
    }
}

/// Checksum sidecar kinds, in the order they are probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChecksumKind {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl ChecksumKind {
    pub const ALL: [Self; 4] = [Self::Md5, Self::Sha1, Self::Sha256, Self::Sha512];

    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Md5 => ".md5",
            Self::Sha1 => ".sha1",
            Self::Sha256 => ".sha256",
            Self::Sha512 => ".sha512",
        }
    }

    /// Length of the lowercase hex digest.
    pub const fn hex_len(self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha1 => 40,
            Self::Sha256 => 64,
            Self::Sha512 => 128,
        }
    }
}

impl fmt::Display for ChecksumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha512 => "SHA-512",
        })
    }
}

/// A Maven repository. Equality and hashing use the base URL only.
#[derive(Debug, Clone)]
pub struct Repository {
    pub name: String,
    base_url: String,
    pub credentials: Option<Credentials>,
    /// Local repositories are never written into published POMs.
    pub is_local: bool,
}

impl Repository {
    /// Accepts `http://`, `https://` and `file:` URLs; trailing slashes are dropped.
    pub fn new(name: &str, base_url: &str) -> Result<Self> {
        let normalized = base_url.trim().replace('\\', "/");
        let normalized = normalized.trim_end_matches('/');

        let lower = normalized.to_lowercase();
        let has_host = lower
            .strip_prefix("http://")
            .or_else(|| lower.strip_prefix("https://"))
            .is_some_and(|rest| !rest.is_empty() && !rest.starts_with('/'));
        if !has_host && !lower.starts_with("file:") {
            return Err(MavenError::InvalidRepositoryUrl {
                url: base_url.to_string(),
                message: "expected an http(s):// or file: URL".into(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            base_url: normalized.to_string(),
            credentials: None,
            is_local: false,
        })
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    #[must_use]
    pub fn local(mut self) -> Self {
        self.is_local = true;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_file(&self) -> bool {
        self.base_url.to_lowercase().starts_with("file:")
    }

    /// Identifier used for `<repository><id>` in generated POMs.
    pub fn id(&self) -> String {
        self.name
            .trim()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '-' })
            .collect::<String>()
            .to_lowercase()
    }

    /// URL of one artifact file family, or of its checksum sidecar.
    pub fn artifact_url(&self, artifact: &Artifact, level: DataLevel, checksum: Option<ChecksumKind>) -> Result<String> {
        let path = artifact.local_path(level)?;
        let suffix = checksum.map_or("", ChecksumKind::suffix);
        Ok(format!("{}/{path}{suffix}", self.base_url))
    }
}

impl PartialEq for Repository {
    fn eq(&self, other: &Self) -> bool {
        self.base_url == other.base_url
    }
}

impl Eq for Repository {}

impl Hash for Repository {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.base_url.hash(state);
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.base_url)
    }
}
