//! Maven coordinates.
//!
//! An [`Artifact`] names one file family in a Maven repository through the
//! `group:artifact[:classifier[:extension]]:version` notation. Only GAVCE
//! coordinates (all five parts present) can be turned into paths or URLs.

use crate::error::{MavenError, Result};
use regex::Regex;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::LazyLock;

pub const DEFAULT_EXTENSION: &str = "jar";
pub const POM_EXTENSION: &str = "pom";
pub const WILDCARD: &str = "*";
pub const METADATA_FILE: &str = "maven-metadata.xml";
const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

static FIELD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^: /\\]+$").expect("valid coordinate field pattern"));

static COORDINATES_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<group>[^: ]+):(?P<artifact>[^: ]+)(?::(?P<classifier>[^: ]*)(?::(?P<extension>[^: ]+))?)?:(?P<version>[^: ]+)$",
    )
    .expect("valid coordinates pattern")
});

/// Which file family of an artifact a path or URL addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataLevel {
    /// The artifact file itself.
    Artifact,
    /// `maven-metadata.xml` in the artifact directory (versions list).
    ArtifactMetadata,
    /// `maven-metadata.xml` in the version directory (snapshot builds).
    VersionMetadata,
}

impl DataLevel {
    pub const fn is_metadata(self) -> bool {
        !matches!(self, Self::Artifact)
    }
}

/// Group, artifact and version: the key used to group variants of one release.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Gav {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl Gav {
    /// The `.pom` artifact describing this release.
    pub fn pom_artifact(&self) -> Artifact {
        Artifact {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            version: Some(self.version.clone()),
            snapshot_version: None,
            classifier: Some(String::new()),
            extension: Some(POM_EXTENSION.to_string()),
        }
    }
}

impl fmt::Display for Gav {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

/// Maven artifact coordinates.
///
/// Identity covers group, artifact, version, classifier and extension. The
/// concrete snapshot version picked during download is carried along but
/// does not take part in equality or hashing.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub group_id: String,
    pub artifact_id: String,
    version: Option<String>,
    snapshot_version: Option<String>,
    classifier: Option<String>,
    extension: Option<String>,
}

impl Artifact {
    /// Coordinates with the default variant (no classifier, `jar` extension).
    pub fn new(group_id: &str, artifact_id: &str, version: Option<&str>) -> Result<Self> {
        Self::with_variant(group_id, artifact_id, version, Some(""), Some(DEFAULT_EXTENSION))
    }

    pub fn with_variant(
        group_id: &str,
        artifact_id: &str,
        version: Option<&str>,
        classifier: Option<&str>,
        extension: Option<&str>,
    ) -> Result<Self> {
        let artifact = Self {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: version.map(str::to_string),
            snapshot_version: None,
            classifier: classifier.map(str::to_string),
            extension: extension.map(str::to_string),
        };
        artifact.validate()?;
        Ok(artifact)
    }

    /// Parses `group:artifact[:classifier[:extension]]:version`.
    ///
    /// A missing classifier means none, a missing extension means `jar`.
    pub fn parse(coordinates: &str) -> Result<Self> {
        let caps = COORDINATES_PATTERN.captures(coordinates.trim()).ok_or_else(|| {
            MavenError::invalid_coordinates(
                coordinates,
                "expected group:artifact[:classifier[:extension]]:version",
            )
        })?;

        Self::with_variant(
            &caps["group"],
            &caps["artifact"],
            Some(&caps["version"]),
            Some(caps.name("classifier").map_or("", |m| m.as_str())),
            Some(caps.name("extension").map_or(DEFAULT_EXTENSION, |m| m.as_str())),
        )
    }

    fn validate(&self) -> Result<()> {
        let wildcard_ok = |value: &str| value == WILDCARD || FIELD_PATTERN.is_match(value);
        if !wildcard_ok(&self.group_id) {
            return Err(MavenError::invalid_coordinates(self.to_string(), "invalid groupId"));
        }
        if !wildcard_ok(&self.artifact_id) {
            return Err(MavenError::invalid_coordinates(self.to_string(), "invalid artifactId"));
        }
        if let Some(version) = &self.version
            && !FIELD_PATTERN.is_match(version)
        {
            return Err(MavenError::invalid_coordinates(self.to_string(), "invalid version"));
        }
        if let Some(classifier) = &self.classifier
            && !classifier.is_empty()
            && !FIELD_PATTERN.is_match(classifier)
        {
            return Err(MavenError::invalid_coordinates(self.to_string(), "invalid classifier"));
        }
        if let Some(extension) = &self.extension
            && !FIELD_PATTERN.is_match(extension)
        {
            return Err(MavenError::invalid_coordinates(self.to_string(), "invalid extension"));
        }
        if self.is_wildcard() && self.version.is_some() {
            return Err(MavenError::invalid_coordinates(
                self.to_string(),
                "wildcards are only allowed in exclusion filters",
            ));
        }
        Ok(())
    }

    /// Declared version, `1.0-SNAPSHOT` for snapshots.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Version naming the actual file: the timestamped build for resolved
    /// snapshots, the declared version otherwise.
    pub fn concrete_version(&self) -> Option<&str> {
        self.snapshot_version.as_deref().or(self.version.as_deref())
    }

    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
    }

    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    pub fn is_wildcard(&self) -> bool {
        self.group_id == WILDCARD || self.artifact_id == WILDCARD
    }

    pub fn is_snapshot(&self) -> bool {
        self.version.as_deref().is_some_and(|v| v.ends_with(SNAPSHOT_SUFFIX))
    }

    /// True once a snapshot has been pinned to a timestamp and build number.
    pub fn is_snapshot_resolved(&self) -> bool {
        self.is_snapshot() && self.snapshot_version.is_some()
    }

    pub fn has_gav(&self) -> bool {
        self.version.is_some() && !self.is_wildcard()
    }

    pub fn has_gavce(&self) -> bool {
        self.has_gav() && self.classifier.is_some() && self.extension.is_some()
    }

    pub fn gav(&self) -> Result<Gav> {
        match &self.version {
            Some(version) if !self.is_wildcard() => Ok(Gav {
                group_id: self.group_id.clone(),
                artifact_id: self.artifact_id.clone(),
                version: version.clone(),
            }),
            _ => Err(MavenError::IncompleteCoordinates {
                artifact: self.to_string(),
            }),
        }
    }

    /// Same coordinates with another declared version.
    pub fn with_version(&self, version: &str) -> Result<Self> {
        let artifact = Self {
            version: Some(version.to_string()),
            snapshot_version: None,
            ..self.clone()
        };
        artifact.validate()?;
        Ok(artifact)
    }

    /// Same coordinates with another classifier and extension.
    pub fn with_classifier(&self, classifier: &str, extension: &str) -> Result<Self> {
        let artifact = Self {
            classifier: Some(classifier.to_string()),
            extension: Some(extension.to_string()),
            ..self.clone()
        };
        artifact.validate()?;
        Ok(artifact)
    }

    /// The `.pom` describing these coordinates.
    pub fn pom_artifact(&self) -> Result<Self> {
        self.with_classifier("", POM_EXTENSION)
    }

    /// Pins a snapshot to `{base}-{timestamp}-{build}`.
    pub fn with_snapshot_build(&self, timestamp: &str, build_number: u32) -> Result<Self> {
        let base = self.snapshot_base()?;
        Ok(Self {
            snapshot_version: Some(format!("{base}-{timestamp}-{build_number}")),
            ..self.clone()
        })
    }

    /// Uses the snapshot's declared file name, for repositories that publish
    /// snapshot builds without timestamps.
    pub fn with_plain_snapshot(&self) -> Result<Self> {
        self.snapshot_base()?;
        Ok(Self {
            snapshot_version: self.version.clone(),
            ..self.clone()
        })
    }

    fn snapshot_base(&self) -> Result<&str> {
        self.version
            .as_deref()
            .and_then(|v| v.strip_suffix(SNAPSHOT_SUFFIX))
            .ok_or_else(|| MavenError::invalid_coordinates(self.to_string(), "not a snapshot version"))
    }

    /// Repository-layout path relative to the repository root.
    pub fn local_path(&self, level: DataLevel) -> Result<String> {
        if self.is_wildcard() {
            return Err(MavenError::IncompleteCoordinates {
                artifact: self.to_string(),
            });
        }
        let base = format!("{}/{}", self.group_id.replace('.', "/"), self.artifact_id);

        match level {
            DataLevel::ArtifactMetadata => Ok(format!("{base}/{METADATA_FILE}")),
            DataLevel::VersionMetadata => {
                let version = self.version.as_deref().ok_or_else(|| MavenError::IncompleteCoordinates {
                    artifact: self.to_string(),
                })?;
                Ok(format!("{base}/{version}/{METADATA_FILE}"))
            }
            DataLevel::Artifact => {
                let (Some(version), Some(concrete), Some(classifier), Some(extension)) = (
                    self.version.as_deref(),
                    self.concrete_version(),
                    self.classifier.as_deref(),
                    self.extension.as_deref(),
                ) else {
                    return Err(MavenError::IncompleteCoordinates {
                        artifact: self.to_string(),
                    });
                };
                let classifier_part = if classifier.is_empty() {
                    String::new()
                } else {
                    format!("-{classifier}")
                };
                Ok(format!(
                    "{base}/{version}/{}-{concrete}{classifier_part}.{extension}",
                    self.artifact_id
                ))
            }
        }
    }
}

impl PartialEq for Artifact {
    fn eq(&self, other: &Self) -> bool {
        self.group_id == other.group_id
            && self.artifact_id == other.artifact_id
            && self.version == other.version
            && self.classifier == other.classifier
            && self.extension == other.extension
    }
}

impl Eq for Artifact {}

impl Hash for Artifact {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.group_id.hash(state);
        self.artifact_id.hash(state);
        self.version.hash(state);
        self.classifier.hash(state);
        self.extension.hash(state);
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)?;
        let classifier = self.classifier.as_deref().unwrap_or("");
        let extension = self.extension.as_deref().unwrap_or(DEFAULT_EXTENSION);
        if !classifier.is_empty() || extension != DEFAULT_EXTENSION {
            write!(f, ":{classifier}:{extension}")?;
        }
        if let Some(version) = &self.version {
            write!(f, ":{version}")?;
        }
        Ok(())
    }
}

impl FromStr for Artifact {
    type Err = MavenError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Exclusion filter matched on group and artifact only; `*` matches anything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Exclusion {
    pub group_id: String,
    pub artifact_id: String,
}

impl Exclusion {
    pub fn new(group_id: &str, artifact_id: &str) -> Result<Self> {
        for value in [group_id, artifact_id] {
            if value != WILDCARD && !FIELD_PATTERN.is_match(value) {
                return Err(MavenError::invalid_coordinates(
                    format!("{group_id}:{artifact_id}"),
                    "invalid exclusion filter",
                ));
            }
        }
        Ok(Self {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
        })
    }

    pub fn matches(&self, group_id: &str, artifact_id: &str) -> bool {
        (self.group_id == WILDCARD || self.group_id == group_id)
            && (self.artifact_id == WILDCARD || self.artifact_id == artifact_id)
    }
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)
    }
}
