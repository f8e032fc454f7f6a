//! `maven-metadata.xml` documents.
//!
//! Both documents are read-modify-write: publishers merge one entry into the
//! current copy instead of replacing it, so history written by other
//! publishers survives.

use crate::artifact::Artifact;
use crate::error::{MavenError, Result};
use crate::version::{compare_versions, max_version};
use serde::{Deserialize, Serialize};

const METADATA_MODEL_VERSION: &str = "1.1.0";

fn parse_document<T: serde::de::DeserializeOwned>(xml: &str) -> Result<T> {
    quick_xml::de::from_str(xml).map_err(|e| MavenError::ParseError {
        document: "maven-metadata.xml",
        message: e.to_string(),
    })
}

fn write_document<T: Serialize>(document: &T) -> Result<String> {
    let body = quick_xml::se::to_string(document).map_err(|e| MavenError::SerializeError {
        document: "maven-metadata.xml",
        message: e.to_string(),
    })?;
    Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{body}\n"))
}

/// Version-level metadata describing the builds of one snapshot version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "metadata", rename_all = "camelCase")]
pub struct VersionMetadata {
    #[serde(rename = "@modelVersion", default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versioning: Option<SnapshotVersioning>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotVersioning {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Snapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_versions: Option<SnapshotVersions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_copy: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotVersions {
    #[serde(rename = "snapshotVersion", default)]
    pub snapshot_version: Vec<SnapshotVersion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotVersion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

/// Latest published build of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotBuild {
    /// Timestamped deployment `{base}-{timestamp}-{build_number}`.
    Timestamped { timestamp: String, build_number: u32 },
    /// Deployed under the plain `-SNAPSHOT` file name.
    Plain,
}

impl VersionMetadata {
    pub fn from_xml(xml: &str) -> Result<Self> {
        parse_document(xml)
    }

    pub fn to_xml(&self) -> Result<String> {
        write_document(self)
    }

    /// Build to download, `None` when no snapshot block is present.
    pub fn latest_build(&self) -> Option<SnapshotBuild> {
        let snapshot = self.versioning.as_ref()?.snapshot.as_ref()?;
        match (&snapshot.timestamp, snapshot.build_number) {
            (Some(timestamp), Some(build_number)) if !timestamp.trim().is_empty() => {
                Some(SnapshotBuild::Timestamped {
                    timestamp: timestamp.trim().to_string(),
                    build_number,
                })
            }
            _ => Some(SnapshotBuild::Plain),
        }
    }

    /// Highest build number recorded so far, 0 when none.
    pub fn build_number(&self) -> u32 {
        self.versioning
            .as_ref()
            .and_then(|v| v.snapshot.as_ref())
            .and_then(|s| s.build_number)
            .unwrap_or(0)
    }

    /// Build number for the next snapshot upload, saturating at `u32::MAX`.
    pub fn next_build_number(&self) -> u32 {
        self.build_number().saturating_add(1)
    }

    /// Records a new snapshot build. `files` lists the `(classifier,
    /// extension)` pairs uploaded with it; existing entries for the same pair
    /// are replaced, others kept.
    pub fn record_snapshot(
        &mut self,
        artifact: &Artifact,
        timestamp: &str,
        build_number: u32,
        last_updated: &str,
        files: &[(String, String)],
    ) {
        self.model_version
            .get_or_insert_with(|| METADATA_MODEL_VERSION.to_string());
        self.group_id = Some(artifact.group_id.clone());
        self.artifact_id = Some(artifact.artifact_id.clone());
        self.version = artifact.version().map(str::to_string);

        let base = artifact
            .version()
            .and_then(|v| v.strip_suffix("-SNAPSHOT"))
            .unwrap_or_default();
        let value = format!("{base}-{timestamp}-{build_number}");

        let versioning = self.versioning.get_or_insert_with(Default::default);
        versioning.snapshot = Some(Snapshot {
            timestamp: Some(timestamp.to_string()),
            build_number: Some(build_number),
            local_copy: None,
        });
        versioning.last_updated = Some(last_updated.to_string());

        let entries = &mut versioning
            .snapshot_versions
            .get_or_insert_with(Default::default)
            .snapshot_version;
        for (classifier, extension) in files {
            let same_file = |entry: &SnapshotVersion| {
                entry.classifier.as_deref().unwrap_or("") == classifier
                    && entry.extension.as_deref().unwrap_or("") == extension
            };
            entries.retain(|entry| !same_file(entry));
            entries.push(SnapshotVersion {
                classifier: (!classifier.is_empty()).then(|| classifier.clone()),
                extension: Some(extension.clone()),
                value: Some(value.clone()),
                updated: Some(last_updated.to_string()),
            });
        }
    }
}

/// Artifact-level metadata listing every published version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "metadata", rename_all = "camelCase")]
pub struct ArtifactMetadata {
    #[serde(rename = "@modelVersion", default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versioning: Option<ArtifactVersioning>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactVersioning {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versions: Option<Versions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Versions {
    #[serde(default)]
    pub version: Vec<String>,
}

impl ArtifactMetadata {
    pub fn from_xml(xml: &str) -> Result<Self> {
        parse_document(xml)
    }

    pub fn to_xml(&self) -> Result<String> {
        write_document(self)
    }

    pub fn versions(&self) -> &[String] {
        self.versioning
            .as_ref()
            .and_then(|v| v.versions.as_ref())
            .map_or(&[], |v| v.version.as_slice())
    }

    /// Adds the artifact's version, moving `latest` (and `release` for
    /// non-snapshots) forward only.
    pub fn record_version(&mut self, artifact: &Artifact, last_updated: &str) {
        self.model_version
            .get_or_insert_with(|| METADATA_MODEL_VERSION.to_string());
        self.group_id = Some(artifact.group_id.clone());
        self.artifact_id = Some(artifact.artifact_id.clone());

        let Some(version) = artifact.version() else {
            return;
        };
        let versioning = self.versioning.get_or_insert_with(Default::default);
        versioning.latest = Some(max_version(versioning.latest.as_deref(), version));
        if !artifact.is_snapshot() {
            versioning.release = Some(max_version(versioning.release.as_deref(), version));
        }

        let versions = &mut versioning.versions.get_or_insert_with(Default::default).version;
        if !versions.iter().any(|v| v == version) {
            versions.push(version.to_string());
            versions.sort_by(|a, b| compare_versions(a, b));
        }
        versioning.last_updated = Some(last_updated.to_string());
    }
}
