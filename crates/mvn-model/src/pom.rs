//! POM documents.
//!
//! [`Pom`] maps the subset of the POM v4 schema the resolver needs onto plain
//! structs (de)serialized with `quick-xml`. Besides parsing it implements
//! `${property}` substitution and the merge used for parent inheritance and
//! `import`-scoped BOMs. All merges append in import order so that lookups
//! keeping the first match honor "first declared wins".

use crate::artifact::{Artifact, DEFAULT_EXTENSION, Exclusion, POM_EXTENSION};
use crate::error::{MavenError, Result};
use crate::scope::Scope;
use regex::{Captures, Regex};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

pub const POM_NAMESPACE: &str = "http://maven.apache.org/POM/4.0.0";
pub const MODEL_VERSION: &str = "4.0.0";
/// Substituted for properties no source can resolve.
pub const UNRESOLVED_PROPERTY: &str = "NA";

static PROPERTY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^${}]+)\}").expect("valid property pattern"));

static NO_SYSTEM_PROPERTIES: BTreeMap<String, String> = BTreeMap::new();

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename = "project", rename_all = "camelCase")]
pub struct Pom {
    #[serde(rename = "@xmlns", default, skip_serializing_if = "Option::is_none")]
    pub xmlns: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Parent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packaging: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency_management: Option<DependencyManagement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Dependencies>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repositories: Option<Repositories>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parent {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyManagement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Dependencies>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dependencies {
    #[serde(default)]
    pub dependency: Vec<Dependency>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Repositories {
    #[serde(default)]
    pub repository: Vec<PomRepository>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PomRepository {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Exclusions {
    #[serde(default)]
    pub exclusion: Vec<ExclusionEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExclusionEntry {
    pub group_id: String,
    pub artifact_id: String,
}

/// One `<dependency>` element, kept as declared text until the resolver
/// interprets it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub group_id: String,
    pub artifact_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusions: Option<Exclusions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<String>,
}

impl Dependency {
    /// Builds a declaration from coordinates, the inverse of [`Dependency::artifact`].
    pub fn from_artifact(artifact: &Artifact, scope: Scope) -> Self {
        let classifier = artifact.classifier().filter(|c| !c.is_empty());
        let extension = artifact.extension().unwrap_or(DEFAULT_EXTENSION);
        let kind = match (classifier, extension) {
            (Some("tests"), "jar") => Some("test-jar".to_string()),
            (_, DEFAULT_EXTENSION) => None,
            (_, other) => Some(other.to_string()),
        };
        let classifier = match kind.as_deref() {
            Some("test-jar") => None,
            _ => classifier.map(str::to_string),
        };

        Self {
            group_id: artifact.group_id.clone(),
            artifact_id: artifact.artifact_id.clone(),
            version: artifact.version().map(str::to_string),
            kind,
            classifier,
            scope: (scope != Scope::Compile).then(|| scope.as_str().to_string()),
            ..Self::default()
        }
    }

    /// Declared scope, `None` when the element is absent.
    pub fn declared_scope(&self) -> Option<Scope> {
        self.scope
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.parse().unwrap_or_default())
    }

    pub fn is_optional(&self) -> bool {
        self.optional
            .as_deref()
            .is_some_and(|o| o.trim().eq_ignore_ascii_case("true"))
    }

    /// Classifier and extension implied by `<type>` and `<classifier>`.
    pub fn variant(&self) -> (String, String) {
        let kind = self.kind.as_deref().map(str::trim).filter(|k| !k.is_empty());
        let (implied_classifier, extension) = match kind {
            None => ("", DEFAULT_EXTENSION),
            Some("test-jar") => ("tests", DEFAULT_EXTENSION),
            Some("bundle" | "maven-plugin" | "ejb" | "ejb-client") => ("", DEFAULT_EXTENSION),
            Some(other) => ("", other),
        };
        let classifier = self
            .classifier
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(implied_classifier);
        (classifier.to_string(), extension.to_string())
    }

    /// Coordinates of the declared file; the version may be missing.
    pub fn artifact(&self) -> Result<Artifact> {
        let (classifier, extension) = self.variant();
        let version = self.version.as_deref().map(str::trim).filter(|v| !v.is_empty());
        Artifact::with_variant(
            self.group_id.trim(),
            self.artifact_id.trim(),
            version,
            Some(&classifier),
            Some(&extension),
        )
    }

    pub fn exclusion_filters(&self) -> Result<Vec<Exclusion>> {
        self.exclusions
            .iter()
            .flat_map(|e| e.exclusion.iter())
            .map(|e| Exclusion::new(e.group_id.trim(), e.artifact_id.trim()))
            .collect()
    }

    /// `group:artifact`, the key dependency management is looked up by.
    pub fn management_key(&self) -> (String, String) {
        (self.group_id.trim().to_string(), self.artifact_id.trim().to_string())
    }

    fn substitute(&mut self, fill: &impl Fn(&str) -> String) {
        self.group_id = fill(&self.group_id);
        self.artifact_id = fill(&self.artifact_id);
        for field in [
            &mut self.version,
            &mut self.kind,
            &mut self.classifier,
            &mut self.scope,
            &mut self.system_path,
            &mut self.optional,
        ]
        .into_iter()
        .flatten()
        {
            *field = fill(field.as_str());
        }
        if let Some(exclusions) = &mut self.exclusions {
            for exclusion in &mut exclusions.exclusion {
                exclusion.group_id = fill(&exclusion.group_id);
                exclusion.artifact_id = fill(&exclusion.artifact_id);
            }
        }
    }
}

/// Ordered `<properties>` table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties(Vec<(String, String)>);

impl Properties {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Sets `key`, replacing an existing value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Appends entries of `other` whose keys are not defined yet.
    pub fn merge_missing(&mut self, other: &Self) {
        for (key, value) in &other.0 {
            if self.get(key).is_none() {
                self.0.push((key.clone(), value.clone()));
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for Properties {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct PropertiesVisitor;

        impl<'de> Visitor<'de> for PropertiesVisitor {
            type Value = Properties;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a <properties> element")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Properties, A::Error> {
                let mut properties = Properties::default();
                while let Some((key, value)) = map.next_entry::<String, Option<String>>()? {
                    // First definition wins for duplicated keys.
                    if properties.get(&key).is_none() {
                        properties.0.push((key, value.unwrap_or_default()));
                    }
                }
                Ok(properties)
            }

            fn visit_str<E: serde::de::Error>(self, _value: &str) -> std::result::Result<Properties, E> {
                Ok(Properties::default())
            }

            fn visit_unit<E: serde::de::Error>(self) -> std::result::Result<Properties, E> {
                Ok(Properties::default())
            }
        }

        deserializer.deserialize_map(PropertiesVisitor)
    }
}

impl Serialize for Properties {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Pom {
    /// Skeleton POM for the given coordinates.
    pub fn new(artifact: &Artifact) -> Self {
        let extension = artifact.extension().unwrap_or(DEFAULT_EXTENSION);
        Self {
            xmlns: Some(POM_NAMESPACE.to_string()),
            model_version: Some(MODEL_VERSION.to_string()),
            group_id: Some(artifact.group_id.clone()),
            artifact_id: Some(artifact.artifact_id.clone()),
            version: artifact.version().map(str::to_string),
            packaging: (extension != DEFAULT_EXTENSION && extension != POM_EXTENSION)
                .then(|| extension.to_string()),
            ..Self::default()
        }
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        quick_xml::de::from_str(xml).map_err(|e| MavenError::ParseError {
            document: "pom.xml",
            message: e.to_string(),
        })
    }

    pub fn to_xml(&self) -> Result<String> {
        let body = quick_xml::se::to_string(self).map_err(|e| MavenError::SerializeError {
            document: "pom.xml",
            message: e.to_string(),
        })?;
        Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{body}\n"))
    }

    pub fn dependencies(&self) -> &[Dependency] {
        self.dependencies.as_ref().map_or(&[], |d| d.dependency.as_slice())
    }

    pub fn managed_dependencies(&self) -> &[Dependency] {
        self.dependency_management
            .as_ref()
            .and_then(|m| m.dependencies.as_ref())
            .map_or(&[], |d| d.dependency.as_slice())
    }

    pub fn declared_repositories(&self) -> &[PomRepository] {
        self.repositories.as_ref().map_or(&[], |r| r.repository.as_slice())
    }

    pub fn add_dependency(&mut self, dependency: Dependency) {
        self.dependencies
            .get_or_insert_with(Default::default)
            .dependency
            .push(dependency);
    }

    pub fn add_repository(&mut self, repository: PomRepository) {
        self.repositories
            .get_or_insert_with(Default::default)
            .repository
            .push(repository);
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties
            .get_or_insert_with(Default::default)
            .insert(key, value);
    }

    /// Substitutes `${name}` references using the POM's own properties.
    pub fn fill_properties(&self, text: &str) -> String {
        self.fill_properties_with(text, &NO_SYSTEM_PROPERTIES)
    }

    /// Single left-to-right pass over `text`. Lookups try `env.*` variables,
    /// then `system`, then the property table, then `project.*`/`pom.*`
    /// built-ins. Anything else becomes [`UNRESOLVED_PROPERTY`].
    pub fn fill_properties_with(&self, text: &str, system: &BTreeMap<String, String>) -> String {
        if !text.contains("${") {
            return text.to_string();
        }
        PROPERTY_PATTERN
            .replace_all(text, |caps: &Captures<'_>| {
                self.lookup_property(&caps[1], system).unwrap_or_else(|| {
                    tracing::debug!("unresolved property '{}' in '{}'", &caps[1], text);
                    UNRESOLVED_PROPERTY.to_string()
                })
            })
            .into_owned()
    }

    fn lookup_property(&self, name: &str, system: &BTreeMap<String, String>) -> Option<String> {
        if let Some(variable) = name.strip_prefix("env.") {
            return std::env::var(variable).ok();
        }
        if let Some(value) = system.get(name) {
            return Some(value.clone());
        }
        if let Some(value) = self.properties.as_ref().and_then(|p| p.get(name)) {
            return Some(value.to_string());
        }
        let builtin = name.strip_prefix("project.").or_else(|| name.strip_prefix("pom."))?;
        let parent = self.parent.as_ref();
        match builtin {
            "groupId" => self.group_id.clone().or_else(|| parent.map(|p| p.group_id.clone())),
            "artifactId" => self.artifact_id.clone(),
            "version" => self.version.clone().or_else(|| parent.map(|p| p.version.clone())),
            "packaging" => Some(self.packaging.clone().unwrap_or_else(|| DEFAULT_EXTENSION.to_string())),
            "parent.groupId" => parent.map(|p| p.group_id.clone()),
            "parent.artifactId" => parent.map(|p| p.artifact_id.clone()),
            "parent.version" => parent.map(|p| p.version.clone()),
            _ => None,
        }
    }

    /// Rewrites coordinates, dependency declarations and repositories with
    /// properties substituted.
    pub fn interpolate(&mut self, system: &BTreeMap<String, String>) {
        let mut dependencies = self.dependencies.take();
        let mut managed = self.dependency_management.take();
        let mut repositories = self.repositories.take();
        let mut parent = self.parent.clone();
        let mut coordinates = [self.group_id.clone(), self.artifact_id.clone(), self.version.clone()];

        let fill = |text: &str| self.fill_properties_with(text, system);
        for dependency in dependencies
            .iter_mut()
            .flat_map(|d| d.dependency.iter_mut())
            .chain(
                managed
                    .iter_mut()
                    .filter_map(|m| m.dependencies.as_mut())
                    .flat_map(|d| d.dependency.iter_mut()),
            )
        {
            dependency.substitute(&fill);
        }
        for repository in repositories.iter_mut().flat_map(|r| r.repository.iter_mut()) {
            repository.url = fill(&repository.url);
            repository.id = repository.id.as_deref().map(&fill);
            repository.name = repository.name.as_deref().map(&fill);
        }
        if let Some(parent) = &mut parent {
            parent.group_id = fill(&parent.group_id);
            parent.artifact_id = fill(&parent.artifact_id);
            parent.version = fill(&parent.version);
        }
        for field in coordinates.iter_mut().flatten() {
            *field = fill(field.as_str());
        }

        let [group_id, artifact_id, version] = coordinates;
        self.dependencies = dependencies;
        self.dependency_management = managed;
        self.repositories = repositories;
        self.parent = parent;
        self.group_id = group_id;
        self.artifact_id = artifact_id;
        self.version = version;
    }

    /// Merges `other` into this POM, after everything already present.
    ///
    /// Dependency management is always merged. Dependencies, repositories and
    /// properties are only inherited for a real parent (`full_import`).
    pub fn import_pom(&mut self, other: &Self, full_import: bool) {
        let managed = other.managed_dependencies();
        if !managed.is_empty() {
            self.dependency_management
                .get_or_insert_with(Default::default)
                .dependencies
                .get_or_insert_with(Default::default)
                .dependency
                .extend(managed.iter().cloned());
        }
        if !full_import {
            return;
        }

        for dependency in other.dependencies() {
            self.add_dependency(dependency.clone());
        }
        for repository in other.declared_repositories() {
            self.add_repository(repository.clone());
        }
        if let Some(properties) = &other.properties {
            self.properties
                .get_or_insert_with(Default::default)
                .merge_missing(properties);
        }
        if self.group_id.is_none() {
            self.group_id.clone_from(&other.group_id);
        }
        if self.version.is_none() {
            self.version.clone_from(&other.version);
        }
    }

    /// Coordinates of this POM, falling back to the parent's group and version.
    pub fn coordinates(&self, system: &BTreeMap<String, String>) -> Result<Artifact> {
        let parent = self.parent.as_ref();
        let group_id = self
            .group_id
            .clone()
            .or_else(|| parent.map(|p| p.group_id.clone()))
            .unwrap_or_default();
        let artifact_id = self.artifact_id.clone().unwrap_or_default();
        let version = self.version.clone().or_else(|| parent.map(|p| p.version.clone()));

        Artifact::with_variant(
            &self.fill_properties_with(&group_id, system),
            &self.fill_properties_with(&artifact_id, system),
            version.map(|v| self.fill_properties_with(&v, system)).as_deref(),
            Some(""),
            Some(POM_EXTENSION),
        )
    }

    /// `.pom` coordinates of the parent, if any.
    pub fn parent_artifact(&self, system: &BTreeMap<String, String>) -> Result<Option<Artifact>> {
        let Some(parent) = &self.parent else {
            return Ok(None);
        };
        Artifact::with_variant(
            &self.fill_properties_with(&parent.group_id, system),
            &self.fill_properties_with(&parent.artifact_id, system),
            Some(&self.fill_properties_with(&parent.version, system)),
            Some(""),
            Some(POM_EXTENSION),
        )
        .map(Some)
    }
}
