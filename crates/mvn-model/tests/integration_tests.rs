//! Integration tests using fixture files.

use mvn_model::{
    Artifact, ArtifactMetadata, DataLevel, DependencyGraph, Pom, Scope, SnapshotBuild, VersionMetadata,
};
use std::collections::BTreeMap;

fn load_fixture(name: &str) -> String {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("failed to read {name}: {e}"))
}

#[test]
fn test_fixture_complex_pom() {
    let pom = Pom::from_xml(&load_fixture("complex_pom.xml")).unwrap();

    // Plugin dependencies under <build> are not project dependencies.
    assert_eq!(pom.dependencies().len(), 6);
    assert_eq!(pom.managed_dependencies().len(), 2);
    assert_eq!(pom.declared_repositories().len(), 1);
    assert_eq!(
        pom.properties.as_ref().unwrap().get("guava.version"),
        Some("32.1.3-jre")
    );

    let scopes: Vec<_> = pom.dependencies().iter().map(|d| d.declared_scope()).collect();
    assert_eq!(
        scopes,
        vec![
            None,
            None,
            Some(Scope::Provided),
            Some(Scope::Runtime),
            Some(Scope::Test),
            Some(Scope::System),
        ]
    );
    assert!(pom.dependencies()[3].is_optional());
}

#[test]
fn test_fixture_interpolation() {
    let mut pom = Pom::from_xml(&load_fixture("complex_pom.xml")).unwrap();
    pom.interpolate(&BTreeMap::new());

    let guava = pom.dependencies()[0].artifact().unwrap();
    assert_eq!(guava.to_string(), "com.google.guava:guava:32.1.3-jre");
    assert_eq!(pom.dependencies()[0].exclusion_filters().unwrap().len(), 1);

    let demo_core = pom.dependencies()[4].artifact().unwrap();
    assert_eq!(demo_core.to_string(), "com.example:demo-core:tests:jar:1.4.0-SNAPSHOT");

    assert_eq!(pom.managed_dependencies()[1].group_id, "io.netty");
    assert_eq!(
        pom.declared_repositories()[0].url,
        "https://repo.example.com/releases/"
    );

    // Unset environment variables fall back to the placeholder.
    assert_eq!(
        pom.dependencies()[5].system_path.as_deref(),
        Some("NA/lib/tools.jar")
    );
}

#[test]
fn test_fixture_pom_coordinates() {
    let pom = Pom::from_xml(&load_fixture("complex_pom.xml")).unwrap();
    let system = BTreeMap::new();
    let coordinates = pom.coordinates(&system).unwrap();
    assert!(coordinates.is_snapshot());
    assert_eq!(
        coordinates.local_path(DataLevel::Artifact).unwrap(),
        "com/example/demo-service/1.4.0-SNAPSHOT/demo-service-1.4.0-SNAPSHOT.pom"
    );
    let parent = pom.parent_artifact(&system).unwrap().unwrap();
    assert_eq!(
        parent.to_string(),
        "org.springframework.boot:spring-boot-starter-parent::pom:3.2.0"
    );
}

#[test]
fn test_fixture_snapshot_metadata() {
    let metadata = VersionMetadata::from_xml(&load_fixture("snapshot_metadata.xml")).unwrap();
    let Some(SnapshotBuild::Timestamped {
        timestamp,
        build_number,
    }) = metadata.latest_build()
    else {
        panic!("expected a timestamped build");
    };

    let artifact = Artifact::parse("com.example:demo-service:1.4.0-SNAPSHOT").unwrap();
    let resolved = artifact.with_snapshot_build(&timestamp, build_number).unwrap();
    assert_eq!(
        resolved.local_path(DataLevel::Artifact).unwrap(),
        "com/example/demo-service/1.4.0-SNAPSHOT/demo-service-1.4.0-20240315.142233-12.jar"
    );
}

#[test]
fn test_fixture_artifact_metadata() {
    let mut metadata = ArtifactMetadata::from_xml(&load_fixture("artifact_metadata.xml")).unwrap();
    assert_eq!(metadata.versions().len(), 3);

    metadata.record_version(
        &Artifact::parse("com.google.guava:guava:33.1.0-jre").unwrap(),
        "20240401000000",
    );
    let versioning = metadata.versioning.as_ref().unwrap();
    assert_eq!(versioning.latest.as_deref(), Some("33.1.0-jre"));
    assert_eq!(versioning.release.as_deref(), Some("33.1.0-jre"));
    assert_eq!(metadata.versions().last().map(String::as_str), Some("33.1.0-jre"));
}

#[test]
fn test_graph_from_fixture_dependencies() {
    let mut pom = Pom::from_xml(&load_fixture("complex_pom.xml")).unwrap();
    pom.interpolate(&BTreeMap::new());

    let mut graph = DependencyGraph::new();
    for dependency in pom.dependencies() {
        let artifact = dependency.artifact().unwrap();
        if !artifact.has_gavce() {
            continue;
        }
        let scope = dependency.declared_scope().unwrap_or_default();
        graph
            .add_transitive(
                scope,
                artifact,
                dependency.exclusion_filters().unwrap(),
                dependency.system_path.clone(),
                dependency.is_optional(),
            )
            .unwrap();
    }

    // netty-handler has no inline version and is skipped here.
    assert_eq!(graph.len(), 5);
    assert!(!graph.is_resolved());
}
