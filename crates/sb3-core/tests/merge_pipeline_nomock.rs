//! End-to-end merge runs over real directories.
//!
//! Each test builds source archives in a temp dir, runs the full
//! discover → read → fold → write pipeline and inspects what landed on disk.

use sb3_bundle::{ArchiveReader, ProjectManifest};
use sb3_core::config::{EmptyRunPolicy, MergeConfig, SourceOrder};
use sb3_core::pipeline::{run_merge, PipelineError, SourceStatus};
use serde_json::{json, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::{FileOptions, ZipWriter};

// ============================================================================
// Fixtures
// ============================================================================

fn write_sb3(path: &Path, manifest: &Value, assets: &[(&str, &[u8])]) {
    let file = fs::File::create(path).expect("create archive");
    let mut zip = ZipWriter::new(file);
    let options: FileOptions<'_, ()> = FileOptions::default();

    zip.start_file("project.json", options).unwrap();
    zip.write_all(&serde_json::to_vec(manifest).unwrap()).unwrap();
    for (name, data) in assets {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap();
}

fn stage(name: &str) -> Value {
    json!({"isStage": true, "name": name, "costumes": []})
}

fn sprite(name: &str, costume: &str) -> Value {
    json!({"isStage": false, "name": name, "costumes": [{"md5ext": costume}]})
}

fn config_for(dir: &Path) -> MergeConfig {
    MergeConfig {
        input_dir: dir.to_path_buf(),
        ..MergeConfig::default()
    }
}

fn read_merged(dir: &Path) -> (ProjectManifest, Vec<String>) {
    let archive = ArchiveReader::open(&dir.join("all_merged.sb3"))
        .unwrap()
        .extract()
        .unwrap();
    let manifest = archive.parse_manifest().unwrap();
    let mut assets: Vec<String> = archive
        .assets()
        .map(|(path, _)| path.to_string())
        .collect();
    assets.sort();
    (manifest, assets)
}

fn target_names(manifest: &ProjectManifest) -> Vec<&str> {
    manifest.targets.iter().map(|t| t.name.as_str()).collect()
}

// ============================================================================
// Merge semantics
// ============================================================================

#[test]
fn test_two_sources_combined() {
    let dir = TempDir::new().unwrap();
    write_sb3(
        &dir.path().join("a.sb3"),
        &json!({
            "targets": [stage("Stage"), sprite("Cat", "cat.svg")],
            "variables": {"v1": ["score", 0]},
            "meta": {"semver": "3.0.0"}
        }),
        &[("cat.svg", b"cat")],
    );
    write_sb3(
        &dir.path().join("b.sb3"),
        &json!({
            "targets": [stage("Other Stage"), sprite("Dog", "dog.svg")],
            "variables": {"v1": ["points", 9], "v2": ["lives", 3]},
            "broadcasts": {"b1": "go"},
            "meta": {"semver": "9.9.9"}
        }),
        &[("dog.svg", b"dog")],
    );

    let outcome = run_merge(&config_for(dir.path())).unwrap();
    assert_eq!(outcome.merged_count(), 2);
    assert_eq!(outcome.skipped_count(), 0);
    assert_eq!(outcome.stats.stages_ignored, 1);

    let (manifest, assets) = read_merged(dir.path());
    assert_eq!(target_names(&manifest), ["Stage", "Cat", "Dog"]);
    assert_eq!(assets, ["cat.svg", "dog.svg"]);

    let variables = manifest.variables.as_ref().unwrap();
    assert_eq!(variables["v1"], json!(["score", 0]));
    assert_eq!(variables["v2"], json!(["lives", 3]));
    assert_eq!(manifest.broadcasts.as_ref().unwrap()["b1"], json!("go"));
    assert_eq!(manifest.extra["meta"], json!({"semver": "3.0.0"}));

    let standalone = fs::read(dir.path().join("project.json")).unwrap();
    assert_eq!(ProjectManifest::parse(&standalone).unwrap(), manifest);
}

#[test]
fn test_later_sprite_replaces_earlier() {
    let dir = TempDir::new().unwrap();
    write_sb3(
        &dir.path().join("1.sb3"),
        &json!({"targets": [stage("Stage"), sprite("Cat", "old.svg"), sprite("Ball", "ball.svg")]}),
        &[],
    );
    write_sb3(
        &dir.path().join("2.sb3"),
        &json!({"targets": [stage("Stage"), sprite("Cat", "new.svg")]}),
        &[],
    );

    let outcome = run_merge(&config_for(dir.path())).unwrap();
    assert_eq!(outcome.stats.targets_replaced, 1);

    let (manifest, _) = read_merged(dir.path());
    assert_eq!(target_names(&manifest), ["Stage", "Ball", "Cat"]);
    let cat = manifest.find_sprite("Cat").unwrap();
    assert_eq!(cat.content["costumes"], json!([{"md5ext": "new.svg"}]));
}

#[test]
fn test_single_source_roundtrips() {
    let dir = TempDir::new().unwrap();
    let original = json!({
        "targets": [stage("Stage"), sprite("Cat", "cat.svg")],
        "variables": {"v": ["score", 0]},
        "lists": {"l": ["items", []]},
        "broadcasts": {},
        "extensions": ["pen"],
        "meta": {"semver": "3.0.0", "agent": "Mozilla/5.0 ü"}
    });
    write_sb3(&dir.path().join("only.sb3"), &original, &[("cat.svg", b"cat")]);

    run_merge(&config_for(dir.path())).unwrap();

    let (manifest, assets) = read_merged(dir.path());
    assert_eq!(manifest.to_value().unwrap(), original);
    assert_eq!(assets, ["cat.svg"]);

    let text = fs::read_to_string(dir.path().join("project.json")).unwrap();
    assert!(text.contains("Mozilla/5.0 ü"));
    assert!(text.contains("\n    \"targets\""));
}

#[test]
fn test_listing_order_is_honored_when_requested() {
    let dir = TempDir::new().unwrap();
    write_sb3(
        &dir.path().join("only.sb3"),
        &json!({"targets": [stage("Stage")]}),
        &[],
    );

    let config = MergeConfig {
        order: SourceOrder::Listing,
        ..config_for(dir.path())
    };
    let outcome = run_merge(&config).unwrap();
    assert_eq!(outcome.order, SourceOrder::Listing);
    assert_eq!(outcome.merged_count(), 1);
}

// ============================================================================
// Failure isolation
// ============================================================================

#[test]
fn test_corrupt_middle_source_is_skipped() {
    let dir = TempDir::new().unwrap();
    write_sb3(
        &dir.path().join("a.sb3"),
        &json!({"targets": [stage("Stage"), sprite("Cat", "cat.svg")]}),
        &[("cat.svg", b"cat")],
    );
    fs::write(dir.path().join("b.sb3"), b"definitely not a zip").unwrap();
    write_sb3(
        &dir.path().join("c.sb3"),
        &json!({"targets": [stage("Stage"), sprite("Dog", "dog.svg")]}),
        &[("dog.svg", b"dog")],
    );

    let outcome = run_merge(&config_for(dir.path())).unwrap();
    assert_eq!(outcome.merged_count(), 2);
    assert_eq!(outcome.skipped_count(), 1);
    match &outcome.sources[1].status {
        SourceStatus::Skipped { error_kind, .. } => assert_eq!(error_kind, "invalid_container"),
        other => panic!("expected skip, got {other:?}"),
    }

    let (manifest, assets) = read_merged(dir.path());
    assert_eq!(target_names(&manifest), ["Stage", "Cat", "Dog"]);
    assert_eq!(assets, ["cat.svg", "dog.svg"]);
}

#[test]
fn test_skipped_source_contributes_no_assets() {
    let dir = TempDir::new().unwrap();
    write_sb3(
        &dir.path().join("a.sb3"),
        &json!({"targets": [stage("Stage")]}),
        &[],
    );
    write_sb3(
        &dir.path().join("b.sb3"),
        &json!({"targets": [{"name": "Nameless stage flag"}]}),
        &[("orphan.png", b"png")],
    );

    let outcome = run_merge(&config_for(dir.path())).unwrap();
    assert_eq!(outcome.skipped_count(), 1);

    let (_, assets) = read_merged(dir.path());
    assert!(assets.is_empty());
}

#[test]
fn test_empty_dir_skip_policy_writes_nothing() {
    let dir = TempDir::new().unwrap();

    let outcome = run_merge(&config_for(dir.path())).unwrap();
    assert!(outcome.output.is_none());
    assert!(!dir.path().join("all_merged.sb3").exists());
    assert!(!dir.path().join("project.json").exists());
}

#[test]
fn test_all_invalid_error_policy() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("bad.sb3"), b"nope").unwrap();

    let config = MergeConfig {
        on_empty: EmptyRunPolicy::Error,
        ..config_for(dir.path())
    };
    let result = run_merge(&config);
    assert!(matches!(result, Err(PipelineError::NoValidSources { .. })));
    assert!(!dir.path().join("all_merged.sb3").exists());
}

#[test]
fn test_missing_input_dir() {
    let dir = TempDir::new().unwrap();
    let result = run_merge(&config_for(&dir.path().join("absent")));
    assert!(matches!(result, Err(PipelineError::InputDir { .. })));
}

// ============================================================================
// Reruns and staging
// ============================================================================

#[test]
fn test_rerun_ignores_previous_output() {
    let dir = TempDir::new().unwrap();
    write_sb3(
        &dir.path().join("a.sb3"),
        &json!({"targets": [stage("Stage"), sprite("Cat", "cat.svg")]}),
        &[("cat.svg", b"cat")],
    );

    let first = run_merge(&config_for(dir.path())).unwrap();
    let second = run_merge(&config_for(dir.path())).unwrap();
    assert_eq!(first.sources.len(), 1);
    assert_eq!(second.sources.len(), 1);
    assert_eq!(
        first.output.unwrap().archive.sha256,
        second.output.unwrap().archive.sha256
    );
}

#[test]
fn test_separate_output_dir_is_created() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in");
    fs::create_dir(&input).unwrap();
    write_sb3(
        &input.join("a.sb3"),
        &json!({"targets": [stage("Stage")]}),
        &[],
    );

    let out: PathBuf = dir.path().join("out/nested");
    let config = MergeConfig {
        output_dir: Some(out.clone()),
        archive_name: "combined.sb3".to_string(),
        ..config_for(&input)
    };
    let outcome = run_merge(&config).unwrap();

    let output = outcome.output.unwrap();
    assert_eq!(output.archive.path, out.join("combined.sb3"));
    assert!(out.join("project.json").exists());
    assert!(!input.join("project.json").exists());
}

#[test]
fn test_explicit_staging_dir_is_removed() {
    let dir = TempDir::new().unwrap();
    write_sb3(
        &dir.path().join("a.sb3"),
        &json!({"targets": [stage("Stage")]}),
        &[("sounds/pop.wav", b"pop")],
    );

    let staging = dir.path().join("temp_json");
    let config = MergeConfig {
        staging_dir: Some(staging.clone()),
        ..config_for(dir.path())
    };
    run_merge(&config).unwrap();

    assert!(!staging.exists());
    let (_, assets) = read_merged(dir.path());
    assert_eq!(assets, ["sounds/pop.wav"]);
}
