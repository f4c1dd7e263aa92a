//! No-mock archive round-trip tests.
//!
//! Exercises real archives on disk:
//! - read → stage → pack preserves every asset exactly once
//! - later sources overwrite staged assets only on exact path collisions
//! - corrupt and truncated containers are rejected as recoverable errors
//! - the staging area is gone after purge

use sb3_bundle::{
    write_manifest, ArchiveReader, ArchiveWriter, BundleError, ProjectManifest, StagingArea,
};
use serde_json::json;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

// ============================================================================
// Helpers
// ============================================================================

/// Write a zip archive with the given entries, using stored compression for
/// odd-numbered entries so both methods are exercised.
fn write_archive(path: &Path, entries: &[(&str, &[u8])]) {
    let file = fs::File::create(path).expect("create archive");
    let mut zip = ZipWriter::new(file);
    for (i, (name, data)) in entries.iter().enumerate() {
        let method = if i % 2 == 0 {
            CompressionMethod::Deflated
        } else {
            CompressionMethod::Stored
        };
        let options: FileOptions<'_, ()> = FileOptions::default().compression_method(method);
        zip.start_file(*name, options).expect("start entry");
        zip.write_all(data).expect("write entry");
    }
    zip.finish().expect("finish archive");
}

fn project(sprite: &str, costume: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "targets": [
            {"isStage": true, "name": "Stage", "costumes": [{"md5ext": "stage.svg"}]},
            {"isStage": false, "name": sprite, "costumes": [{"md5ext": costume}]}
        ],
        "variables": {"v": ["score", 0]},
        "meta": {"semver": "3.0.0", "agent": "test"}
    }))
    .expect("serialize project")
}

// ============================================================================
// Round trip
// ============================================================================

#[test]
fn test_single_source_roundtrip() {
    let dir = TempDir::new().unwrap();
    let source_path = dir.path().join("cat.sb3");
    let manifest_json = project("Cat", "cat.svg");
    write_archive(
        &source_path,
        &[
            ("project.json", &manifest_json),
            ("stage.svg", b"<svg id='stage'/>"),
            ("cat.svg", b"<svg id='cat'/>"),
        ],
    );

    let mut staging = StagingArea::temporary().unwrap();
    let source = ArchiveReader::open(&source_path).unwrap().extract().unwrap();
    let manifest = source.parse_manifest().unwrap();
    source.stage_into(&mut staging).unwrap();

    let out_path = dir.path().join("out.sb3");
    let summary = ArchiveWriter::new(&manifest)
        .unwrap()
        .pack(&staging, &out_path)
        .unwrap();
    assert_eq!(summary.entries, 3);

    let reread = ArchiveReader::open(&out_path).unwrap().extract().unwrap();
    let original: serde_json::Value = serde_json::from_slice(&manifest_json).unwrap();
    assert_eq!(reread.parse_manifest().unwrap().to_value().unwrap(), original);

    let mut assets: Vec<_> = reread.assets().collect();
    assets.sort();
    assert_eq!(
        assets,
        [
            ("cat.svg", &b"<svg id='cat'/>"[..]),
            ("stage.svg", &b"<svg id='stage'/>"[..])
        ]
    );
}

#[test]
fn test_asset_union_with_collision() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("a.sb3");
    let second = dir.path().join("b.sb3");
    write_archive(
        &first,
        &[
            ("project.json", &project("Cat", "cat.svg")),
            ("cat.svg", b"first cat"),
            ("shared.wav", b"first shared"),
        ],
    );
    write_archive(
        &second,
        &[
            ("project.json", &project("Dog", "dog.svg")),
            ("dog.svg", b"dog"),
            ("shared.wav", b"second shared"),
            ("sounds/bark.wav", b"bark"),
        ],
    );

    let mut staging = StagingArea::temporary().unwrap();
    let mut overwritten = 0;
    let mut manifest = None;
    for path in [&first, &second] {
        let source = ArchiveReader::open(path).unwrap().extract().unwrap();
        manifest.get_or_insert(source.parse_manifest().unwrap());
        overwritten += source.stage_into(&mut staging).unwrap();
    }
    assert_eq!(overwritten, 1);

    let bytes = ArchiveWriter::new(manifest.as_ref().unwrap())
        .unwrap()
        .pack_to_vec(&staging)
        .unwrap();
    let reader = ArchiveReader::from_bytes(bytes).unwrap();
    assert_eq!(
        reader.entry_names(),
        [
            "project.json",
            "cat.svg",
            "dog.svg",
            "shared.wav",
            "sounds/bark.wav"
        ]
    );

    let packed = reader.extract().unwrap();
    let shared = packed.assets().find(|(path, _)| *path == "shared.wav");
    assert_eq!(shared, Some(("shared.wav", &b"second shared"[..])));
}

#[test]
fn test_standalone_manifest_matches_packed_manifest() {
    let dir = TempDir::new().unwrap();
    let manifest = ProjectManifest::parse(&project("Cat", "cat.svg")).unwrap();
    let staging = StagingArea::temporary().unwrap();

    let manifest_path = dir.path().join("project.json");
    write_manifest(&manifest, &manifest_path).unwrap();

    let writer = ArchiveWriter::new(&manifest).unwrap();
    assert_eq!(fs::read(&manifest_path).unwrap(), writer.manifest_json());

    let bytes = writer.pack_to_vec(&staging).unwrap();
    let mut reader = ArchiveReader::from_bytes(bytes).unwrap();
    assert_eq!(reader.read_manifest_bytes().unwrap(), writer.manifest_json());
}

// ============================================================================
// Rejected containers
// ============================================================================

#[test]
fn test_non_zip_file_is_invalid_container() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.sb3");
    fs::write(&path, b"this is a text file, not a zip").unwrap();

    let err = ArchiveReader::open(&path).err().expect("should fail");
    assert!(matches!(err, BundleError::InvalidContainer { .. }));
    assert!(err.is_recoverable());
    assert!(err.to_string().contains("broken.sb3"));
}

#[test]
fn test_truncated_zip_is_invalid_container() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("full.sb3");
    write_archive(
        &path,
        &[("project.json", &project("Cat", "cat.svg")), ("cat.svg", b"cat")],
    );
    let bytes = fs::read(&path).unwrap();
    let truncated = dir.path().join("truncated.sb3");
    fs::write(&truncated, &bytes[..bytes.len() / 2]).unwrap();

    let result = ArchiveReader::open(&truncated).and_then(|r| r.extract());
    assert!(matches!(result, Err(BundleError::InvalidContainer { .. })));
}

#[test]
fn test_missing_file_is_invalid_container() {
    let dir = TempDir::new().unwrap();
    let result = ArchiveReader::open(&dir.path().join("absent.sb3"));
    assert!(matches!(result, Err(BundleError::InvalidContainer { .. })));
}

#[test]
fn test_manifest_without_targets_is_malformed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("no-targets.sb3");
    write_archive(&path, &[("project.json", br#"{"meta": {}}"#)]);

    let source = ArchiveReader::open(&path).unwrap().extract().unwrap();
    let err = source.parse_manifest().unwrap_err();
    assert!(matches!(err, BundleError::MalformedManifest(_)));
}

// ============================================================================
// Staging lifecycle
// ============================================================================

#[test]
fn test_explicit_staging_dir_removed_after_purge() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("a.sb3");
    write_archive(
        &archive,
        &[
            ("project.json", &project("Cat", "cat.svg")),
            ("costumes/cat.svg", b"cat"),
        ],
    );

    let staging_root = dir.path().join("temp_json");
    let mut staging = StagingArea::at(&staging_root).unwrap();
    ArchiveReader::open(&archive)
        .unwrap()
        .extract()
        .unwrap()
        .stage_into(&mut staging)
        .unwrap();
    assert!(staging_root.join("costumes/cat.svg").exists());

    assert_eq!(staging.purge(), 1);
    assert!(!staging_root.exists());
}
