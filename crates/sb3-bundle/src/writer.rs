//! Archive writer for the combined `.sb3` output.
//!
//! Packs the combined manifest under `project.json` plus every staged asset.

use crate::staging::StagingArea;
use crate::{ProjectManifest, Result, MANIFEST_FILE_NAME};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{Cursor, Seek, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::write::{FileOptions, ZipWriter};
use zip::{CompressionMethod, DateTime};

/// Result of packing an output archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackSummary {
    /// Where the archive was written.
    pub path: PathBuf,
    /// Entries written, manifest included.
    pub entries: usize,
    /// Sum of entry sizes before compression.
    pub uncompressed_bytes: u64,
    /// Size of the archive file.
    pub archive_bytes: u64,
    /// SHA-256 of the archive file, hex encoded.
    pub sha256: String,
}

/// Write the manifest as a standalone JSON file.
///
/// Returns the number of bytes written.
pub fn write_manifest(manifest: &ProjectManifest, path: &Path) -> Result<u64> {
    let json = manifest.to_json_pretty()?;
    fs::write(path, &json)?;
    info!(path = %path.display(), bytes = json.len(), "Manifest written");
    Ok(json.len() as u64)
}

/// Compute SHA-256 checksum of data, hex encoded.
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Writer producing one combined archive.
pub struct ArchiveWriter {
    manifest_json: Vec<u8>,
}

impl ArchiveWriter {
    /// Serialize the manifest up front so packing only does I/O.
    pub fn new(manifest: &ProjectManifest) -> Result<Self> {
        Ok(Self {
            manifest_json: manifest.to_json_pretty()?,
        })
    }

    /// Serialized manifest bytes that will be stored as `project.json`.
    pub fn manifest_json(&self) -> &[u8] {
        &self.manifest_json
    }

    /// Write the archive to a file.
    ///
    /// A staged file that disappeared before packing is an I/O error; the
    /// partially written archive is left in place.
    pub fn pack(&self, staging: &StagingArea, path: &Path) -> Result<PackSummary> {
        let file = File::create(path)?;
        let (entries, uncompressed_bytes) = self.write_zip(file, staging)?;

        let written = fs::read(path)?;
        let summary = PackSummary {
            path: path.to_path_buf(),
            entries,
            uncompressed_bytes,
            archive_bytes: written.len() as u64,
            sha256: compute_checksum(&written),
        };

        info!(
            path = %path.display(),
            entries,
            bytes = summary.archive_bytes,
            sha256 = %summary.sha256,
            "Archive written"
        );

        Ok(summary)
    }

    /// Write the archive to a byte vector (for in-memory use).
    pub fn pack_to_vec(&self, staging: &StagingArea) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        let (entries, uncompressed_bytes) = self.write_zip(&mut buffer, staging)?;
        let bytes = buffer.into_inner();

        info!(
            entries,
            compressed_bytes = bytes.len(),
            uncompressed_bytes,
            "Archive written to memory"
        );

        Ok(bytes)
    }

    fn write_zip<W: Write + Seek>(&self, sink: W, staging: &StagingArea) -> Result<(usize, u64)> {
        let mut zip = ZipWriter::new(sink);

        // Entries carry the zip epoch so identical inputs pack to identical bytes
        let options: FileOptions<'_, ()> = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default())
            .unix_permissions(0o644);

        // Write manifest first
        zip.start_file(MANIFEST_FILE_NAME, options)?;
        zip.write_all(&self.manifest_json)?;

        let mut entries = 1;
        let mut total = self.manifest_json.len() as u64;

        // Staged assets, already sorted by relative path
        for (relative, on_disk) in staging.entries() {
            if relative == MANIFEST_FILE_NAME {
                continue;
            }
            let data = fs::read(on_disk)?;
            zip.start_file(relative, options)?;
            zip.write_all(&data)?;

            entries += 1;
            total += data.len() as u64;
            debug!(path = relative, bytes = data.len(), "Packed asset");
        }

        zip.finish()?;
        Ok((entries, total))
    }
}
