//! Archive reader for opening source `.sb3` containers.
//!
//! A source is read completely before anything is staged, so a container
//! that turns out to be corrupt halfway through contributes nothing.

use crate::staging::StagingArea;
use crate::{BundleError, ProjectManifest, Result, MANIFEST_FILE_NAME};
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::ZipArchive;

/// Label used for in-memory archives in error messages.
const MEMORY_LABEL: &str = "<memory>";

/// Largest uncompressed entry accepted from a source archive.
pub const MAX_ENTRY_BYTES: u64 = 256 * 1024 * 1024;

/// Reader for a single zip-compressed project archive.
pub struct ArchiveReader<R: Read + Seek> {
    path: PathBuf,
    archive: ZipArchive<R>,
}

impl ArchiveReader<File> {
    /// Open an archive from a file path.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| BundleError::invalid_container(path, e))?;
        Self::from_reader(file, path)
    }
}

impl ArchiveReader<Cursor<Vec<u8>>> {
    /// Open an archive from bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes), Path::new(MEMORY_LABEL))
    }
}

impl<R: Read + Seek> ArchiveReader<R> {
    /// Create a reader from any Read + Seek source.
    ///
    /// `path` is only used to label errors and log events.
    pub fn from_reader(reader: R, path: &Path) -> Result<Self> {
        let archive =
            ZipArchive::new(reader).map_err(|e| BundleError::invalid_container(path, e))?;

        debug!(path = %path.display(), entries = archive.len(), "Archive opened");

        Ok(Self {
            path: path.to_path_buf(),
            archive,
        })
    }

    /// Path (or label) of the archive.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored entry names, including directories, in archive order.
    pub fn entry_names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }

    /// Read the raw manifest bytes without validating them.
    pub fn read_manifest_bytes(&mut self) -> Result<Vec<u8>> {
        let path = self.path.clone();
        let entry = self.archive.by_name(MANIFEST_FILE_NAME).map_err(|_| {
            BundleError::invalid_container(&path, format!("missing {MANIFEST_FILE_NAME}"))
        })?;

        let declared = entry.size();
        read_entry(entry, declared, &path, MANIFEST_FILE_NAME)
    }

    /// Read every entry: the manifest plus all asset files.
    pub fn extract(mut self) -> Result<SourceArchive> {
        let manifest = self.read_manifest_bytes()?;
        let mut assets = Vec::new();

        for index in 0..self.archive.len() {
            let entry = self
                .archive
                .by_index(index)
                .map_err(|e| BundleError::invalid_container(&self.path, e))?;

            if entry.is_dir() {
                continue;
            }

            let relative = entry
                .enclosed_name()
                .and_then(|_| normalize_entry_name(entry.name()))
                .ok_or_else(|| {
                    BundleError::invalid_container(
                        &self.path,
                        format!("unsafe entry path '{}'", entry.name()),
                    )
                })?;

            if relative == MANIFEST_FILE_NAME {
                continue;
            }

            let declared = entry.size();
            let data = read_entry(entry, declared, &self.path, &relative)?;
            assets.push((relative, data));
        }

        let source = SourceArchive {
            path: self.path,
            manifest,
            assets,
        };

        info!(
            path = %source.path.display(),
            assets = source.asset_count(),
            bytes = source.asset_bytes(),
            "Archive extracted"
        );

        Ok(source)
    }
}

/// Fully read contents of one source archive.
#[derive(Debug, Clone)]
pub struct SourceArchive {
    path: PathBuf,
    manifest: Vec<u8>,
    assets: Vec<(String, Vec<u8>)>,
}

impl SourceArchive {
    /// Path of the archive this was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse and validate the manifest.
    pub fn parse_manifest(&self) -> Result<ProjectManifest> {
        ProjectManifest::parse(&self.manifest)
    }

    /// Assets as (relative path, contents) in archive order.
    pub fn assets(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.assets
            .iter()
            .map(|(path, data)| (path.as_str(), data.as_slice()))
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    /// Total uncompressed asset size in bytes.
    pub fn asset_bytes(&self) -> u64 {
        self.assets.iter().map(|(_, data)| data.len() as u64).sum()
    }

    /// Write every asset into the staging area.
    ///
    /// Returns how many previously staged files were overwritten.
    pub fn stage_into(self, staging: &mut StagingArea) -> Result<usize> {
        let mut overwritten = 0;
        for (relative, data) in &self.assets {
            if staging.stage_file(relative, data)? {
                overwritten += 1;
            }
        }

        debug!(
            path = %self.path.display(),
            staged = self.assets.len(),
            overwritten,
            "Assets staged"
        );

        Ok(overwritten)
    }
}

/// Read one entry fully, refusing anything above [`MAX_ENTRY_BYTES`].
///
/// The declared size is checked first and the read is bounded as well.
fn read_entry(entry: impl Read, declared: u64, archive: &Path, name: &str) -> Result<Vec<u8>> {
    if declared > MAX_ENTRY_BYTES {
        return Err(BundleError::invalid_container(
            archive,
            format!("{name}: declared size {declared} exceeds {MAX_ENTRY_BYTES} bytes"),
        ));
    }

    let mut data = Vec::new();
    entry
        .take(MAX_ENTRY_BYTES + 1)
        .read_to_end(&mut data)
        .map_err(|e| BundleError::invalid_container(archive, format!("{name}: {e}")))?;

    if data.len() as u64 > MAX_ENTRY_BYTES {
        return Err(BundleError::invalid_container(
            archive,
            format!("{name}: exceeds {MAX_ENTRY_BYTES} bytes"),
        ));
    }
    Ok(data)
}

/// Normalize a stored entry name into a `/`-separated relative path.
///
/// Returns `None` for names that would escape the archive root.
fn normalize_entry_name(name: &str) -> Option<String> {
    if name.starts_with('/') || name.starts_with('\\') {
        return None;
    }

    let mut parts = Vec::new();
    for part in name.split(['/', '\\']) {
        match part {
            "" | "." => continue,
            ".." => return None,
            part if part.contains(':') => return None,
            part => parts.push(part),
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
