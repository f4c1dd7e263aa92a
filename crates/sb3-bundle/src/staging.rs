//! Run-scoped staging directory for extracted assets.
//!
//! The staging area holds the union of asset files from every archive that
//! has been accepted so far. It keeps an index of what it staged itself, so
//! packing and purging never touch files it did not write.

use crate::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Prefix for automatically created staging directories.
const STAGING_PREFIX: &str = "sb3-merge-";

/// Directory holding staged asset files for one merge run.
#[derive(Debug)]
pub struct StagingArea {
    root: PathBuf,
    /// Relative archive path → file on disk.
    staged: BTreeMap<String, PathBuf>,
    temp: Option<TempDir>,
    purged: bool,
}

impl StagingArea {
    /// Create a fresh, uniquely named staging directory under the system temp dir.
    pub fn temporary() -> Result<Self> {
        let temp = tempfile::Builder::new().prefix(STAGING_PREFIX).tempdir()?;
        let root = temp.path().to_path_buf();
        debug!(root = %root.display(), "Created temporary staging area");
        Ok(Self {
            root,
            staged: BTreeMap::new(),
            temp: Some(temp),
            purged: false,
        })
    }

    /// Use an explicit directory, creating it if needed.
    ///
    /// Two runs must not share the same path concurrently.
    pub fn at(path: impl Into<PathBuf>) -> Result<Self> {
        let root = path.into();
        fs::create_dir_all(&root)?;
        debug!(root = %root.display(), "Using staging area");
        Ok(Self {
            root,
            staged: BTreeMap::new(),
            temp: None,
            purged: false,
        })
    }

    /// Staging directory on disk.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write one asset, replacing an earlier file with the same relative path.
    ///
    /// Returns `true` when an existing staged file was overwritten.
    pub fn stage_file(&mut self, relative: &str, data: &[u8]) -> Result<bool> {
        let target = self.resolve(relative)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, data)?;

        let replaced = self.staged.insert(relative.to_string(), target).is_some();
        if replaced {
            debug!(path = relative, "Staged asset overwritten");
        }
        Ok(replaced)
    }

    /// Whether an asset with this relative path is staged.
    pub fn contains(&self, relative: &str) -> bool {
        self.staged.contains_key(relative)
    }

    /// Staged relative paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.staged.keys().map(String::as_str)
    }

    /// Staged entries (relative path, file on disk) in sorted order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.staged
            .iter()
            .map(|(rel, path)| (rel.as_str(), path.as_path()))
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Remove every staged file and the staging directory.
    ///
    /// Best-effort: files that are already gone are ignored and other
    /// failures are logged. Returns the number of files removed.
    pub fn purge(&mut self) -> usize {
        if self.purged {
            return 0;
        }
        self.purged = true;

        let mut removed = 0;
        let mut dirs = BTreeSet::new();
        for (relative, path) in std::mem::take(&mut self.staged) {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %relative, error = %e, "Failed to remove staged file"),
            }
            let mut parent = path.parent();
            while let Some(dir) = parent {
                if dir == self.root {
                    break;
                }
                dirs.insert(dir.to_path_buf());
                parent = dir.parent();
            }
        }

        // Deepest directories first so parents are empty when reached.
        let mut dirs: Vec<_> = dirs.into_iter().collect();
        dirs.sort_by_key(|d| std::cmp::Reverse(d.components().count()));
        for dir in dirs {
            match fs::remove_dir(&dir) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(dir = %dir.display(), error = %e, "Failed to remove staging subdirectory"),
            }
        }

        let root_result = match self.temp.take() {
            Some(temp) => temp.close(),
            None => fs::remove_dir(&self.root),
        };
        match root_result {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(root = %self.root.display(), error = %e, "Failed to remove staging directory"),
        }

        debug!(root = %self.root.display(), removed, "Staging area purged");
        removed
    }

    /// Map an archive-relative path into the staging directory.
    fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let path = Path::new(relative);
        let safe = !relative.is_empty()
            && path.components().all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("refusing to stage path outside staging area: {relative}"),
            )
            .into());
        }
        Ok(self.root.join(path))
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        self.purge();
    }
}
