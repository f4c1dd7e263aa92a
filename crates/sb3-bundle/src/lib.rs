//! Project archive reader/writer for sb3-merge.
//!
//! A project archive (`.sb3`) is a ZIP container holding:
//! - `project.json`: the manifest (targets, global namespaces, metadata)
//! - any number of binary assets (costumes, sounds) at relative paths
//!
//! This crate owns the archive round-trip: reading a source container,
//! validating its manifest into a [`ProjectManifest`], staging assets in a
//! run-scoped [`StagingArea`], and packing a combined archive.
//!
//! # Example
//!
//! ```no_run
//! use sb3_bundle::{ArchiveReader, ArchiveWriter, StagingArea};
//! use std::path::Path;
//!
//! let mut staging = StagingArea::temporary().unwrap();
//!
//! // Read and validate one source
//! let source = ArchiveReader::open(Path::new("game.sb3")).unwrap().extract().unwrap();
//! let manifest = source.parse_manifest().unwrap();
//! source.stage_into(&mut staging).unwrap();
//!
//! // Repack
//! ArchiveWriter::new(&manifest)
//!     .unwrap()
//!     .pack(&staging, Path::new("out.sb3"))
//!     .unwrap();
//! staging.purge();
//! ```

pub mod error;
pub mod manifest;
pub mod reader;
pub mod staging;
pub mod writer;

pub use error::{BundleError, Result};
pub use manifest::{Namespace, NamespaceKind, ProjectManifest, Target, MANIFEST_FILE_NAME};
pub use reader::{ArchiveReader, SourceArchive};
pub use staging::StagingArea;
pub use writer::{compute_checksum, write_manifest, ArchiveWriter, PackSummary};
