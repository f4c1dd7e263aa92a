//! Merge run pipeline: discover → read → fold → write.
//!
//! Sources are processed one at a time. A source whose container or manifest
//! is rejected is logged and skipped; filesystem failures while staging or
//! writing abort the run.

use crate::config::{EmptyRunPolicy, MergeConfig, SourceOrder};
use crate::logging::generate_run_id;
use crate::merge::{fold, MergeStats};
use chrono::{DateTime, Utc};
use sb3_bundle::{
    write_manifest, ArchiveReader, ArchiveWriter, BundleError, PackSummary, ProjectManifest,
    SourceArchive, StagingArea,
};
use serde::Serialize;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

/// Errors that abort a merge run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot read input directory {}: {source}", path.display())]
    InputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no valid source archives in {}", input_dir.display())]
    NoValidSources { input_dir: PathBuf },

    #[error(transparent)]
    Bundle(#[from] BundleError),
}

/// What happened to one source archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    Merged {
        sprites: usize,
        assets: usize,
        assets_overwritten: usize,
    },
    Skipped {
        error_kind: String,
        error: String,
    },
}

/// Per-source entry of the run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: SourceStatus,
}

impl SourceReport {
    pub fn is_merged(&self) -> bool {
        matches!(self.status, SourceStatus::Merged { .. })
    }
}

/// Files produced by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputReport {
    pub manifest_path: PathBuf,
    pub manifest_bytes: u64,
    pub archive: PackSummary,
    /// Target names of the combined manifest, in order.
    pub targets: Vec<String>,
}

/// Serializable summary of a merge run.
#[derive(Debug, Clone, Serialize)]
pub struct MergeOutcome {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub input_dir: PathBuf,
    pub order: SourceOrder,
    pub sources: Vec<SourceReport>,
    pub stats: MergeStats,
    pub output: Option<OutputReport>,
}

impl MergeOutcome {
    pub fn merged_count(&self) -> usize {
        self.sources.iter().filter(|s| s.is_merged()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.sources.len() - self.merged_count()
    }
}

/// List source archives directly inside `dir`.
///
/// Only regular files with a matching extension (case-insensitive) are
/// returned. Subdirectories are not descended into.
pub fn discover_sources(
    dir: &Path,
    extension: &str,
    order: SourceOrder,
) -> Result<Vec<PathBuf>, PipelineError> {
    let input_err = |source| PipelineError::InputDir {
        path: dir.to_path_buf(),
        source,
    };
    let extension = extension.trim_start_matches('.');

    let mut sources = Vec::new();
    for entry in fs::read_dir(dir).map_err(input_err)? {
        let path = entry.map_err(input_err)?.path();
        let matches = path
            .extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if matches && path.is_file() {
            sources.push(path);
        }
    }

    if order == SourceOrder::Lexicographic {
        sources.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    }

    Ok(sources)
}

/// Read one source completely and validate its manifest.
pub fn load_source(path: &Path) -> Result<(SourceArchive, ProjectManifest), BundleError> {
    let source = ArchiveReader::open(path)?.extract()?;
    let manifest = source.parse_manifest()?;
    Ok((source, manifest))
}

/// Execute one merge run.
pub fn run_merge(config: &MergeConfig) -> Result<MergeOutcome, PipelineError> {
    let run_id = generate_run_id();
    let span = info_span!("merge_run", run_id = %run_id);
    let _guard = span.enter();

    let started_at = Utc::now();
    let manifest_path = config.manifest_path();
    let archive_path = config.archive_path();

    let sources: Vec<PathBuf> = discover_sources(&config.input_dir, &config.extension, config.order)?
        .into_iter()
        .filter(|path| !same_file(path, &archive_path))
        .collect();

    info!(
        input_dir = %config.input_dir.display(),
        sources = sources.len(),
        order = ?config.order,
        "Discovered source archives"
    );

    let mut staging = match &config.staging_dir {
        Some(dir) => StagingArea::at(dir)?,
        None => StagingArea::temporary()?,
    };

    let mut accumulator: Option<ProjectManifest> = None;
    let mut stats = MergeStats::default();
    let mut reports = Vec::with_capacity(sources.len());

    for path in sources {
        match load_source(&path) {
            Ok((source, manifest)) => {
                let sprites = manifest.sprites().count();
                let assets = source.asset_count();
                let assets_overwritten = source.stage_into(&mut staging)?;

                let (next, step) = fold(accumulator.take(), manifest);
                accumulator = Some(next);
                stats += step;

                debug!(path = %path.display(), ?step, "Source merged");
                reports.push(SourceReport {
                    path,
                    status: SourceStatus::Merged {
                        sprites,
                        assets,
                        assets_overwritten,
                    },
                });
            }
            Err(e) if e.is_recoverable() => {
                warn!(path = %path.display(), error = %e, "Skipping source archive");
                reports.push(SourceReport {
                    path,
                    status: SourceStatus::Skipped {
                        error_kind: e.kind().to_string(),
                        error: e.to_string(),
                    },
                });
            }
            Err(e) => return Err(e.into()),
        }
    }

    let output = match accumulator {
        Some(manifest) => Some(write_outputs(
            &manifest,
            &staging,
            config.output_dir(),
            &manifest_path,
            &archive_path,
        )?),
        None => match config.on_empty {
            EmptyRunPolicy::Skip => {
                warn!("No valid source archives; nothing written");
                None
            }
            EmptyRunPolicy::Error => {
                return Err(PipelineError::NoValidSources {
                    input_dir: config.input_dir.clone(),
                })
            }
        },
    };

    staging.purge();

    let outcome = MergeOutcome {
        run_id,
        started_at,
        finished_at: Utc::now(),
        input_dir: config.input_dir.clone(),
        order: config.order,
        sources: reports,
        stats,
        output,
    };

    info!(
        merged = outcome.merged_count(),
        skipped = outcome.skipped_count(),
        wrote_output = outcome.output.is_some(),
        "Merge run finished"
    );

    Ok(outcome)
}

fn write_outputs(
    manifest: &ProjectManifest,
    staging: &StagingArea,
    output_dir: &Path,
    manifest_path: &Path,
    archive_path: &Path,
) -> Result<OutputReport, BundleError> {
    fs::create_dir_all(output_dir)?;

    let manifest_bytes = write_manifest(manifest, manifest_path)?;
    let archive = ArchiveWriter::new(manifest)?.pack(staging, archive_path)?;

    Ok(OutputReport {
        manifest_path: manifest_path.to_path_buf(),
        manifest_bytes,
        archive,
        targets: manifest.targets.iter().map(|t| t.name.clone()).collect(),
    })
}

/// Compare paths, resolving symlinks and relative segments when possible.
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
