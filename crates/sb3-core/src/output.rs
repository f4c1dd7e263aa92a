//! Command payload formatting for stdout.

use crate::inspect::InspectReport;
use crate::pipeline::{MergeOutcome, SourceStatus};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Supported output formats for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed JSON (default for machine consumption)
    #[default]
    Json,

    /// Plain text summary
    Human,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Human => write!(f, "human"),
        }
    }
}

/// Render a merge run as plain text.
pub fn render_merge(outcome: &MergeOutcome) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Merged {} of {} source archive(s) from {}",
        outcome.merged_count(),
        outcome.sources.len(),
        outcome.input_dir.display()
    );

    for source in &outcome.sources {
        match &source.status {
            SourceStatus::Merged {
                sprites,
                assets,
                assets_overwritten,
            } => {
                let _ = writeln!(
                    out,
                    "  ok    {} ({sprites} sprite(s), {assets} asset(s), {assets_overwritten} overwritten)",
                    source.path.display()
                );
            }
            SourceStatus::Skipped { error, .. } => {
                let _ = writeln!(out, "  skip  {}: {error}", source.path.display());
            }
        }
    }

    let stats = &outcome.stats;
    let _ = writeln!(
        out,
        "Targets: {} appended, {} replaced, {} stage(s) ignored",
        stats.targets_appended, stats.targets_replaced, stats.stages_ignored
    );
    let _ = writeln!(
        out,
        "Namespace keys: {} added, {} kept",
        stats.keys_added, stats.keys_kept
    );

    match &outcome.output {
        Some(output) => {
            let _ = writeln!(out, "Manifest: {}", output.manifest_path.display());
            let _ = writeln!(
                out,
                "Archive:  {} ({} entries, sha256 {})",
                output.archive.path.display(),
                output.archive.entries,
                output.archive.sha256
            );
        }
        None => {
            let _ = writeln!(out, "No output written");
        }
    }

    out
}

/// Render an archive inspection as plain text.
pub fn render_inspect(report: &InspectReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", report.path.display());

    let _ = writeln!(out, "Targets ({}):", report.targets.len());
    for target in &report.targets {
        let marker = if target.is_stage { " [stage]" } else { "" };
        let _ = writeln!(out, "  {}{marker}", target.name);
    }

    for ns in &report.namespaces {
        let _ = writeln!(out, "{}: {}", ns.namespace, ns.entries);
    }

    let _ = writeln!(
        out,
        "Assets ({}, {} bytes):",
        report.assets.len(),
        report.asset_bytes
    );
    for asset in &report.assets {
        let _ = writeln!(out, "  {} ({} bytes)", asset.path, asset.bytes);
    }

    out
}
