//! Single-archive inspection.

use crate::pipeline::load_source;
use sb3_bundle::{BundleError, NamespaceKind};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One target as listed by `inspect`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetSummary {
    pub name: String,
    pub is_stage: bool,
}

/// Entry count of one global namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceSummary {
    pub namespace: NamespaceKind,
    pub entries: usize,
}

/// One asset entry and its uncompressed size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetSummary {
    pub path: String,
    pub bytes: u64,
}

/// What a validated archive contains.
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub path: PathBuf,
    pub targets: Vec<TargetSummary>,
    pub namespaces: Vec<NamespaceSummary>,
    /// Opaque top-level fields carried through a merge.
    pub other_fields: Vec<String>,
    pub assets: Vec<AssetSummary>,
    pub asset_bytes: u64,
}

/// Open one archive, validate its manifest and summarize it.
pub fn inspect_archive(path: &Path) -> Result<InspectReport, BundleError> {
    let (source, manifest) = load_source(path)?;

    Ok(InspectReport {
        path: path.to_path_buf(),
        targets: manifest
            .targets
            .iter()
            .map(|t| TargetSummary {
                name: t.name.clone(),
                is_stage: t.is_stage,
            })
            .collect(),
        namespaces: NamespaceKind::ALL
            .into_iter()
            .map(|kind| NamespaceSummary {
                namespace: kind,
                entries: manifest.namespace_len(kind),
            })
            .collect(),
        other_fields: manifest.extra.keys().cloned().collect(),
        assets: source
            .assets()
            .map(|(path, data)| AssetSummary {
                path: path.to_string(),
                bytes: data.len() as u64,
            })
            .collect(),
        asset_bytes: source.asset_bytes(),
    })
}
