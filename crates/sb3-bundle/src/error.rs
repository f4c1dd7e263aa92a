//! Error types for archive and manifest operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading, validating or writing project archives.
#[derive(Error, Debug)]
pub enum BundleError {
    /// Source is not a usable zip container (corrupt, not a zip, missing
    /// manifest entry, unreadable or unsafe entry).
    #[error("invalid container {}: {reason}", path.display())]
    InvalidContainer { path: PathBuf, reason: String },

    /// Manifest could not be parsed or lacks a required marker.
    #[error("malformed manifest: {0}")]
    MalformedManifest(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP archive error while writing
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BundleError {
    pub(crate) fn invalid_container(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        BundleError::InvalidContainer {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error only concerns one source and the run may continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BundleError::InvalidContainer { .. } | BundleError::MalformedManifest(_)
        )
    }

    /// Stable short name for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            BundleError::InvalidContainer { .. } => "invalid_container",
            BundleError::MalformedManifest(_) => "malformed_manifest",
            BundleError::Io(_) => "io",
            BundleError::Zip(_) => "zip",
            BundleError::Json(_) => "json",
        }
    }
}

/// Result type alias for bundle operations.
pub type Result<T> = std::result::Result<T, BundleError>;
