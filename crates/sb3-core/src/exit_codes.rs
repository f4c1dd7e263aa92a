//! Exit codes for the sb3-merge CLI.
//!
//! Exit code ranges:
//! - 0-3: Operational outcomes (2 is left to clap for usage errors)
//! - 10-19: User/environment errors (recoverable by user action)
//! - 20-29: Internal errors

use crate::pipeline::PipelineError;
use sb3_bundle::BundleError;

/// Exit codes for sb3-merge operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    // ========================================================================
    // Operational Outcomes (0-3)
    // ========================================================================
    /// Every source merged
    Clean = 0,

    /// Output written but some sources were skipped
    PartialSkip = 1,

    /// No source could be merged; nothing written
    NothingMerged = 3,

    // ========================================================================
    // User / Environment Errors (10-19)
    // ========================================================================
    /// Invalid arguments
    ArgsError = 10,

    /// Config file missing, unreadable or invalid
    ConfigError = 11,

    /// No valid sources and the empty-run policy is `error`
    NoValidSources = 12,

    /// Input directory missing or unreadable
    InputError = 13,

    /// Archive or manifest rejected
    InvalidArchive = 14,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error (bug - please report)
    InternalError = 20,

    /// I/O error while staging or writing outputs
    IoError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Stable name of the code, used in log events.
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::PartialSkip => "OK_PARTIAL",
            ExitCode::NothingMerged => "OK_NOTHING_MERGED",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::NoValidSources => "ERR_NO_VALID_SOURCES",
            ExitCode::InputError => "ERR_INPUT",
            ExitCode::InvalidArchive => "ERR_INVALID_ARCHIVE",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<&BundleError> for ExitCode {
    fn from(err: &BundleError) -> Self {
        if err.is_recoverable() {
            ExitCode::InvalidArchive
        } else {
            match err {
                BundleError::Io(_) | BundleError::Zip(_) => ExitCode::IoError,
                _ => ExitCode::InternalError,
            }
        }
    }
}

impl From<&PipelineError> for ExitCode {
    fn from(err: &PipelineError) -> Self {
        match err {
            PipelineError::InputDir { .. } => ExitCode::InputError,
            PipelineError::NoValidSources { .. } => ExitCode::NoValidSources,
            PipelineError::Bundle(inner) => ExitCode::from(inner),
        }
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
