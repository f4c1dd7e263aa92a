//! sb3-merge core library
//!
//! Merges a directory of project archives into one combined archive:
//! - configuration loading and CLI overrides
//! - the pure manifest merge reducer
//! - the sequential discover → read → fold → write pipeline
//! - exit codes and output formatting for the CLI
//!
//! The binary entry point is in `main.rs`.

pub mod config;
pub mod exit_codes;
pub mod inspect;
pub mod logging;
pub mod merge;
pub mod output;
pub mod pipeline;

pub use config::{EmptyRunPolicy, MergeConfig, SourceOrder};
pub use merge::{fold, merge, merge_all, merge_with_stats, MergeStats};
pub use pipeline::{run_merge, MergeOutcome, PipelineError};
