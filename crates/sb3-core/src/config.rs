//! Merge run configuration.
//!
//! Resolution order (highest to lowest priority):
//! 1. CLI flags (applied via [`ConfigOverrides`])
//! 2. Explicit `--config <FILE>`
//! 3. `SB3_MERGE_CONFIG` environment variable
//! 4. XDG config home (`~/.config/sb3_merge/config.toml`)
//! 5. Built-in defaults

use clap::ValueEnum;
use sb3_bundle::MANIFEST_FILE_NAME;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "SB3_MERGE_CONFIG";

/// Default XDG config directory name.
const CONFIG_DIR_NAME: &str = "sb3_merge";

/// Config file name inside the config directory.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default file name of the combined archive.
pub const DEFAULT_ARCHIVE_NAME: &str = "all_merged.sb3";

/// Default source archive extension.
pub const DEFAULT_EXTENSION: &str = "sb3";

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("I/O error reading {}: {source}", path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML in config file {}: {source}", path.display())]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Order in which discovered source archives are folded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceOrder {
    /// Sort by file name; reproducible across platforms.
    #[default]
    Lexicographic,
    /// Raw directory listing order; platform dependent.
    Listing,
}

/// What to do when no source archive could be merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyRunPolicy {
    /// Write nothing and report success.
    #[default]
    Skip,
    /// Fail the run.
    Error,
}

/// Settings for one merge run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeConfig {
    /// Directory scanned for source archives.
    pub input_dir: PathBuf,
    /// Where outputs go; defaults to `input_dir`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    /// Source archive extension, without the dot.
    pub extension: String,
    /// File name of the standalone combined manifest.
    pub manifest_name: String,
    /// File name of the combined archive.
    pub archive_name: String,
    /// Explicit staging directory; a fresh temp dir when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging_dir: Option<PathBuf>,
    pub order: SourceOrder,
    pub on_empty: EmptyRunPolicy,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_dir: None,
            extension: DEFAULT_EXTENSION.to_string(),
            manifest_name: MANIFEST_FILE_NAME.to_string(),
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
            staging_dir: None,
            order: SourceOrder::default(),
            on_empty: EmptyRunPolicy::default(),
        }
    }
}

impl MergeConfig {
    /// Directory outputs are written to.
    pub fn output_dir(&self) -> &Path {
        self.output_dir.as_deref().unwrap_or(&self.input_dir)
    }

    /// Full path of the standalone manifest output.
    pub fn manifest_path(&self) -> PathBuf {
        self.output_dir().join(&self.manifest_name)
    }

    /// Full path of the combined archive output.
    pub fn archive_path(&self) -> PathBuf {
        self.output_dir().join(&self.archive_name)
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let extension = self.extension.trim_start_matches('.');
        if extension.is_empty() {
            return Err(ConfigError::Invalid("extension is empty".to_string()));
        }
        check_file_name("manifest_name", &self.manifest_name)?;
        check_file_name("archive_name", &self.archive_name)?;
        if self.manifest_name == self.archive_name {
            return Err(ConfigError::Invalid(
                "manifest_name and archive_name must differ".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply CLI overrides on top of the loaded values.
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(dir) = overrides.input_dir {
            self.input_dir = dir;
        }
        if let Some(dir) = overrides.output_dir {
            self.output_dir = Some(dir);
        }
        if let Some(extension) = overrides.extension {
            self.extension = extension;
        }
        if let Some(name) = overrides.manifest_name {
            self.manifest_name = name;
        }
        if let Some(name) = overrides.archive_name {
            self.archive_name = name;
        }
        if let Some(dir) = overrides.staging_dir {
            self.staging_dir = Some(dir);
        }
        if let Some(order) = overrides.order {
            self.order = order;
        }
        if let Some(policy) = overrides.on_empty {
            self.on_empty = policy;
        }
        self.extension = self.extension.trim_start_matches('.').to_string();
    }
}

fn check_file_name(field: &str, name: &str) -> Result<(), ConfigError> {
    let plain = !name.is_empty()
        && !name.contains(['/', '\\'])
        && name != "."
        && name != "..";
    if plain {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{field} must be a plain file name, got '{name}'"
        )))
    }
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub extension: Option<String>,
    pub manifest_name: Option<String>,
    pub archive_name: Option<String>,
    pub staging_dir: Option<PathBuf>,
    pub order: Option<SourceOrder>,
    pub on_empty: Option<EmptyRunPolicy>,
}

/// Configuration resolution options.
#[derive(Debug, Default)]
pub struct ConfigOptions {
    /// Explicit config file (highest priority).
    pub config_path: Option<PathBuf>,
}

/// Loaded configuration with provenance.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: MergeConfig,
    /// File the values came from (None if using defaults).
    pub source: Option<PathBuf>,
}

/// Load configuration with the standard resolution order.
pub fn load_config(options: &ConfigOptions) -> Result<ResolvedConfig, ConfigError> {
    let env_path = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
    let xdg_path = dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));

    match resolve_config_path(options.config_path.clone(), env_path, xdg_path)? {
        Some(path) => Ok(ResolvedConfig {
            config: load_config_file(&path)?,
            source: Some(path),
        }),
        None => Ok(ResolvedConfig {
            config: MergeConfig::default(),
            source: None,
        }),
    }
}

/// Pick the config file to read, if any.
///
/// Explicit and env paths must exist; the XDG path is optional.
pub fn resolve_config_path(
    explicit: Option<PathBuf>,
    env: Option<PathBuf>,
    xdg: Option<PathBuf>,
) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = explicit.or(env) {
        if !path.exists() {
            return Err(ConfigError::NotFound { path });
        }
        return Ok(Some(path));
    }
    Ok(xdg.filter(|path| path.exists()))
}

/// Read and validate one TOML config file.
pub fn load_config_file(path: &Path) -> Result<MergeConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config: MergeConfig = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    config.validate()?;
    Ok(config)
}
