//! sb3-merge - combine project archives
//!
//! Entry point handling:
//! - Merging every `.sb3` archive of a directory into one
//! - Inspecting a single archive
//! - Printing the effective configuration

use clap::{Args, Parser, Subcommand};
use sb3_core::config::{
    load_config, ConfigOptions, ConfigOverrides, EmptyRunPolicy, MergeConfig, ResolvedConfig,
    SourceOrder,
};
use sb3_core::exit_codes::ExitCode;
use sb3_core::inspect::inspect_archive;
use sb3_core::logging::{init_logging, LogConfig, LogFormat, LogLevel};
use sb3_core::output::{render_inspect, render_merge, OutputFormat};
use sb3_core::pipeline::run_merge;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, error};

/// Merge Scratch 3 project archives into a single archive
#[derive(Parser)]
#[command(name = "sb3-merge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Config file (TOML)
    #[arg(long, global = true, env = "SB3_MERGE_CONFIG")]
    config: Option<PathBuf>,

    /// Output format for the command payload on stdout
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Log format on stderr
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Omit timestamps from human log lines
    #[arg(long, global = true)]
    no_log_timestamps: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge every archive in a directory into one
    Merge(MergeArgs),

    /// Validate one archive and list its contents
    Inspect(InspectArgs),

    /// Print the effective configuration
    Config(MergeArgs),
}

#[derive(Args, Debug)]
struct MergeArgs {
    /// Directory containing the source archives
    input_dir: Option<PathBuf>,

    /// Directory for the combined manifest and archive (defaults to input dir)
    #[arg(long, short = 'o')]
    output_dir: Option<PathBuf>,

    /// Source archive extension
    #[arg(long)]
    extension: Option<String>,

    /// File name of the combined manifest
    #[arg(long)]
    manifest_name: Option<String>,

    /// File name of the combined archive
    #[arg(long)]
    archive_name: Option<String>,

    /// Staging directory (a fresh temporary directory when unset)
    #[arg(long)]
    staging_dir: Option<PathBuf>,

    /// Order in which sources are folded
    #[arg(long)]
    order: Option<SourceOrder>,

    /// What to do when no source can be merged
    #[arg(long)]
    on_empty: Option<EmptyRunPolicy>,
}

impl From<&MergeArgs> for ConfigOverrides {
    fn from(args: &MergeArgs) -> Self {
        ConfigOverrides {
            input_dir: args.input_dir.clone(),
            output_dir: args.output_dir.clone(),
            extension: args.extension.clone(),
            manifest_name: args.manifest_name.clone(),
            archive_name: args.archive_name.clone(),
            staging_dir: args.staging_dir.clone(),
            order: args.order,
            on_empty: args.on_empty,
        }
    }
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Archive to inspect
    archive: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.global.quiet {
        LogLevel::Error
    } else {
        match cli.global.verbose {
            0 => LogLevel::Info,
            1 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    };
    let cli_level = (cli.global.quiet || cli.global.verbose > 0).then_some(log_level);
    let mut log_config = LogConfig::from_env(cli_level, cli.global.log_format);
    log_config.timestamps = !cli.global.no_log_timestamps;
    init_logging(&log_config);

    let exit_code = match &cli.command {
        Commands::Merge(args) => run_merge_command(&cli.global, args),
        Commands::Inspect(args) => run_inspect(&cli.global, args),
        Commands::Config(args) => run_config(&cli.global, args),
    };

    debug!(exit_code = %exit_code, "Exiting");
    std::process::exit(exit_code.as_i32());
}

/// Load config and apply CLI overrides.
fn resolve_config(global: &GlobalOpts, args: &MergeArgs) -> Result<ResolvedConfig, ExitCode> {
    let options = ConfigOptions {
        config_path: global.config.clone(),
    };

    let mut resolved = load_config(&options).map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        ExitCode::ConfigError
    })?;

    resolved.config.apply(ConfigOverrides::from(args));
    resolved.config.validate().map_err(|e| {
        error!(error = %e, "Invalid configuration");
        ExitCode::ArgsError
    })?;

    Ok(resolved)
}

fn run_merge_command(global: &GlobalOpts, args: &MergeArgs) -> ExitCode {
    let resolved = match resolve_config(global, args) {
        Ok(resolved) => resolved,
        Err(code) => return code,
    };

    match run_merge(&resolved.config) {
        Ok(outcome) => {
            emit(global.format, &outcome, || render_merge(&outcome));
            if outcome.output.is_none() {
                ExitCode::NothingMerged
            } else if outcome.skipped_count() > 0 {
                ExitCode::PartialSkip
            } else {
                ExitCode::Clean
            }
        }
        Err(e) => {
            error!(error = %e, "Merge run failed");
            ExitCode::from(&e)
        }
    }
}

fn run_inspect(global: &GlobalOpts, args: &InspectArgs) -> ExitCode {
    match inspect_archive(&args.archive) {
        Ok(report) => {
            emit(global.format, &report, || render_inspect(&report));
            ExitCode::Clean
        }
        Err(e) => {
            error!(path = %args.archive.display(), error = %e, "Inspection failed");
            ExitCode::from(&e)
        }
    }
}

#[derive(Serialize)]
struct ConfigReport<'a> {
    source: Option<&'a PathBuf>,
    config: &'a MergeConfig,
}

fn run_config(global: &GlobalOpts, args: &MergeArgs) -> ExitCode {
    let resolved = match resolve_config(global, args) {
        Ok(resolved) => resolved,
        Err(code) => return code,
    };

    let report = ConfigReport {
        source: resolved.source.as_ref(),
        config: &resolved.config,
    };
    emit(global.format, &report, || {
        let source = match &resolved.source {
            Some(path) => format!("# loaded from {}\n", path.display()),
            None => "# built-in defaults\n".to_string(),
        };
        let body = toml::to_string_pretty(&resolved.config).unwrap_or_default();
        format!("{source}{body}")
    });
    ExitCode::Clean
}

/// Print a command payload on stdout.
fn emit<T: Serialize>(format: OutputFormat, value: &T, human: impl FnOnce() -> String) {
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{json}"),
            Err(e) => error!(error = %e, "Failed to serialize output"),
        },
        OutputFormat::Human => print!("{}", human()),
    }
}
