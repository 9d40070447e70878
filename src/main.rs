//! Binary entry point for memport.
//!
//! This binary provides the CLI interface for importing, exporting and
//! browsing memory records.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

mod commands;

use clap::{Parser, Subcommand};
use commands::{cmd_config, cmd_export, cmd_import, cmd_list, cmd_search};
use memport::config::MemportConfig;
use memport::io::CancellationFlag;
use memport::observability;
use std::path::PathBuf;
use std::process::ExitCode;

/// Memport - import, export and reconcile memory records.
#[derive(Parser)]
#[command(name = "memport")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Import memories from a JSON or CSV file.
    Import {
        /// File to import (.json or .csv).
        file: PathBuf,

        /// Import mode: merge, append, or replace.
        #[arg(short, long)]
        mode: Option<String>,

        /// Import records even if their text already exists.
        #[arg(long)]
        no_skip_duplicates: bool,

        /// Skip the all-or-nothing content check before importing.
        #[arg(long)]
        no_validate: bool,

        /// Duplicate comparison: exact, trimmed, or normalized.
        #[arg(long)]
        duplicate_policy: Option<String>,
    },

    /// Export memories to a JSON or CSV file.
    Export {
        /// Export format: json, json-pretty, or csv.
        #[arg(short, long)]
        format: Option<String>,

        /// Only export these types (repeatable).
        #[arg(short = 't', long = "type")]
        types: Vec<String>,

        /// Only export memories created on or after this date.
        #[arg(long)]
        since: Option<String>,

        /// Only export memories created on or before this date.
        #[arg(long)]
        until: Option<String>,

        /// Output directory.
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// List stored memories.
    List {
        /// Maximum number of results.
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Search stored memories.
    Search {
        /// The search query.
        query: String,

        /// Maximum number of results.
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show the effective configuration.
    Config,
}

/// Main entry point.
fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match MemportConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init(&config.logging, cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(cli: Cli, config: MemportConfig) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Import {
            file,
            mode,
            no_skip_duplicates,
            no_validate,
            duplicate_policy,
        } => {
            let cancel = CancellationFlag::new();
            let handler_flag = cancel.clone();
            ctrlc::set_handler(move || {
                eprintln!("\nCancelling after the current record...");
                handler_flag.cancel();
            })?;

            let mut options = config.import;
            if let Some(mode) = mode {
                options.mode = mode.parse()?;
            }
            if let Some(policy) = duplicate_policy {
                options.duplicate_policy = policy.parse()?;
            }
            if no_skip_duplicates {
                options.skip_duplicates = false;
            }
            if no_validate {
                options.validate_before_import = false;
            }
            cmd_import(&config, &file, options, cancel)
        },

        Commands::Export {
            format,
            types,
            since,
            until,
            output,
        } => cmd_export(&config, format, &types, since, until, &output),

        Commands::List { limit } => cmd_list(&config, limit),

        Commands::Search { query, limit } => cmd_search(&config, &query, limit),

        Commands::Config => cmd_config(&config),
    }
}
