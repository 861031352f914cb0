//! Binary entry point for errfix.
//!
//! This binary provides the CLI interface for consolidating per-project
//! error logs into fix repositories and coding tips.

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
use errfix::config::ConsolidationConfig;
use errfix::observability::{self, InitOptions};
use std::path::PathBuf;
use std::process::ExitCode;

/// errfix - consolidates error logs into fix repositories.
#[derive(Parser)]
#[command(name = "errfix")]
#[command(about = "Consolidates per-project error logs into fix repositories and coding tips")]
#[command(version)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Consolidate session logs across all discovered projects.
    Consolidate {
        /// Directory whose subdirectories are candidate projects.
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// Additional project path outside the root (repeatable).
        #[arg(short, long)]
        extra: Vec<PathBuf>,

        /// Report what would change without writing anything.
        #[arg(long)]
        dry_run: bool,

        /// Deduplication strategy: exact or ai.
        #[arg(short, long)]
        strategy: Option<String>,
    },

    /// Create the errors directory and empty documents in a project.
    Bootstrap {
        /// Project directory.
        path: PathBuf,
    },

    /// Preview process rules extracted from a project's session log.
    Rules {
        /// Project directory.
        path: PathBuf,
    },

    /// Show the effective configuration.
    Config,
}

/// Main entry point.
fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match ConsolidationConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init_from_env(InitOptions {
        verbose: cli.verbose,
    }) {
        eprintln!("Failed to initialize observability: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli.command, config) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(command: Commands, config: ConsolidationConfig) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Consolidate {
            root,
            extra,
            dry_run,
            strategy,
        } => commands::cmd_consolidate(
            config,
            commands::ConsolidateArgs {
                root,
                extra,
                dry_run,
                strategy,
            },
        ),

        Commands::Bootstrap { path } => commands::cmd_bootstrap(&path),

        Commands::Rules { path } => commands::cmd_rules(&config, &path),

        Commands::Config => {
            commands::cmd_config(&config);
            Ok(ExitCode::SUCCESS)
        },
    }
}
