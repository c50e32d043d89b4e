// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::DEFAULT_CONFIG_PATH;

/// Command-line arguments for `pipewright`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pipewright",
    version,
    about = "Task-graph build pipeline for client web assets.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PIPEWRIGHT_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the full build: every stage, dependency-ordered.
    Build {
        /// Print the execution plan without running any stage.
        #[arg(long)]
        dry_run: bool,
    },

    /// Remove build outputs and the transform cache.
    Clean,

    /// Build the watched stages once, then re-run tasks as source files
    /// change. Runs until interrupted.
    Watch,

    /// Like `watch`, announcing the output tree for a local dev server.
    Serve,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
