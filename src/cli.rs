// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `buildpool`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "buildpool",
    version,
    about = "Run shell commands as build jobs with bounded parallelism.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Buildpool.toml` in the current working directory. A missing
    /// default file is fine; a missing explicit file is an error.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BUILDPOOL_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run every COMMAND through the worker pool and wait for all of them.
    ///
    /// The first failing command kills the others and ends the run.
    Run(RunArgs),

    /// Report whether any output is missing or older than the newest input.
    ///
    /// Exits 1 when stale, 0 when up to date.
    Stale(StaleArgs),

    /// List one directory level the way the walker reports it.
    Ls(LsArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Number of worker slots (default: config, then processor count).
    #[arg(short = 'j', long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Hand each command to the platform shell.
    #[arg(long, conflicts_with = "argv")]
    pub shell: bool,

    /// Split each command on whitespace and exec it directly.
    #[arg(long)]
    pub argv: bool,

    /// Forward job stdout/stderr through the logger.
    #[arg(long)]
    pub capture: bool,

    /// Commands to run.
    #[arg(required = true, value_name = "COMMAND")]
    pub commands: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct StaleArgs {
    /// Input path (repeatable).
    #[arg(long = "input", value_name = "PATH", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output path (repeatable).
    #[arg(long = "output", value_name = "PATH", required = true)]
    pub outputs: Vec<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct LsArgs {
    /// Directory to list.
    #[arg(default_value = ".")]
    pub dir: String,

    /// Descend into subdirectories.
    #[arg(short, long)]
    pub recursive: bool,
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
