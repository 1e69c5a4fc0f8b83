// src/cli.rs

//! CLI argument parsing using `clap`, one struct per binary.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::exec::CONFIG_ENV;
use crate::types::parse_duration;

/// Command-line arguments for `autosweep`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "autosweep",
    version,
    about = "Run every script in a folder once, in order, logging each result.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Autosweep.toml` in the current working directory. A missing
    /// file means built-in defaults.
    #[arg(long, value_name = "PATH", default_value = "Autosweep.toml")]
    pub config: PathBuf,

    /// Override `[sweep].scripts_dir`.
    #[arg(long, value_name = "DIR")]
    pub scripts_dir: Option<PathBuf>,

    /// Override `[sweep].logs_dir`.
    #[arg(long, value_name = "DIR")]
    pub logs_dir: Option<PathBuf>,

    /// Override the per-script timeout, e.g. `90s` or `55m`.
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `AUTOSWEEP_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print the configuration and the scripts that would run, run nothing.
    #[arg(long)]
    pub dry_run: bool,
}

/// Command-line arguments for `drive-checker`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "drive-checker",
    version,
    about = "Check drive SMART health at most once per period and alert on issues.",
    long_about = None
)]
pub struct DriveCheckerArgs {
    /// Path to the config file (TOML). Set by autosweep for its scripts.
    #[arg(long, value_name = "PATH", env = CONFIG_ENV, default_value = "Autosweep.toml")]
    pub config: PathBuf,

    /// Override `[drive_checker].state_dir` (markers and lock).
    #[arg(long, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    /// Override `[drive_checker].report_dir`.
    #[arg(long, value_name = "DIR")]
    pub report_dir: Option<PathBuf>,

    /// Check even if already done this period.
    #[arg(long)]
    pub force: bool,

    /// Logging level (error, warn, info, debug, trace).
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
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

pub fn parse_drive_checker() -> DriveCheckerArgs {
    DriveCheckerArgs::parse()
}
