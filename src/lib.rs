// src/lib.rs

pub mod cli;
pub mod config;
pub mod drives;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod gate;
pub mod logging;
pub mod notify;
pub mod sweep;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use chrono::Local;
use tracing::{debug, error, info};

use crate::cli::{CliArgs, DriveCheckerArgs};
use crate::config::loader::load_or_default;
use crate::config::model::ConfigFile;
use crate::drives::{DriveTask, SmartctlProbe, TaskOutcome};
use crate::exec::ProcessRunner;
use crate::fs::{FileSystem, RealFileSystem};
use crate::sweep::runlog::write_crash_log;
use crate::sweep::{discover, DiscoveryRules, FileRunLog, Orchestrator};

/// Entry point of the `autosweep` binary. Returns the process exit status.
///
/// This wires together:
/// - config loading and CLI overrides
/// - discovery rules
/// - the process runner and the file run log
/// - one sweep
pub async fn run(args: CliArgs) -> Result<i32> {
    let mut cfg = load_or_default(&args.config)?;
    apply_sweep_overrides(&mut cfg, &args);

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let rules = DiscoveryRules::from_config(&cfg)?;

    if args.dry_run {
        print_dry_run(&cfg, fs.as_ref(), &rules);
        return Ok(0);
    }

    let config_path = args.config.exists().then_some(args.config.as_path());
    let runner = ProcessRunner::from_config(&cfg, config_path);
    let sink = FileRunLog::new(fs.clone(), &cfg.sweep.logs_dir, cfg.sweep.output_limit);
    let mut orchestrator =
        Orchestrator::new(fs.clone(), &cfg.sweep.scripts_dir, rules, runner, sink);

    match orchestrator.run_once().await {
        Ok(report) => Ok(report.exit_code()),
        Err(err) => {
            error!(error = %err, "sweep could not start");
            match write_crash_log(fs.as_ref(), &cfg.sweep.logs_dir, Local::now(), &err) {
                Ok(path) => info!(crash_log = ?path, "crash log written"),
                Err(log_err) => error!(error = %format!("{log_err:#}"), "could not write crash log"),
            }
            Ok(1)
        }
    }
}

/// Entry point of the `drive-checker` binary. Returns the process exit status.
pub async fn run_drive_checker(args: DriveCheckerArgs) -> Result<i32> {
    let mut cfg = load_or_default(&args.config)?;
    if let Some(dir) = args.state_dir.as_deref() {
        cfg.drive_checker.state_dir = absolute(dir);
    }
    if let Some(dir) = args.report_dir.as_deref() {
        cfg.drive_checker.report_dir = absolute(dir);
    }

    let settings = cfg.drive_checker;
    let probe = SmartctlProbe::new(settings.smartctl.clone(), settings.command_timeout);
    let notifier = notify::from_settings(&settings);
    let task = DriveTask::new(
        settings,
        Arc::new(RealFileSystem),
        Box::new(probe),
        notifier,
    );

    let outcome = task.run(Local::now(), args.force).await?;
    match &outcome {
        TaskOutcome::Locked => info!("another drive check is running; nothing to do"),
        TaskOutcome::Skipped { .. } => debug!("drive check not due"),
        TaskOutcome::Checked(check) => info!(
            report = ?check.report_path,
            healthy = check.healthy(),
            "drive check complete"
        ),
        TaskOutcome::Failed(err) => error!(error = %err, "drive check failed"),
    }
    Ok(outcome.exit_code())
}

fn apply_sweep_overrides(cfg: &mut ConfigFile, args: &CliArgs) {
    if let Some(dir) = args.scripts_dir.as_deref() {
        cfg.sweep.scripts_dir = absolute(dir);
    }
    if let Some(dir) = args.logs_dir.as_deref() {
        cfg.sweep.logs_dir = absolute(dir);
    }
    if let Some(timeout) = args.timeout {
        cfg.sweep.timeout = timeout;
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Dry-run output: effective settings and the scripts a sweep would run.
fn print_dry_run(cfg: &ConfigFile, fs: &dyn FileSystem, rules: &DiscoveryRules) {
    println!("autosweep dry-run");
    println!("  sweep.scripts_dir = {}", cfg.sweep.scripts_dir.display());
    println!("  sweep.logs_dir = {}", cfg.sweep.logs_dir.display());
    println!("  sweep.timeout = {:?}", cfg.sweep.timeout);
    println!("  sweep.extensions = {:?}", cfg.sweep.extensions);
    if !cfg.sweep.skip.is_empty() {
        println!("  sweep.skip = {:?}", cfg.sweep.skip);
    }
    for (ext, interpreter) in cfg.interpreter.iter() {
        println!("  interpreter.{ext} = {interpreter}");
    }
    println!();

    match discover(fs, &cfg.sweep.scripts_dir, rules) {
        Ok(scripts) => {
            println!("scripts ({}):", scripts.len());
            for script in scripts.iter() {
                match script.interpreter.as_deref() {
                    Some(interpreter) => println!("  - {} (via {interpreter})", script.name),
                    None => println!("  - {}", script.name),
                }
            }
        }
        Err(err) => println!("scripts: {err}"),
    }

    debug!("dry-run complete (no execution)");
}
