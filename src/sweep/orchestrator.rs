// src/sweep/orchestrator.rs

//! One sweep: discover, then run every script in order.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use tracing::{info, warn};

use crate::errors::Result;
use crate::exec::ScriptRunner;
use crate::fs::FileSystem;
use crate::sweep::discover::{discover, DiscoveryRules, ScriptEntry};
use crate::sweep::runlog::RunSink;
use crate::sweep::SweepReport;
use crate::types::ExecStatus;

/// Sweeps a scripts folder with a pluggable runner and sink.
///
/// There is no internal timing loop: each call to [`run_once`](Self::run_once)
/// is one sweep, driven by whoever invokes it (cron, a test, a manual run).
pub struct Orchestrator<R, S> {
    fs: Arc<dyn FileSystem>,
    scripts_dir: PathBuf,
    rules: DiscoveryRules,
    runner: R,
    sink: S,
}

impl<R: ScriptRunner, S: RunSink> Orchestrator<R, S> {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        scripts_dir: impl Into<PathBuf>,
        rules: DiscoveryRules,
        runner: R,
        sink: S,
    ) -> Self {
        Self {
            fs,
            scripts_dir: scripts_dir.into(),
            rules,
            runner,
            sink,
        }
    }

    pub fn scripts_dir(&self) -> &Path {
        &self.scripts_dir
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Scripts the next sweep would run, in execution order.
    pub fn discover(&self) -> Result<Vec<ScriptEntry>> {
        discover(self.fs.as_ref(), &self.scripts_dir, &self.rules)
    }

    /// Run every discovered script once, sequentially.
    ///
    /// A script's failure, crash or timeout never stops the following ones,
    /// and sink errors are only logged. `Err` is reserved for a sweep that
    /// cannot start (missing or unreadable scripts folder).
    pub async fn run_once(&mut self) -> Result<SweepReport> {
        let started_at = Local::now();
        let scripts = self.discover()?;

        info!(
            scripts_dir = ?self.scripts_dir,
            count = scripts.len(),
            "sweep started"
        );

        if let Err(err) = self.sink.begin(started_at, &self.scripts_dir, &scripts) {
            warn!(error = %format!("{err:#}"), "failed to write sweep header to run log");
        }

        let mut results = Vec::with_capacity(scripts.len());
        for entry in scripts.iter() {
            let result = self.runner.execute(entry).await;

            let duration_ms = result.duration.as_millis() as u64;
            match result.status {
                ExecStatus::Success => info!(
                    script = %result.script_name,
                    duration_ms,
                    "script succeeded"
                ),
                status => warn!(
                    script = %result.script_name,
                    %status,
                    exit_code = ?result.exit_code,
                    error = result.error.as_deref().unwrap_or(""),
                    duration_ms,
                    "script did not succeed"
                ),
            }

            if let Err(err) = self.sink.record(&result) {
                warn!(
                    script = %result.script_name,
                    error = %format!("{err:#}"),
                    "failed to record execution result"
                );
            }
            results.push(result);
        }

        let report = SweepReport {
            started_at,
            finished_at: Local::now(),
            results,
        };

        if let Err(err) = self.sink.finish(&report) {
            warn!(error = %format!("{err:#}"), "failed to write sweep summary");
        }

        info!(
            total = report.results.len(),
            failed = report.count(ExecStatus::Failure),
            timed_out = report.count(ExecStatus::Timeout),
            "sweep finished"
        );

        Ok(report)
    }
}
