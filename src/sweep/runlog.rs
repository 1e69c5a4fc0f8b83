// src/sweep/runlog.rs

//! Append-only log sink for sweep results.
//!
//! Layout under the logs folder:
//!
//! ```text
//! runs.jsonl                               one JSON record per execution
//! last_run_summary.txt                     overwritten every sweep
//! 2026-01-15_03-00-00/orchestrator_run_log.txt
//! 2026-01-15_03-00-00/<script>.stdout.txt
//! 2026-01-15_03-00-00/<script>.stderr.txt
//! orchestrator_crash_<ts>.txt              only when a sweep cannot start
//! ```

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Local};
use serde::Serialize;

use crate::exec::ExecutionResult;
use crate::fs::FileSystem;
use crate::sweep::{ScriptEntry, SweepReport};
use crate::types::ExecStatus;

pub const RUNS_FILE: &str = "runs.jsonl";
pub const RUN_LOG_FILE: &str = "orchestrator_run_log.txt";
pub const SUMMARY_FILE: &str = "last_run_summary.txt";

/// Windows-safe timestamp for file and folder names (no `:`).
pub fn filename_timestamp(t: DateTime<Local>) -> String {
    t.format("%Y-%m-%d_%H-%M-%S").to_string()
}

/// Receives sweep progress as it happens.
pub trait RunSink: Send {
    fn begin(
        &mut self,
        started_at: DateTime<Local>,
        scripts_dir: &Path,
        scripts: &[ScriptEntry],
    ) -> Result<()>;

    /// Called once per execution, right after the script finished.
    fn record(&mut self, result: &ExecutionResult) -> Result<()>;

    fn finish(&mut self, report: &SweepReport) -> Result<()>;
}

/// One line of `runs.jsonl`.
#[derive(Debug, Serialize)]
struct RunRecord<'a> {
    timestamp: DateTime<Local>,
    script: &'a str,
    duration_secs: f64,
    status: ExecStatus,
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
    error: Option<&'a str>,
}

/// File-backed sink writing the layout described in the module docs.
#[derive(Debug)]
pub struct FileRunLog {
    fs: Arc<dyn FileSystem>,
    logs_dir: PathBuf,
    output_limit: usize,
    run_dir: Option<PathBuf>,
    header: Vec<String>,
    results: Vec<String>,
}

impl FileRunLog {
    pub fn new(fs: Arc<dyn FileSystem>, logs_dir: impl Into<PathBuf>, output_limit: usize) -> Self {
        Self {
            fs,
            logs_dir: logs_dir.into(),
            output_limit,
            run_dir: None,
            header: Vec::new(),
            results: Vec::new(),
        }
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    /// Folder of the current sweep, once `begin` ran.
    pub fn run_dir(&self) -> Option<&Path> {
        self.run_dir.as_deref()
    }

    fn run_log_path(&self) -> Option<PathBuf> {
        self.run_dir.as_ref().map(|d| d.join(RUN_LOG_FILE))
    }

    fn append_run_log(&self, lines: &[String]) -> Result<()> {
        if let Some(path) = self.run_log_path() {
            self.fs.append(&path, join_lines(lines).as_bytes())?;
        }
        Ok(())
    }

    fn write_output_files(&self, result: &ExecutionResult) -> Result<()> {
        let Some(run_dir) = self.run_dir.as_ref() else {
            return Ok(());
        };

        let mut stdout = result.stdout.clone();
        let mut stderr = result.stderr.clone();
        if result.status == ExecStatus::Timeout {
            stdout.push_str("\n[orchestrator] TIMEOUT\n");
            stderr.push_str("\n[orchestrator] TIMEOUT\n");
        }
        if let Some(err) = result.error.as_deref() {
            if result.exit_code.is_none() && result.status == ExecStatus::Failure {
                stderr.push_str(&format!("\n[orchestrator] {err}\n"));
            }
        }

        self.fs.write(
            &run_dir.join(format!("{}.stdout.txt", result.script_name)),
            stdout.as_bytes(),
        )?;
        self.fs.write(
            &run_dir.join(format!("{}.stderr.txt", result.script_name)),
            stderr.as_bytes(),
        )?;
        Ok(())
    }

    /// `<logs>/<stamp>`, or `<stamp>_2`, `_3`, ... when sweeps start within
    /// the same second.
    fn unused_run_dir(&self, stamp: &str) -> PathBuf {
        let mut run_dir = self.logs_dir.join(stamp);
        let mut n = 2;
        while self.fs.exists(&run_dir) {
            run_dir = self.logs_dir.join(format!("{stamp}_{n}"));
            n += 1;
        }
        run_dir
    }
}

impl RunSink for FileRunLog {
    fn begin(
        &mut self,
        started_at: DateTime<Local>,
        scripts_dir: &Path,
        scripts: &[ScriptEntry],
    ) -> Result<()> {
        let stamp = filename_timestamp(started_at);
        let run_dir = self.unused_run_dir(&stamp);
        self.fs.create_dir_all(&run_dir)?;
        self.run_dir = Some(run_dir);
        self.results.clear();

        let mut header = vec![
            format!("Orchestrator started: {stamp}"),
            format!("Scripts folder: {}", scripts_dir.display()),
            format!("Found scripts: {}", scripts.len()),
            String::new(),
            "Scripts to run (in order):".to_string(),
        ];
        header.extend(scripts.iter().map(|s| format!(" - {}", s.name)));
        header.push(String::new());
        self.header = header;

        if let Some(path) = self.run_log_path() {
            self.fs.write(&path, join_lines(&self.header).as_bytes())?;
        }
        Ok(())
    }

    fn record(&mut self, result: &ExecutionResult) -> Result<()> {
        let record = RunRecord {
            timestamp: result.start_time,
            script: &result.script_name,
            duration_secs: result.duration.as_secs_f64(),
            status: result.status,
            exit_code: result.exit_code,
            stdout: truncate_output(&result.stdout, self.output_limit),
            stderr: truncate_output(&result.stderr, self.output_limit),
            error: result.error.as_deref(),
        };
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        self.fs.append(&self.logs_dir.join(RUNS_FILE), line.as_bytes())?;

        let summary = result_line(result);
        self.results.push(summary.clone());

        self.write_output_files(result)?;
        self.append_run_log(&[
            format!("== Ran: {} ==", result.script_name),
            summary,
            String::new(),
        ])?;
        Ok(())
    }

    fn finish(&mut self, report: &SweepReport) -> Result<()> {
        let overall = if report.any_failed() { "FAILED" } else { "OK" };
        let mut footer = vec![
            String::new(),
            format!("Orchestrator finished: {}", filename_timestamp(report.finished_at)),
            format!("Overall status: {overall}"),
        ];
        if let Some(path) = self.run_log_path() {
            footer.push(format!("Run log: {}", path.display()));
        }
        self.append_run_log(&footer)?;

        let mut summary = self.header.clone();
        summary.push("Results:".to_string());
        summary.extend(self.results.iter().cloned());
        summary.extend(footer);
        self.fs.write(
            &self.logs_dir.join(SUMMARY_FILE),
            join_lines(&summary).as_bytes(),
        )?;
        Ok(())
    }
}

/// `OK rc=0 duration=1.02s script=a.sh`
pub fn result_line(result: &ExecutionResult) -> String {
    let rc = result
        .exit_code
        .map(|c| c.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{} rc={} duration={:.2}s script={}",
        result.status,
        rc,
        result.duration.as_secs_f64(),
        result.script_name
    )
}

/// Keep at most `limit` bytes of `text`, cut on a char boundary.
pub fn truncate_output(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut cut = limit;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... [truncated {} bytes]", &text[..cut], text.len() - cut)
}

/// Record why a sweep could not run at all.
pub fn write_crash_log(
    fs: &dyn FileSystem,
    logs_dir: &Path,
    at: DateTime<Local>,
    error: &dyn Display,
) -> Result<PathBuf> {
    let path = logs_dir.join(format!("orchestrator_crash_{}.txt", filename_timestamp(at)));
    fs.write(&path, format!("Orchestrator crashed: {error}\n").as_bytes())?;
    Ok(path)
}

fn join_lines(lines: &[String]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(line);
        if !line.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}
