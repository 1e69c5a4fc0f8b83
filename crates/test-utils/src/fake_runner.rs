use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Local};

use autosweep::exec::{ExecutionResult, ScriptRunner};
use autosweep::sweep::{RunSink, ScriptEntry, SweepReport};
use autosweep::types::ExecStatus;

/// A fake runner that:
/// - records which scripts were "run", in order
/// - reports the status configured for each script (default: success)
///   without spawning anything.
#[derive(Clone, Default)]
pub struct FakeRunner {
    outcomes: HashMap<String, ExecStatus>,
    executed: Arc<Mutex<Vec<String>>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outcome(mut self, script: &str, status: ExecStatus) -> Self {
        self.outcomes.insert(script.to_string(), status);
        self
    }

    /// Handle on the execution order, shared with clones.
    pub fn executed(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.executed)
    }

    fn result_for(&self, entry: &ScriptEntry) -> ExecutionResult {
        let status = self
            .outcomes
            .get(&entry.name)
            .copied()
            .unwrap_or(ExecStatus::Success);
        let (exit_code, error) = match status {
            ExecStatus::Success => (Some(0), None),
            ExecStatus::Failure => (Some(1), Some("exited with status 1".to_string())),
            ExecStatus::Timeout => (None, Some("timed out".to_string())),
        };
        ExecutionResult {
            script_name: entry.name.clone(),
            start_time: Local::now(),
            duration: Duration::from_millis(5),
            status,
            exit_code,
            stdout: format!("{} stdout\n", entry.name),
            stderr: String::new(),
            error,
        }
    }
}

impl ScriptRunner for FakeRunner {
    fn execute<'a>(
        &'a mut self,
        entry: &'a ScriptEntry,
    ) -> Pin<Box<dyn Future<Output = ExecutionResult> + Send + 'a>> {
        Box::pin(async move {
            self.executed.lock().unwrap().push(entry.name.clone());
            self.result_for(entry)
        })
    }
}

/// Everything a [`MemorySink`] was told.
#[derive(Debug, Default)]
pub struct SinkLog {
    pub begun: Vec<(DateTime<Local>, PathBuf, Vec<String>)>,
    pub records: Vec<ExecutionResult>,
    pub finished: Vec<SweepReport>,
}

/// In-memory run sink; optionally fails every `record` call to exercise
/// the orchestrator's sink error handling.
#[derive(Clone, Default)]
pub struct MemorySink {
    log: Arc<Mutex<SinkLog>>,
    fail_records: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_records: true,
            ..Self::default()
        }
    }

    pub fn log(&self) -> Arc<Mutex<SinkLog>> {
        Arc::clone(&self.log)
    }
}

impl RunSink for MemorySink {
    fn begin(
        &mut self,
        started_at: DateTime<Local>,
        scripts_dir: &Path,
        scripts: &[ScriptEntry],
    ) -> anyhow::Result<()> {
        let names = scripts.iter().map(|s| s.name.clone()).collect();
        self.log
            .lock()
            .unwrap()
            .begun
            .push((started_at, scripts_dir.to_path_buf(), names));
        Ok(())
    }

    fn record(&mut self, result: &ExecutionResult) -> anyhow::Result<()> {
        if self.fail_records {
            anyhow::bail!("disk full");
        }
        self.log.lock().unwrap().records.push(result.clone());
        Ok(())
    }

    fn finish(&mut self, report: &SweepReport) -> anyhow::Result<()> {
        self.log.lock().unwrap().finished.push(report.clone());
        Ok(())
    }
}
