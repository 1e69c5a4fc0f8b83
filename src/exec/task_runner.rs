// src/exec/task_runner.rs

//! Individual script process runner.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Local;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::exec::command::{script_command, terminate};
use crate::exec::ExecutionResult;
use crate::sweep::ScriptEntry;
use crate::types::ExecStatus;

/// How long to keep draining pipes after the child is gone. Grandchildren
/// that inherited the pipes must not hold up the sweep.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Per-run settings shared by every script of a sweep.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub timeout: Duration,
    pub working_dir: PathBuf,
    /// Extra environment passed to every script.
    pub envs: Vec<(String, String)>,
}

/// Run a single script to completion, timeout or spawn failure.
///
/// Never fails: every fault is folded into the returned
/// [`ExecutionResult`] so the sweep can carry on with the next script.
pub async fn run_script(entry: &ScriptEntry, options: &RunOptions) -> ExecutionResult {
    let start_time = Local::now();
    let started = Instant::now();

    match run_script_inner(entry, options).await {
        Ok(run) => ExecutionResult {
            script_name: entry.name.clone(),
            start_time,
            duration: started.elapsed(),
            status: run.status,
            exit_code: run.exit_code,
            stdout: run.stdout,
            stderr: run.stderr,
            error: run.error,
        },
        Err(err) => {
            error!(
                script = %entry.name,
                error = %format!("{err:#}"),
                "script execution error"
            );
            ExecutionResult::failed_to_run(
                entry.name.clone(),
                start_time,
                started.elapsed(),
                format!("{err:#}"),
            )
        }
    }
}

struct ProcessRun {
    status: ExecStatus,
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
    error: Option<String>,
}

async fn run_script_inner(entry: &ScriptEntry, options: &RunOptions) -> Result<ProcessRun> {
    info!(
        script = %entry.name,
        path = ?entry.path,
        interpreter = entry.interpreter.as_deref().unwrap_or("-"),
        "starting script process"
    );

    let mut cmd = script_command(entry, &options.working_dir);
    for (key, value) in options.envs.iter() {
        cmd.env(key, value);
    }

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for script '{}'", entry.name))?;

    let stdout = OutputCapture::spawn(child.stdout.take());
    let stderr = OutputCapture::spawn(child.stderr.take());

    let (status, exit_code, error) =
        match tokio::time::timeout(options.timeout, child.wait()).await {
            Ok(wait_res) => {
                let status = wait_res.with_context(|| {
                    format!("waiting for process of script '{}'", entry.name)
                })?;
                let code = status.code();
                if status.success() {
                    (ExecStatus::Success, code, None)
                } else {
                    let reason = match code {
                        Some(code) => format!("exited with status {code}"),
                        None => "terminated by a signal".to_string(),
                    };
                    (ExecStatus::Failure, code, Some(reason))
                }
            }
            Err(_elapsed) => {
                warn!(
                    script = %entry.name,
                    timeout_secs = options.timeout.as_secs_f64(),
                    "script exceeded its timeout; killing process"
                );
                terminate(&mut child).await;
                (
                    ExecStatus::Timeout,
                    None,
                    Some(format!(
                        "timed out after {:.1}s",
                        options.timeout.as_secs_f64()
                    )),
                )
            }
        };

    let stdout = stdout.finish().await;
    let stderr = stderr.finish().await;

    Ok(ProcessRun {
        status,
        exit_code,
        stdout,
        stderr,
        error,
    })
}

/// Background reader that accumulates one pipe into a shared buffer.
///
/// The buffer is shared so whatever arrived before an abort is kept.
struct OutputCapture {
    buf: Arc<Mutex<Vec<u8>>>,
    handle: Option<JoinHandle<()>>,
}

impl OutputCapture {
    fn spawn<R>(reader: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buf = Arc::new(Mutex::new(Vec::new()));

        let handle = reader.map(|mut reader| {
            let sink = Arc::clone(&buf);
            tokio::spawn(async move {
                let mut chunk = [0u8; 8192];
                loop {
                    match reader.read(&mut chunk).await {
                        Ok(0) => break,
                        Ok(n) => {
                            sink.lock()
                                .unwrap_or_else(|e| e.into_inner())
                                .extend_from_slice(&chunk[..n]);
                        }
                        Err(e) => {
                            debug!(error = %e, "error reading child output");
                            break;
                        }
                    }
                }
            })
        });

        Self { buf, handle }
    }

    async fn finish(self) -> String {
        if let Some(mut handle) = self.handle {
            if tokio::time::timeout(OUTPUT_DRAIN_GRACE, &mut handle).await.is_err() {
                debug!("output pipe still open after child exit; abandoning reader");
                handle.abort();
            }
        }

        let bytes = std::mem::take(&mut *self.buf.lock().unwrap_or_else(|e| e.into_inner()));
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    fn shell_script(dir: &Path, name: &str, body: &str) -> ScriptEntry {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        ScriptEntry {
            path,
            name: name.to_string(),
            interpreter: None,
        }
    }

    fn options(dir: &Path, timeout: Duration) -> RunOptions {
        RunOptions {
            timeout,
            working_dir: dir.to_path_buf(),
            envs: vec![("AUTOSWEEP_TEST_VAR".into(), "from-env".into())],
        }
    }

    #[tokio::test]
    async fn captures_output_and_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let entry = shell_script(
            dir.path(),
            "c.sh",
            "echo \"$AUTOSWEEP_TEST_VAR\"; pwd; echo oops >&2; exit 3",
        );

        let result = run_script(&entry, &options(dir.path(), Duration::from_secs(10))).await;
        assert_eq!(result.status, ExecStatus::Failure);
        assert_eq!(result.exit_code, Some(3));
        assert!(result.stdout.starts_with("from-env\n"));
        let dir_name = dir.path().file_name().unwrap().to_str().unwrap();
        assert!(result.stdout.lines().nth(1).unwrap().ends_with(dir_name));
        assert_eq!(result.stderr, "oops\n");
        assert_eq!(result.error.as_deref(), Some("exited with status 3"));
    }

    #[tokio::test]
    async fn interpreter_runs_the_script_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ok.sh"), "echo via-sh\n").unwrap();
        let entry = ScriptEntry {
            path: dir.path().join("ok.sh"),
            name: "ok.sh".into(),
            interpreter: Some("sh -e".into()),
        };

        let result = run_script(&entry, &options(dir.path(), Duration::from_secs(10))).await;
        assert_eq!(result.status, ExecStatus::Success);
        assert_eq!(result.stdout, "via-sh\n");
    }

    #[tokio::test]
    async fn timeout_kills_the_whole_process_group() {
        let dir = tempfile::tempdir().unwrap();
        // The background sleep inherits stdout; only a group kill closes it.
        let entry = shell_script(dir.path(), "b.sh", "echo started; sleep 30 & sleep 30");

        let started = Instant::now();
        let result = run_script(&entry, &options(dir.path(), Duration::from_millis(500))).await;

        assert_eq!(result.status, ExecStatus::Timeout);
        assert_eq!(result.exit_code, None);
        assert_eq!(result.stdout, "started\n");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn spawn_failure_is_a_failure_result() {
        let dir = tempfile::tempdir().unwrap();
        let entry = ScriptEntry {
            path: dir.path().join("ghost.sh"),
            name: "ghost.sh".into(),
            interpreter: None,
        };

        let result = run_script(&entry, &options(dir.path(), Duration::from_secs(5))).await;
        assert_eq!(result.status, ExecStatus::Failure);
        assert_eq!(result.exit_code, None);
        assert!(result.error.unwrap().contains("ghost.sh"));
    }
}
