// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running the discovered scripts,
//! using `tokio::process::Command`, and folding every outcome into an
//! [`ExecutionResult`].
//!
//! - [`command`] builds script/shell commands and kills process trees.
//! - [`task_runner`] runs one script with output capture and a timeout.
//! - [`backend`] provides the `ScriptRunner` trait and the production
//!   `ProcessRunner`, which tests can replace with a fake implementation.

use std::time::Duration;

use chrono::{DateTime, Local};

use crate::types::ExecStatus;

pub mod backend;
pub mod command;
pub mod task_runner;

pub use backend::{ProcessRunner, ScriptRunner, CONFIG_ENV};
pub use task_runner::{run_script, RunOptions};

/// Outcome of running one script during a sweep.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub script_name: String,
    pub start_time: DateTime<Local>,
    pub duration: Duration,
    pub status: ExecStatus,
    /// Process exit code; `None` on timeout, signal death or spawn failure.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub error: Option<String>,
}

impl ExecutionResult {
    /// Result for a script that could not be started or waited on.
    pub fn failed_to_run(
        script_name: String,
        start_time: DateTime<Local>,
        duration: Duration,
        error: String,
    ) -> Self {
        Self {
            script_name,
            start_time,
            duration,
            status: ExecStatus::Failure,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            error: Some(error),
        }
    }
}
