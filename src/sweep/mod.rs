// src/sweep/mod.rs

//! The orchestrator side of autosweep.
//!
//! - [`discover`] decides which files in the scripts folder are scripts.
//! - [`orchestrator`] runs them one after another, isolating failures.
//! - [`runlog`] persists one record per execution.

use chrono::{DateTime, Local};

use crate::exec::ExecutionResult;
use crate::types::ExecStatus;

pub mod discover;
pub mod orchestrator;
pub mod runlog;

pub use discover::{discover, DiscoveryRules, ScriptEntry};
pub use orchestrator::Orchestrator;
pub use runlog::{FileRunLog, RunSink};

/// Everything one sweep produced, in execution order.
#[derive(Debug, Clone)]
pub struct SweepReport {
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub results: Vec<ExecutionResult>,
}

impl SweepReport {
    pub fn any_failed(&self) -> bool {
        self.results.iter().any(|r| !r.status.is_success())
    }

    pub fn count(&self, status: ExecStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    /// Process exit status for the external scheduler.
    pub fn exit_code(&self) -> i32 {
        if self.any_failed() { 1 } else { 0 }
    }
}
