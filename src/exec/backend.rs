// src/exec/backend.rs

//! Pluggable script runner abstraction.
//!
//! The orchestrator talks to a `ScriptRunner` instead of spawning processes
//! itself. This makes it easy to swap in a fake runner in tests while keeping
//! the production implementation in [`task_runner`](super::task_runner).

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use crate::config::ConfigFile;
use crate::exec::task_runner::{run_script, RunOptions};
use crate::exec::ExecutionResult;
use crate::sweep::ScriptEntry;

/// Environment variable carrying the absolute config path to every script.
pub const CONFIG_ENV: &str = "AUTOSWEEP_CONFIG";

/// Trait abstracting how one discovered script is executed.
///
/// Implementations must not fail: faults are reported through the returned
/// [`ExecutionResult`].
pub trait ScriptRunner: Send {
    fn execute<'a>(
        &'a mut self,
        entry: &'a ScriptEntry,
    ) -> Pin<Box<dyn Future<Output = ExecutionResult> + Send + 'a>>;
}

/// Real runner used in production: one child process per script.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    options: RunOptions,
}

impl ProcessRunner {
    pub fn new(options: RunOptions) -> Self {
        Self { options }
    }

    /// Runner for a sweep described by `cfg`.
    ///
    /// Scripts run inside the scripts folder; `config_path`, when known, is
    /// exported as [`CONFIG_ENV`] so gated scripts share the same settings.
    pub fn from_config(cfg: &ConfigFile, config_path: Option<&Path>) -> Self {
        let envs = config_path
            .map(|p| {
                let abs = std::path::absolute(p).unwrap_or_else(|_| p.to_path_buf());
                vec![(CONFIG_ENV.to_string(), abs.to_string_lossy().into_owned())]
            })
            .unwrap_or_default();

        Self::new(RunOptions {
            timeout: cfg.sweep.timeout,
            working_dir: cfg.sweep.scripts_dir.clone(),
            envs,
        })
    }
}

impl ScriptRunner for ProcessRunner {
    fn execute<'a>(
        &'a mut self,
        entry: &'a ScriptEntry,
    ) -> Pin<Box<dyn Future<Output = ExecutionResult> + Send + 'a>> {
        Box::pin(run_script(entry, &self.options))
    }
}
