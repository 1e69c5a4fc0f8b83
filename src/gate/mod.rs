// src/gate/mod.rs

//! Gated tasks: cheap to invoke often, acting at most once per period.
//!
//! A [`Gate`] compares "now" with the task's persisted [`RunMarker`] and only
//! runs the guarded action when the period has rolled over. The marker is the
//! sole enforcement mechanism, so it lives in a [`MarkerStore`] that survives
//! restarts. [`InstanceLock`] keeps overlapping invocations of the same task
//! apart.

use std::future::Future;

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::types::{FailurePolicy, Period};

pub mod lock;
pub mod marker;

pub use lock::InstanceLock;
pub use marker::{FileMarkerStore, MarkerStore, MemoryMarkerStore, RunMarker};

/// Where a gate is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Guarded action not due in the current period.
    Idle,
    /// Period elapsed since the last recorded run.
    Due,
    /// Guarded action executing.
    Running,
    /// Guarded action finished and the marker was updated.
    Done,
}

/// What one gated invocation amounted to.
#[derive(Debug)]
pub enum GateOutcome<T> {
    /// Not due; nothing ran and nothing was written.
    Skipped { last_run: DateTime<Local> },
    /// The guarded action ran and the marker now holds this invocation's time.
    Completed(T),
    /// The guarded action failed; the marker followed the [`FailurePolicy`].
    Failed(anyhow::Error),
}

impl Period {
    /// Whether an action last run at `last` is due again at `now`.
    ///
    /// A marker dated after `now` (clock moved backwards) counts as due.
    pub fn is_due(&self, last: DateTime<Local>, now: DateTime<Local>) -> bool {
        if last > now {
            return true;
        }
        match self {
            Period::Daily => now.date_naive() != last.date_naive(),
            Period::Every(interval) => match (now - last).to_std() {
                Ok(elapsed) => elapsed >= *interval,
                Err(_) => true,
            },
        }
    }
}

/// The gate of one task.
pub struct Gate<S> {
    task: String,
    period: Period,
    policy: FailurePolicy,
    store: S,
    state: GateState,
}

impl<S: MarkerStore> Gate<S> {
    pub fn new(task: impl Into<String>, period: Period, policy: FailurePolicy, store: S) -> Self {
        Self {
            task: task.into(),
            period,
            policy,
            store,
            state: GateState::Idle,
        }
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Last recorded run, treating an unreadable marker as absent.
    pub fn last_run(&self) -> Option<DateTime<Local>> {
        match self.store.load(&self.task) {
            Ok(marker) => marker.map(|m| m.last_run),
            Err(err) => {
                warn!(
                    task = %self.task,
                    error = %err,
                    "unreadable run marker; treating the action as due"
                );
                None
            }
        }
    }

    /// `Idle` or `Due` for an invocation at `now`. Never mutates the marker.
    pub fn evaluate(&mut self, now: DateTime<Local>) -> GateState {
        self.state = match self.last_run() {
            Some(last) if !self.period.is_due(last, now) => GateState::Idle,
            _ => GateState::Due,
        };
        self.state
    }

    /// Run `action` if due at `now` (or unconditionally when `force`).
    ///
    /// `Err` only when the marker cannot be written after the action ran.
    pub async fn run<T, F, Fut>(
        &mut self,
        now: DateTime<Local>,
        force: bool,
        action: F,
    ) -> Result<GateOutcome<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        if force {
            info!(task = %self.task, "forced run; ignoring the run marker");
        } else if let Some(last_run) = self.last_run() {
            if !self.period.is_due(last_run, now) {
                self.state = GateState::Idle;
                debug!(task = %self.task, %last_run, "guarded action not due; skipping");
                return Ok(GateOutcome::Skipped { last_run });
            }
        }
        self.state = GateState::Running;
        info!(task = %self.task, "guarded action due; running");

        match action().await {
            Ok(value) => {
                self.store.save(&self.task, &RunMarker::new(now))?;
                self.state = GateState::Done;
                info!(task = %self.task, "guarded action completed");
                Ok(GateOutcome::Completed(value))
            }
            Err(err) => {
                match self.policy {
                    FailurePolicy::Retry => {
                        warn!(
                            task = %self.task,
                            error = %format!("{err:#}"),
                            "guarded action failed; marker left unchanged so the next invocation retries"
                        );
                    }
                    FailurePolicy::Suppress => {
                        warn!(
                            task = %self.task,
                            error = %format!("{err:#}"),
                            "guarded action failed; recording the attempt until the next period"
                        );
                        self.store.save(&self.task, &RunMarker::new(now))?;
                    }
                }
                self.state = GateState::Idle;
                Ok(GateOutcome::Failed(err))
            }
        }
    }
}
