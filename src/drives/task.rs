// src/drives/task.rs

//! One invocation of the gated drive check.

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Local};
use tracing::{debug, error, info};

use crate::config::DriveCheckerSettings;
use crate::drives::alert::failure_notification;
use crate::drives::report::append_error_log;
use crate::drives::{CheckOutcome, DriveChecker, DriveProbe};
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::gate::{FileMarkerStore, Gate, GateOutcome, GateState, InstanceLock};
use crate::notify::Notifier;
use crate::types::FailurePolicy;

/// Name of the marker and lock files.
pub const TASK_NAME: &str = "drive_smart_scanner";

/// Marker name for the last failure notification sent.
pub const FAILURE_NOTICE_TASK: &str = "drive_smart_scanner_failure_notice";

#[derive(Debug)]
pub enum TaskOutcome {
    /// Another invocation is running the check right now.
    Locked,
    /// Already checked this period.
    Skipped { last_run: DateTime<Local> },
    Checked(CheckOutcome),
    /// The check failed; the error is in the error log.
    Failed(String),
}

impl TaskOutcome {
    /// Exit status for the orchestrator: only a failed check is non-zero.
    pub fn exit_code(&self) -> i32 {
        match self {
            TaskOutcome::Failed(_) => 1,
            _ => 0,
        }
    }
}

pub struct DriveTask {
    settings: DriveCheckerSettings,
    fs: Arc<dyn FileSystem>,
    probe: Box<dyn DriveProbe>,
    notifier: Box<dyn Notifier>,
}

impl DriveTask {
    pub fn new(
        settings: DriveCheckerSettings,
        fs: Arc<dyn FileSystem>,
        probe: Box<dyn DriveProbe>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            settings,
            fs,
            probe,
            notifier,
        }
    }

    /// Gate, lock and run the check for an invocation at `now`.
    ///
    /// A poll that is not due returns before touching the disk. `Err` is
    /// reserved for problems outside the check itself, such as an
    /// unwritable state folder.
    pub async fn run(&self, now: DateTime<Local>, force: bool) -> Result<TaskOutcome> {
        let state_dir = &self.settings.state_dir;
        let mut gate = Gate::new(
            TASK_NAME,
            self.settings.period,
            self.settings.on_failure,
            FileMarkerStore::new(self.fs.clone(), state_dir.clone()),
        );

        if !force && gate.evaluate(now) == GateState::Idle {
            if let Some(last_run) = gate.last_run() {
                debug!(%last_run, "drives already checked this period");
                return Ok(TaskOutcome::Skipped { last_run });
            }
        }

        self.fs
            .create_dir_all(state_dir)
            .context("creating drive checker state folder")?;
        self.fs
            .create_dir_all(&self.settings.report_dir)
            .context("creating drive report folder")?;

        let lock_path = state_dir.join(format!("{TASK_NAME}.lock"));
        let Some(_lock) =
            InstanceLock::acquire(self.fs.clone(), lock_path, self.settings.lock_stale_after)?
        else {
            return Ok(TaskOutcome::Locked);
        };

        let checker = DriveChecker::new(
            self.fs.clone(),
            self.probe.as_ref(),
            self.notifier.as_ref(),
            self.settings.report_dir.clone(),
        );

        // Re-checked under the lock: another invocation may have finished meanwhile.
        match gate.run(now, force, || checker.check(now)).await? {
            GateOutcome::Skipped { last_run } => {
                info!(%last_run, "drives already checked this period");
                Ok(TaskOutcome::Skipped { last_run })
            }
            GateOutcome::Completed(outcome) => {
                info!(
                    drives = outcome.drives.len(),
                    healthy = outcome.healthy(),
                    notified = outcome.alert.is_some() && outcome.notification_error.is_none(),
                    "drive check finished"
                );
                Ok(TaskOutcome::Checked(outcome))
            }
            GateOutcome::Failed(err) => {
                self.record_failure(now, &err).await;
                Ok(TaskOutcome::Failed(format!("{err:#}")))
            }
        }
    }

    async fn record_failure(&self, now: DateTime<Local>, err: &anyhow::Error) {
        let report_dir = &self.settings.report_dir;
        let log_path = match append_error_log(
            self.fs.as_ref(),
            report_dir,
            now,
            &format!("{err:#}"),
        ) {
            Ok(path) => path,
            Err(log_err) => {
                error!(error = %format!("{log_err:#}"), "could not append to drive checker error log");
                report_dir.join(crate::drives::report::ERROR_LOG_FILE)
            }
        };

        if !self.settings.notify_on_failure {
            return;
        }

        // One failure notice per period, however often the failing check is retried.
        let mut notice_gate = Gate::new(
            FAILURE_NOTICE_TASK,
            self.settings.period,
            FailurePolicy::Retry,
            FileMarkerStore::new(self.fs.clone(), self.settings.state_dir.clone()),
        );
        let notification = failure_notification(err, &log_path);
        match notice_gate
            .run(now, false, || self.notifier.send(&notification))
            .await
        {
            Ok(GateOutcome::Completed(())) => {}
            Ok(GateOutcome::Skipped { last_run }) => {
                debug!(%last_run, "failure already reported this period");
            }
            Ok(GateOutcome::Failed(notify_err)) => {
                error!(
                    error = %format!("{notify_err:#}"),
                    "could not send drive checker failure notification"
                );
            }
            Err(marker_err) => {
                error!(
                    error = %marker_err,
                    "could not record the failure notification marker"
                );
            }
        }
    }
}
