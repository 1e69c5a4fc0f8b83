// src/drives/mod.rs

//! The drive health checker, autosweep's gated task.
//!
//! - [`probe`] talks to smartctl.
//! - [`smart`] parses its JSON and decides what counts as an issue.
//! - [`report`] writes the text report and the error log.
//! - [`alert`] turns issues into one notification.
//! - [`task`] wraps the check in the daily gate and the instance lock.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tracing::{error, info, warn};

use crate::fs::FileSystem;
use crate::notify::Notifier;

pub mod alert;
pub mod probe;
pub mod report;
pub mod smart;
pub mod task;

pub use alert::{AlertEvent, FailingDrive};
pub use probe::{DriveProbe, SmartctlProbe};
pub use smart::{DriveIssue, DriveReport, Interface};
pub use task::{DriveTask, TaskOutcome, FAILURE_NOTICE_TASK, TASK_NAME};

/// What one completed check found.
#[derive(Debug)]
pub struct CheckOutcome {
    pub drives: Vec<DriveReport>,
    pub report_path: PathBuf,
    pub alert: Option<AlertEvent>,
    /// Set when issues were found but the notification could not be sent.
    pub notification_error: Option<String>,
}

impl CheckOutcome {
    pub fn healthy(&self) -> bool {
        self.alert.is_none()
    }
}

/// Scans every drive, writes the report and raises at most one alert.
pub struct DriveChecker<'a> {
    fs: Arc<dyn FileSystem>,
    probe: &'a dyn DriveProbe,
    notifier: &'a dyn Notifier,
    report_dir: PathBuf,
}

impl<'a> DriveChecker<'a> {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        probe: &'a dyn DriveProbe,
        notifier: &'a dyn Notifier,
        report_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fs,
            probe,
            notifier,
            report_dir: report_dir.into(),
        }
    }

    /// Run one full check.
    ///
    /// Fails when drives cannot be enumerated or read, or the report cannot
    /// be written. A failed notification does not fail the check; it is
    /// reported in [`CheckOutcome::notification_error`].
    pub async fn check(&self, now: DateTime<Local>) -> Result<CheckOutcome> {
        let paths = self.probe.scan().await.context("enumerating drives")?;
        if paths.is_empty() {
            warn!("smartctl reported no drives");
        }

        let mut drives = Vec::with_capacity(paths.len());
        for path in &paths {
            let json = self
                .probe
                .query(path)
                .await
                .with_context(|| format!("reading SMART data of {path}"))?;
            let drive = DriveReport::parse(path, &json)?;
            info!(
                drive = %drive.path,
                interface = %drive.interface(),
                issues = drive.issues().len(),
                "drive read"
            );
            drives.push(drive);
        }

        let report_path = report::write_report(self.fs.as_ref(), &self.report_dir, &drives)
            .context("writing drive report")?;
        info!(report = ?report_path, drives = drives.len(), "drive report written");

        let alert = AlertEvent::from_reports(now, &drives);
        let mut notification_error = None;
        if let Some(event) = alert.as_ref() {
            warn!(failing = event.drives.len(), "drive issues detected; notifying");
            if let Err(err) = self.notifier.send(&event.to_notification()).await {
                error!(
                    error = %format!("{err:#}"),
                    "could not send drive alert; the report still lists the issues"
                );
                notification_error = Some(format!("{err:#}"));
            }
        }

        Ok(CheckOutcome {
            drives,
            report_path,
            alert,
            notification_error,
        })
    }
}
