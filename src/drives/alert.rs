// src/drives/alert.rs

use std::fmt::Write as _;

use chrono::{DateTime, Local};

use crate::drives::smart::{DriveIssue, DriveReport, Interface};
use crate::notify::Notification;

pub const ALERT_SUBJECT: &str = "SMART issues detected on your system";
pub const FAILURE_SUBJECT: &str = "drive checker from autosweep failed";

#[derive(Debug, Clone, PartialEq)]
pub struct FailingDrive {
    pub path: String,
    pub interface: Interface,
    pub issues: Vec<DriveIssue>,
}

/// All drive problems found by one check, sent as a single message.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub detected_at: DateTime<Local>,
    pub drives: Vec<FailingDrive>,
}

impl AlertEvent {
    /// `None` when every drive is healthy.
    pub fn from_reports(detected_at: DateTime<Local>, reports: &[DriveReport]) -> Option<Self> {
        let drives: Vec<FailingDrive> = reports
            .iter()
            .filter_map(|r| {
                let issues = r.issues();
                (!issues.is_empty()).then(|| FailingDrive {
                    path: r.path.clone(),
                    interface: r.interface(),
                    issues,
                })
            })
            .collect();

        (!drives.is_empty()).then_some(Self {
            detected_at,
            drives,
        })
    }

    pub fn to_notification(&self) -> Notification {
        let mut body = String::from("SMART issues detected:\n\n");
        for drive in &self.drives {
            let _ = writeln!(body, "Drive {}, type {}:", drive.path, drive.interface);
            for issue in &drive.issues {
                let _ = writeln!(body, " - {issue}");
            }
            body.push('\n');
        }
        let _ = writeln!(body, "Checked at {}.", self.detected_at.to_rfc3339());
        Notification::new(ALERT_SUBJECT, body)
    }
}

/// Message sent when the check itself could not complete.
pub fn failure_notification(error: &anyhow::Error, error_log: &std::path::Path) -> Notification {
    Notification::new(
        FAILURE_SUBJECT,
        format!("{error:#}\n\nSee {} for details.\n", error_log.display()),
    )
}
