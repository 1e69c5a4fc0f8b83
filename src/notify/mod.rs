// src/notify/mod.rs

//! Outbound notifications (mail or whatever the operator wires up).
//!
//! Gated tasks never talk to a mail server themselves. They hand a
//! [`Notification`] to a [`Notifier`]; the production notifier pipes it into
//! an operator-supplied shell command.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::DriveCheckerSettings;
use crate::exec::command::shell_command;

/// Environment variable carrying the subject to the notify command.
pub const SUBJECT_ENV: &str = "AUTOSWEEP_SUBJECT";

/// One message for a human.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// Delivers notifications. Errors are returned, never swallowed; callers
/// decide whether a failed delivery matters.
pub trait Notifier: Send + Sync {
    fn send<'a>(
        &'a self,
        notification: &'a Notification,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Runs a shell command per notification, body on stdin.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    command_line: String,
    timeout: Duration,
}

impl CommandNotifier {
    pub fn new(command_line: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command_line: command_line.into(),
            timeout,
        }
    }

    async fn deliver(&self, notification: &Notification) -> Result<()> {
        let mut cmd = shell_command(&self.command_line);
        cmd.env(SUBJECT_ENV, &notification.subject)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning notify command '{}'", self.command_line))?;

        if let Some(mut stdin) = child.stdin.take() {
            // A command that ignores its input may close stdin early.
            if let Err(e) = stdin.write_all(notification.body.as_bytes()).await {
                debug!(error = %e, "notify command closed stdin early");
            }
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .with_context(|| {
                format!(
                    "notify command timed out after {:.1}s",
                    self.timeout.as_secs_f64()
                )
            })?
            .context("waiting for notify command")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "notify command exited with {}: {}",
                output.status,
                stderr.trim()
            );
        }

        info!(subject = %notification.subject, "notification sent");
        Ok(())
    }
}

impl Notifier for CommandNotifier {
    fn send<'a>(
        &'a self,
        notification: &'a Notification,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(self.deliver(notification))
    }
}

/// Fallback when no notify command is configured: the message goes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send<'a>(
        &'a self,
        notification: &'a Notification,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            warn!(
                subject = %notification.subject,
                body = %notification.body,
                "notification (no notify_cmd configured)"
            );
            Ok(())
        })
    }
}

/// Notifier described by the drive checker settings.
pub fn from_settings(settings: &DriveCheckerSettings) -> Box<dyn Notifier> {
    match settings.notify_cmd.as_deref() {
        Some(cmd) => Box::new(CommandNotifier::new(cmd, settings.command_timeout)),
        None => Box::new(LogNotifier),
    }
}
