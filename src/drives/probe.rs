// src/drives/probe.rs

//! Access to the drives themselves.
//!
//! The checker only sees a [`DriveProbe`]; the production probe shells out to
//! smartctl, tests use canned JSON.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use tokio::process::Command;
use tracing::debug;

pub type ProbeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

pub trait DriveProbe: Send + Sync {
    /// Device paths of every drive on the machine.
    fn scan(&self) -> ProbeFuture<'_, Vec<String>>;

    /// Raw `smartctl -a -j` JSON for one device.
    fn query<'a>(&'a self, path: &'a str) -> ProbeFuture<'a, String>;
}

/// Runs smartctl with a bounded wait.
#[derive(Debug, Clone)]
pub struct SmartctlProbe {
    /// Program plus leading arguments, e.g. `"sudo -n smartctl"`.
    command: String,
    timeout: Duration,
}

impl SmartctlProbe {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        let mut parts = self.command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| anyhow!("empty smartctl command"))?;

        let mut cmd = Command::new(program);
        cmd.args(parts)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let rendered = format!("{} {}", self.command, args.join(" "));
        debug!(command = %rendered, "running smartctl");

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .with_context(|| {
                format!(
                    "'{rendered}' timed out after {:.1}s",
                    self.timeout.as_secs_f64()
                )
            })?
            .with_context(|| format!("running '{rendered}'"))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();

        // smartctl encodes warnings in its exit bits; output still counts.
        if !output.status.success() && stdout.trim().is_empty() {
            bail!(
                "'{rendered}' exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(stdout)
    }
}

impl DriveProbe for SmartctlProbe {
    fn scan(&self) -> ProbeFuture<'_, Vec<String>> {
        Box::pin(async move {
            let output = self.run(&["--scan-open"]).await?;
            Ok(parse_scan_output(&output))
        })
    }

    fn query<'a>(&'a self, path: &'a str) -> ProbeFuture<'a, String> {
        Box::pin(async move { self.run(&["-a", "-j", path]).await })
    }
}

/// Device paths from `smartctl --scan-open` output.
///
/// ```text
/// /dev/sda -d sat # /dev/sda [SAT], ATA device
/// /dev/nvme0 -d nvme # /dev/nvme0, NVMe device
/// ```
pub fn parse_scan_output(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| line.starts_with("/dev/"))
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_output_keeps_device_paths_only() {
        let out = "\
/dev/sda -d sat # /dev/sda [SAT], ATA device
# /dev/sdb -d sat # /dev/sdb [SAT], open failed
/dev/nvme0 -d nvme # /dev/nvme0, NVMe device

";
        assert_eq!(parse_scan_output(out), vec!["/dev/sda", "/dev/nvme0"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_with_output_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-smartctl");
        std::fs::write(&script, "#!/bin/sh\necho '/dev/sda -d sat # ATA'\nexit 4\n").unwrap();
        let probe = SmartctlProbe::new(format!("sh {}", script.display()), Duration::from_secs(5));
        assert_eq!(probe.scan().await.unwrap(), vec!["/dev/sda"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_without_output_fails() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-smartctl");
        std::fs::write(&script, "#!/bin/sh\necho 'permission denied' >&2\nexit 2\n").unwrap();
        let probe = SmartctlProbe::new(format!("sh {}", script.display()), Duration::from_secs(5));

        let err = probe.query("/dev/sda").await.unwrap_err();
        assert!(format!("{err:#}").contains("permission denied"));
    }

    #[tokio::test]
    async fn missing_binary_fails() {
        let probe = SmartctlProbe::new("definitely-not-smartctl-xyz", Duration::from_secs(5));
        assert!(probe.scan().await.is_err());
    }
}
