#![allow(dead_code)]

use std::path::{Path, PathBuf};

use autosweep::config::{ConfigFile, RawConfigFile};
use autosweep::types::FailurePolicy;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the built-in defaults; every path stays as given (no
/// resolution against a config folder).
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn scripts_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.sweep.scripts_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn logs_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.sweep.logs_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn timeout(mut self, timeout: &str) -> Self {
        self.config.sweep.timeout = timeout.to_string();
        self
    }

    pub fn extensions(mut self, extensions: &[&str]) -> Self {
        self.config.sweep.extensions = extensions.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn skip(mut self, pattern: &str) -> Self {
        self.config.sweep.skip.push(pattern.to_string());
        self
    }

    pub fn no_skip(mut self) -> Self {
        self.config.sweep.skip.clear();
        self
    }

    pub fn interpreter(mut self, extension: &str, command: &str) -> Self {
        self.config
            .interpreter
            .insert(extension.to_string(), command.to_string());
        self
    }

    pub fn no_interpreters(mut self) -> Self {
        self.config.interpreter.clear();
        self
    }

    /// Points both the marker/lock folder and the report folder at `dir`.
    pub fn drive_dirs(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.drive_checker.state_dir = dir.as_ref().to_path_buf();
        self.config.drive_checker.report_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn period(mut self, period: &str) -> Self {
        self.config.drive_checker.period = period.to_string();
        self
    }

    pub fn on_failure(mut self, policy: FailurePolicy) -> Self {
        self.config.drive_checker.on_failure = policy;
        self
    }

    pub fn notify_cmd(mut self, cmd: &str) -> Self {
        self.config.drive_checker.notify_cmd = Some(cmd.to_string());
        self
    }

    pub fn notify_on_failure(mut self, val: bool) -> Self {
        self.config.drive_checker.notify_on_failure = val;
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Write an executable shell script into `dir` (unix only).
#[cfg(unix)]
pub fn write_shell_script(dir: impl AsRef<Path>, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.as_ref().join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    let mut perms = std::fs::metadata(&path).expect("stat script").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("chmod script");
    path
}
