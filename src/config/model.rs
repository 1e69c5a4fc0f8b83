// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::types::{FailurePolicy, Period};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [sweep]
/// scripts_dir = "autoscripts"
/// logs_dir = "orchestrator_logs"
/// timeout = "55m"
/// extensions = ["py", "sh"]
///
/// [interpreter]
/// py = "python3"
///
/// [drive_checker]
/// period = "daily"
/// notify_cmd = "mail -s \"$AUTOSWEEP_SUBJECT\" me@example.com"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Orchestrator behaviour from `[sweep]`.
    #[serde(default)]
    pub sweep: SweepSection,

    /// Interpreter command per file extension from `[interpreter]`.
    ///
    /// Keys are extensions without the dot (e.g. `"py"`). A table given in
    /// the file replaces the default `py = "python3"` entirely.
    #[serde(default = "default_interpreters")]
    pub interpreter: BTreeMap<String, String>,

    /// Drive checker settings from `[drive_checker]`.
    #[serde(default)]
    pub drive_checker: DriveCheckerSection,
}

impl Default for RawConfigFile {
    fn default() -> Self {
        Self {
            sweep: SweepSection::default(),
            interpreter: default_interpreters(),
            drive_checker: DriveCheckerSection::default(),
        }
    }
}

fn default_interpreters() -> BTreeMap<String, String> {
    BTreeMap::from([("py".to_string(), "python3".to_string())])
}

/// `[sweep]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SweepSection {
    /// Folder holding the scripts to run on every sweep.
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: PathBuf,

    /// Folder receiving the run log, per-run output files and summaries.
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,

    /// Per-script timeout, e.g. `"55m"`.
    ///
    /// Keep `timeout * script count` under the external scheduler's interval.
    #[serde(default = "default_timeout")]
    pub timeout: String,

    /// Recognised extensions, without the dot. `""` admits extension-less
    /// files.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// File-name globs never treated as scripts.
    #[serde(default = "default_skip")]
    pub skip: Vec<String>,

    /// Maximum bytes of stdout/stderr kept per record in `runs.jsonl`.
    #[serde(default = "default_output_limit")]
    pub output_limit: usize,
}

fn default_scripts_dir() -> PathBuf {
    PathBuf::from("autoscripts")
}

fn default_logs_dir() -> PathBuf {
    PathBuf::from("orchestrator_logs")
}

fn default_timeout() -> String {
    "55m".to_string()
}

fn default_extensions() -> Vec<String> {
    vec!["py".to_string(), "sh".to_string()]
}

fn default_skip() -> Vec<String> {
    ["__init__.py", "common.py", "secret_manager.py", "secret_manager_local.py"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_output_limit() -> usize {
    2000
}

impl Default for SweepSection {
    fn default() -> Self {
        Self {
            scripts_dir: default_scripts_dir(),
            logs_dir: default_logs_dir(),
            timeout: default_timeout(),
            extensions: default_extensions(),
            skip: default_skip(),
            output_limit: default_output_limit(),
        }
    }
}

/// `[drive_checker]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveCheckerSection {
    /// Where the run marker and the instance lock live.
    #[serde(default = "default_reports_dir")]
    pub state_dir: PathBuf,

    /// Where the SMART report and the error log are written.
    #[serde(default = "default_reports_dir")]
    pub report_dir: PathBuf,

    /// `"daily"` or a duration such as `"24h"`.
    #[serde(default = "default_period")]
    pub period: String,

    /// Marker policy when the scan fails.
    #[serde(default)]
    pub on_failure: FailurePolicy,

    /// Path or name of the `smartctl` binary.
    #[serde(default = "default_smartctl")]
    pub smartctl: String,

    /// Timeout applied to each `smartctl` and notification command.
    #[serde(default = "default_command_timeout")]
    pub command_timeout: String,

    /// Shell command used to send a notification; subject in
    /// `$AUTOSWEEP_SUBJECT`, body on stdin. Notifications are only logged when
    /// unset.
    #[serde(default)]
    pub notify_cmd: Option<String>,

    /// Also notify when the scan itself fails.
    #[serde(default = "default_true")]
    pub notify_on_failure: bool,

    /// Age after which a leftover lock file is considered stale.
    #[serde(default = "default_lock_stale_after")]
    pub lock_stale_after: String,
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_period() -> String {
    "daily".to_string()
}

fn default_smartctl() -> String {
    "smartctl".to_string()
}

fn default_command_timeout() -> String {
    "2m".to_string()
}

fn default_true() -> bool {
    true
}

fn default_lock_stale_after() -> String {
    "2h".to_string()
}

impl Default for DriveCheckerSection {
    fn default() -> Self {
        Self {
            state_dir: default_reports_dir(),
            report_dir: default_reports_dir(),
            period: default_period(),
            on_failure: FailurePolicy::default(),
            smartctl: default_smartctl(),
            command_timeout: default_command_timeout(),
            notify_cmd: None,
            notify_on_failure: default_true(),
            lock_stale_after: default_lock_stale_after(),
        }
    }
}

/// Validated configuration.
///
/// Built from a [`RawConfigFile`] through `TryFrom`, which parses durations
/// and periods and rejects unusable values.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub sweep: SweepSettings,
    pub interpreter: BTreeMap<String, String>,
    pub drive_checker: DriveCheckerSettings,
}

#[derive(Debug, Clone)]
pub struct SweepSettings {
    pub scripts_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub timeout: Duration,
    /// Lower-cased, without leading dots.
    pub extensions: Vec<String>,
    pub skip: Vec<String>,
    pub output_limit: usize,
}

#[derive(Debug, Clone)]
pub struct DriveCheckerSettings {
    pub state_dir: PathBuf,
    pub report_dir: PathBuf,
    pub period: Period,
    pub on_failure: FailurePolicy,
    pub smartctl: String,
    pub command_timeout: Duration,
    pub notify_cmd: Option<String>,
    pub notify_on_failure: bool,
    pub lock_stale_after: Duration,
}

impl ConfigFile {
    /// Interpreter configured for the given (lower-cased) extension.
    pub fn interpreter_for(&self, extension: &str) -> Option<&str> {
        self.interpreter.get(extension).map(String::as_str)
    }

    /// Resolve every relative directory against `base` (normally the folder
    /// holding the config file).
    pub fn resolve_relative_to(mut self, base: &Path) -> Self {
        fn resolve(base: &Path, p: &mut PathBuf) {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        }

        resolve(base, &mut self.sweep.scripts_dir);
        resolve(base, &mut self.sweep.logs_dir);
        resolve(base, &mut self.drive_checker.state_dir);
        resolve(base, &mut self.drive_checker.report_dir);
        self
    }
}
