// src/config/validate.rs

use std::collections::BTreeMap;

use globset::Glob;

use crate::config::model::{
    ConfigFile, DriveCheckerSection, DriveCheckerSettings, RawConfigFile, SweepSection,
    SweepSettings,
};
use crate::errors::{AutosweepError, Result};
use crate::types::{parse_duration, Period};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AutosweepError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        Ok(ConfigFile {
            sweep: validate_sweep(raw.sweep)?,
            interpreter: validate_interpreters(raw.interpreter)?,
            drive_checker: validate_drive_checker(raw.drive_checker)?,
        })
    }
}

fn duration_field(section: &str, key: &str, value: &str) -> Result<std::time::Duration> {
    let d = parse_duration(value).map_err(|e| {
        AutosweepError::ConfigError(format!("[{section}].{key} = \"{value}\": {e}"))
    })?;
    if d.is_zero() {
        return Err(AutosweepError::ConfigError(format!(
            "[{section}].{key} must be greater than zero"
        )));
    }
    Ok(d)
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

fn validate_sweep(raw: SweepSection) -> Result<SweepSettings> {
    let timeout = duration_field("sweep", "timeout", &raw.timeout)?;

    if raw.extensions.is_empty() {
        return Err(AutosweepError::ConfigError(
            "[sweep].extensions must list at least one extension".to_string(),
        ));
    }

    if raw.output_limit == 0 {
        return Err(AutosweepError::ConfigError(
            "[sweep].output_limit must be >= 1 (got 0)".to_string(),
        ));
    }

    for pattern in raw.skip.iter() {
        Glob::new(pattern).map_err(|e| {
            AutosweepError::ConfigError(format!("invalid [sweep].skip pattern '{pattern}': {e}"))
        })?;
    }

    let mut extensions: Vec<String> = Vec::with_capacity(raw.extensions.len());
    for ext in raw.extensions.iter().map(|e| normalize_extension(e)) {
        if !extensions.contains(&ext) {
            extensions.push(ext);
        }
    }

    Ok(SweepSettings {
        scripts_dir: raw.scripts_dir,
        logs_dir: raw.logs_dir,
        timeout,
        extensions,
        skip: raw.skip,
        output_limit: raw.output_limit,
    })
}

fn validate_interpreters(raw: BTreeMap<String, String>) -> Result<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    for (ext, cmd) in raw {
        if cmd.split_whitespace().next().is_none() {
            return Err(AutosweepError::ConfigError(format!(
                "[interpreter].{ext} must not be empty"
            )));
        }
        out.insert(normalize_extension(&ext), cmd);
    }
    Ok(out)
}

fn validate_drive_checker(raw: DriveCheckerSection) -> Result<DriveCheckerSettings> {
    let period: Period = raw
        .period
        .parse()
        .map_err(|e: String| AutosweepError::ConfigError(format!("[drive_checker].period: {e}")))?;

    if let Period::Every(d) = period {
        if d.is_zero() {
            return Err(AutosweepError::ConfigError(
                "[drive_checker].period must be greater than zero".to_string(),
            ));
        }
    }

    if raw.smartctl.trim().is_empty() {
        return Err(AutosweepError::ConfigError(
            "[drive_checker].smartctl must not be empty".to_string(),
        ));
    }

    let notify_cmd = raw.notify_cmd.filter(|cmd| !cmd.trim().is_empty());

    Ok(DriveCheckerSettings {
        state_dir: raw.state_dir,
        report_dir: raw.report_dir,
        period,
        on_failure: raw.on_failure,
        smartctl: raw.smartctl,
        command_timeout: duration_field("drive_checker", "command_timeout", &raw.command_timeout)?,
        notify_cmd,
        notify_on_failure: raw.notify_on_failure,
        lock_stale_after: duration_field("drive_checker", "lock_stale_after", &raw.lock_stale_after)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::types::FailurePolicy;

    #[test]
    fn defaults_validate() {
        let cfg = ConfigFile::try_from(RawConfigFile::default()).unwrap();
        assert_eq!(cfg.sweep.timeout, Duration::from_secs(55 * 60));
        assert_eq!(cfg.sweep.extensions, vec!["py", "sh"]);
        assert_eq!(cfg.drive_checker.period, Period::Daily);
        assert_eq!(cfg.drive_checker.on_failure, FailurePolicy::Retry);
        assert!(cfg.drive_checker.notify_cmd.is_none());
        assert_eq!(cfg.interpreter_for("py"), Some("python3"));
    }

    #[test]
    fn extensions_are_normalized() {
        let mut raw = RawConfigFile::default();
        raw.sweep.extensions = vec![".PY".into(), "Sh".into(), "".into()];
        raw.interpreter.clear();
        raw.interpreter.insert(".Py".into(), "python3 -u".into());

        let cfg = ConfigFile::try_from(raw).unwrap();
        assert_eq!(cfg.sweep.extensions, vec!["py", "sh", ""]);
        assert_eq!(cfg.interpreter_for("py"), Some("python3 -u"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut raw = RawConfigFile::default();
        raw.sweep.timeout = "0s".into();
        match ConfigFile::try_from(raw) {
            Err(AutosweepError::ConfigError(msg)) => assert!(msg.contains("timeout")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn bad_skip_glob_is_rejected() {
        let mut raw = RawConfigFile::default();
        raw.sweep.skip = vec!["[".into()];
        assert!(matches!(
            ConfigFile::try_from(raw),
            Err(AutosweepError::ConfigError(_))
        ));
    }

    #[test]
    fn blank_notify_cmd_means_none() {
        let mut raw = RawConfigFile::default();
        raw.drive_checker.notify_cmd = Some("   ".into());
        let cfg = ConfigFile::try_from(raw).unwrap();
        assert!(cfg.drive_checker.notify_cmd.is_none());
    }
}
