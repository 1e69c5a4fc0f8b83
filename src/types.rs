use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Final status of one script execution within a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecStatus {
    Success,
    Failure,
    Timeout,
}

impl ExecStatus {
    pub fn is_success(self) -> bool {
        matches!(self, ExecStatus::Success)
    }
}

impl fmt::Display for ExecStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecStatus::Success => "OK",
            ExecStatus::Failure => "FAILED",
            ExecStatus::Timeout => "TIMEOUT",
        };
        f.write_str(s)
    }
}

/// How often a gated task's guarded action may fire.
///
/// - `Daily`: once per local calendar date.
/// - `Every(d)`: once `d` has elapsed since the last recorded run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Daily,
    Every(Duration),
}

impl Default for Period {
    fn default() -> Self {
        Period::Daily
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" | "day" => Ok(Period::Daily),
            other => parse_duration(other)
                .map(Period::Every)
                .map_err(|e| format!("invalid period '{other}' (expected \"daily\" or a duration): {e}")),
        }
    }
}

/// What a gated task does with its marker when the guarded action fails.
///
/// - `Retry`: leave the marker untouched so the next invocation tries again
///   (default).
/// - `Suppress`: record the attempt anyway and wait for the next period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    Retry,
    Suppress,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::Retry
    }
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"55m"`, `"2h"`,
/// `"1d"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let scale = |factor: u64| {
        value
            .checked_mul(factor)
            .map(Duration::from_secs)
            .ok_or_else(|| "duration too large".to_string())
    };

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => scale(60),
        "h" => scale(60 * 60),
        "d" => scale(24 * 60 * 60),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, h or d",
            unit
        )),
    }
}
