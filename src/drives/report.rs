// src/drives/report.rs

//! Human-readable drive report and the checker's error log.

use std::fmt::{Display, Write as _};
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{DateTime, Local};
use serde_json::Value;

use crate::drives::smart::{DriveReport, SmartAttributes};
use crate::fs::FileSystem;

pub const REPORT_FILE: &str = "drive_smart_scanner_report.txt";
pub const ERROR_LOG_FILE: &str = "drive_smart_scanner_error_log.txt";

const ATA_COLUMNS: [(&str, usize); 6] = [
    ("ID", 5),
    ("Attribute name", 28),
    ("Current", 10),
    ("Worst", 7),
    ("Threshold", 10),
    ("Raw Values", 20),
];

const NVME_COLUMNS: [(&str, usize); 2] = [("Attribute name", 28), ("value", 10)];

/// `| a     | b    |` with every cell left-aligned and padded to its width.
pub fn table_row<S: AsRef<str>>(cells: &[S], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell.as_ref(), width = *width))
        .collect();
    format!("| {} |\n", padded.join(" | "))
}

fn table_header(columns: &[(&str, usize)]) -> String {
    let widths: Vec<usize> = columns.iter().map(|(_, w)| *w).collect();
    let names: Vec<&str> = columns.iter().map(|(n, _)| *n).collect();
    let rules: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let mut out = table_row(&names, &widths);
    out.push_str(&table_row(&rules, &widths));
    out
}

fn or_dash<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn nvme_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

/// Render the whole report for `drives`, numbered from 1.
pub fn render_report(drives: &[DriveReport]) -> String {
    let mut out = String::new();

    for (index, drive) in drives.iter().enumerate() {
        let rule = "-".repeat(28);
        let _ = writeln!(out, "{rule} DRIVE {} {rule}", index + 1);

        let id = &drive.identity;
        let _ = writeln!(out, "disk family : {}", or_dash(id.family.as_deref()));
        let _ = writeln!(out, "disk name : {}", or_dash(id.model.as_deref()));
        let _ = writeln!(out, "device path : {}", drive.path);
        let _ = writeln!(out, "firmware version : {}", or_dash(id.firmware.as_deref()));
        let _ = writeln!(out, "serial number : {}", or_dash(id.serial.as_deref()));
        let _ = writeln!(out, "interface : {}", id.protocol);
        let _ = writeln!(out, "power on count : {}", or_dash(drive.power_cycle_count));
        let _ = writeln!(out, "power on hours : {}", or_dash(drive.power_on_hours));
        let _ = writeln!(out, "power on years : {}", or_dash(drive.power_on_years()));
        let _ = writeln!(
            out,
            "smart status is ok (according to smartctl) : {}\n",
            or_dash(id.smart_passed)
        );

        out.push_str("SMART :\n\n");
        match &drive.attributes {
            SmartAttributes::Ata(attrs) => {
                out.push_str("current : 0-100 score, higher is better\n");
                out.push_str("worst : historical minimum of 'current'\n");
                out.push_str("threshold : if current goes below that then it's bad\n");
                out.push_str("raw values : the actual value\n\n");
                out.push_str(&table_header(&ATA_COLUMNS));

                let widths: Vec<usize> = ATA_COLUMNS.iter().map(|(_, w)| *w).collect();
                for a in attrs {
                    let cells = [
                        a.id.to_string(),
                        a.name.clone(),
                        a.current.to_string(),
                        a.worst.to_string(),
                        or_dash(a.threshold),
                        a.raw.to_string(),
                    ];
                    out.push_str(&table_row(&cells, &widths));
                }
            }
            SmartAttributes::Nvme(attrs) => {
                out.push_str("lower is better\n\n");
                out.push_str(&table_header(&NVME_COLUMNS));

                let widths: Vec<usize> = NVME_COLUMNS.iter().map(|(_, w)| *w).collect();
                for a in attrs {
                    let cells = [a.name.clone(), nvme_value(&a.value)];
                    out.push_str(&table_row(&cells, &widths));
                }
            }
        }
        out.push('\n');
    }

    out
}

/// Overwrite `<report_dir>/drive_smart_scanner_report.txt`.
pub fn write_report(
    fs: &dyn FileSystem,
    report_dir: &Path,
    drives: &[DriveReport],
) -> Result<PathBuf> {
    let path = report_dir.join(REPORT_FILE);
    fs.write(&path, render_report(drives).as_bytes())?;
    Ok(path)
}

/// Append a timestamped entry to `<report_dir>/drive_smart_scanner_error_log.txt`.
pub fn append_error_log(
    fs: &dyn FileSystem,
    report_dir: &Path,
    at: DateTime<Local>,
    error: &dyn Display,
) -> Result<PathBuf> {
    let path = report_dir.join(ERROR_LOG_FILE);
    let entry = format!("[{}] {error}\n", at.to_rfc3339());
    fs.append(&path, entry.as_bytes())?;
    Ok(path)
}
