// src/drives/smart.rs

//! smartctl JSON (`smartctl -a -j`) parsing and health checks.

use std::fmt;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};

/// ATA attributes worth an alert, with a threshold stricter than the vendor's.
pub const ATA_WATCHED_ATTRIBUTES: [(u32, u32); 5] = [
    (5, 60),   // Reallocated_Sector_Ct
    (187, 60), // Reported_Uncorrect
    (188, 60), // Command_Timeout
    (197, 60), // Current_Pending_Sector
    (198, 60), // Offline_Uncorrectable
];

/// NVMe health log fields and the highest acceptable value for each.
pub const NVME_LIMITS: [(&str, f64); 6] = [
    ("critical_warning", 0.0),
    ("media_errors", 0.0),
    ("num_err_log_entries", 0.0),
    ("warning_temp_time", 0.0),
    ("critical_comp_time", 0.0),
    ("percentage_used", 80.0),
];

const HOURS_PER_YEAR: f64 = 24.0 * 365.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interface {
    Ata,
    Nvme,
}

impl Interface {
    /// smartctl reports `ATA`, `NVMe`, `SCSI`...; everything but ATA is read
    /// through the NVMe health log.
    fn from_protocol(protocol: &str) -> Self {
        if protocol.eq_ignore_ascii_case("ata") {
            Interface::Ata
        } else {
            Interface::Nvme
        }
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interface::Ata => f.write_str("ATA"),
            Interface::Nvme => f.write_str("NVME"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveIdentity {
    pub family: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub firmware: Option<String>,
    /// Protocol string as smartctl printed it.
    pub protocol: String,
    /// smartctl's overall verdict; `None` when it gave none.
    pub smart_passed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtaAttribute {
    pub id: u32,
    pub name: String,
    /// Normalized 0..=255 score, higher is better.
    pub current: u32,
    pub worst: u32,
    pub threshold: Option<u32>,
    pub raw: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NvmeAttribute {
    pub name: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SmartAttributes {
    Ata(Vec<AtaAttribute>),
    Nvme(Vec<NvmeAttribute>),
}

/// One drive as read from smartctl.
#[derive(Debug, Clone, PartialEq)]
pub struct DriveReport {
    pub path: String,
    pub identity: DriveIdentity,
    pub power_on_hours: Option<u64>,
    pub power_cycle_count: Option<u64>,
    pub attributes: SmartAttributes,
}

/// Something about a drive a human should look at.
#[derive(Debug, Clone, PartialEq)]
pub enum DriveIssue {
    SmartFailed,
    Ata {
        id: u32,
        name: String,
        current: u32,
        limit: u32,
        raw: u64,
    },
    Nvme {
        name: String,
        value: f64,
        limit: f64,
    },
}

impl fmt::Display for DriveIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriveIssue::SmartFailed => f.write_str("smartctl overall health assessment FAILED"),
            DriveIssue::Ata {
                id,
                name,
                current,
                limit,
                raw,
            } => {
                if current < limit {
                    write!(f, "{name} (id {id}): current {current} below {limit}, raw {raw}")
                } else {
                    write!(f, "{name} (id {id}): raw value {raw}")
                }
            }
            DriveIssue::Nvme { name, value, limit } => {
                write!(f, "{name}: {value} (limit {limit})")
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawSmartctl {
    device: Option<RawDevice>,
    model_family: Option<String>,
    model_name: Option<String>,
    serial_number: Option<String>,
    firmware_version: Option<String>,
    smart_status: Option<RawSmartStatus>,
    power_on_time: Option<RawPowerOnTime>,
    power_cycle_count: Option<u64>,
    ata_smart_attributes: Option<RawAtaTable>,
    nvme_smart_health_information_log: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct RawDevice {
    protocol: Option<String>,
    model_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSmartStatus {
    passed: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawPowerOnTime {
    hours: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawAtaTable {
    #[serde(default)]
    table: Vec<RawAtaAttribute>,
}

#[derive(Debug, Deserialize)]
struct RawAtaAttribute {
    id: u32,
    name: String,
    value: u32,
    worst: u32,
    thresh: Option<u32>,
    raw: RawAtaRaw,
}

#[derive(Debug, Deserialize)]
struct RawAtaRaw {
    value: u64,
}

impl DriveReport {
    /// Parse the JSON document smartctl printed for `path`.
    pub fn parse(path: &str, json: &str) -> Result<Self> {
        let raw: RawSmartctl = serde_json::from_str(json)
            .with_context(|| format!("parsing smartctl JSON for {path}"))?;

        let device = raw
            .device
            .with_context(|| format!("smartctl output for {path} has no device section"))?;
        let protocol = device
            .protocol
            .with_context(|| format!("smartctl output for {path} has no device protocol"))?;

        let attributes = match Interface::from_protocol(&protocol) {
            Interface::Ata => SmartAttributes::Ata(
                raw.ata_smart_attributes
                    .map(|t| t.table)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|a| AtaAttribute {
                        id: a.id,
                        name: a.name,
                        current: a.value,
                        worst: a.worst,
                        threshold: a.thresh,
                        raw: a.raw.value,
                    })
                    .collect(),
            ),
            Interface::Nvme => SmartAttributes::Nvme(
                raw.nvme_smart_health_information_log
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(name, value)| NvmeAttribute { name, value })
                    .collect(),
            ),
        };

        Ok(Self {
            path: path.to_string(),
            identity: DriveIdentity {
                family: raw.model_family,
                model: raw.model_name.or(device.model_name),
                serial: raw.serial_number,
                firmware: raw.firmware_version,
                protocol,
                smart_passed: raw.smart_status.and_then(|s| s.passed),
            },
            power_on_hours: raw.power_on_time.and_then(|p| p.hours),
            power_cycle_count: raw.power_cycle_count,
            attributes,
        })
    }

    pub fn interface(&self) -> Interface {
        match self.attributes {
            SmartAttributes::Ata(_) => Interface::Ata,
            SmartAttributes::Nvme(_) => Interface::Nvme,
        }
    }

    pub fn power_on_years(&self) -> Option<f64> {
        self.power_on_hours.map(power_on_years)
    }

    /// Everything wrong with this drive; empty when healthy.
    pub fn issues(&self) -> Vec<DriveIssue> {
        let mut issues = Vec::new();
        if self.identity.smart_passed == Some(false) {
            issues.push(DriveIssue::SmartFailed);
        }

        match &self.attributes {
            SmartAttributes::Ata(attrs) => {
                for attr in attrs {
                    let Some(&(_, limit)) =
                        ATA_WATCHED_ATTRIBUTES.iter().find(|(id, _)| *id == attr.id)
                    else {
                        continue;
                    };
                    if attr.current < limit || attr.raw > 0 {
                        issues.push(DriveIssue::Ata {
                            id: attr.id,
                            name: attr.name.clone(),
                            current: attr.current,
                            limit,
                            raw: attr.raw,
                        });
                    }
                }
            }
            SmartAttributes::Nvme(attrs) => {
                for attr in attrs {
                    let Some(&(_, limit)) =
                        NVME_LIMITS.iter().find(|(name, _)| *name == attr.name)
                    else {
                        continue;
                    };
                    let Some(value) = attr.value.as_f64() else {
                        continue;
                    };
                    if value > limit {
                        issues.push(DriveIssue::Nvme {
                            name: attr.name.clone(),
                            value,
                            limit,
                        });
                    }
                }
            }
        }

        issues
    }
}

/// Power-on hours as years, rounded to two decimals.
pub fn power_on_years(hours: u64) -> f64 {
    (hours as f64 / HOURS_PER_YEAR * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const ATA_JSON: &str = r#"{
        "device": {"name": "/dev/sda", "type": "sat", "protocol": "ATA"},
        "model_family": "Seagate BarraCuda 3.5",
        "model_name": "ST2000DM008",
        "serial_number": "ZFL0AAAA",
        "firmware_version": "0001",
        "smart_status": {"passed": true},
        "power_on_time": {"hours": 17520},
        "power_cycle_count": 812,
        "ata_smart_attributes": {"revision": 10, "table": [
            {"id": 1, "name": "Raw_Read_Error_Rate", "value": 80, "worst": 64, "thresh": 44, "raw": {"value": 93012345, "string": "93012345"}},
            {"id": 5, "name": "Reallocated_Sector_Ct", "value": 100, "worst": 100, "thresh": 10, "raw": {"value": 8, "string": "8"}},
            {"id": 197, "name": "Current_Pending_Sector", "value": 55, "worst": 55, "thresh": 0, "raw": {"value": 0, "string": "0"}},
            {"id": 198, "name": "Offline_Uncorrectable", "value": 100, "worst": 100, "thresh": 0, "raw": {"value": 0, "string": "0"}}
        ]}
    }"#;

    const NVME_JSON: &str = r#"{
        "device": {"name": "/dev/nvme0", "type": "nvme", "protocol": "NVMe"},
        "model_name": "Samsung SSD 980 PRO 1TB",
        "serial_number": "S5GXNX0R",
        "firmware_version": "5B2QGXA7",
        "smart_status": {"passed": true},
        "power_on_time": {"hours": 4000},
        "power_cycle_count": 300,
        "nvme_smart_health_information_log": {
            "critical_warning": 0,
            "temperature": 38,
            "available_spare": 100,
            "percentage_used": 81,
            "media_errors": 0,
            "num_err_log_entries": 2,
            "warning_temp_time": 0,
            "critical_comp_time": 0,
            "temperature_sensors": [38, 45]
        }
    }"#;

    #[test]
    fn ata_report_flags_raw_counts_and_low_scores() {
        let report = DriveReport::parse("/dev/sda", ATA_JSON).unwrap();
        assert_eq!(report.interface(), Interface::Ata);
        assert_eq!(report.identity.model.as_deref(), Some("ST2000DM008"));
        assert_eq!(report.power_on_years(), Some(2.0));

        let ids: Vec<u32> = report
            .issues()
            .iter()
            .map(|i| match i {
                DriveIssue::Ata { id, .. } => *id,
                other => panic!("unexpected issue {other:?}"),
            })
            .collect();
        // 1 is not watched, 198 is healthy.
        assert_eq!(ids, vec![5, 197]);
    }

    #[test]
    fn nvme_report_checks_health_log_limits() {
        let report = DriveReport::parse("/dev/nvme0", NVME_JSON).unwrap();
        assert_eq!(report.interface(), Interface::Nvme);

        let mut names: Vec<String> = report
            .issues()
            .into_iter()
            .map(|i| match i {
                DriveIssue::Nvme { name, .. } => name,
                other => panic!("unexpected issue {other:?}"),
            })
            .collect();
        names.sort();
        assert_eq!(names, vec!["num_err_log_entries", "percentage_used"]);
    }

    #[test]
    fn failed_overall_status_is_an_issue() {
        let json = ATA_JSON.replace(r#""passed": true"#, r#""passed": false"#);
        let report = DriveReport::parse("/dev/sda", &json).unwrap();
        assert_eq!(report.issues().first(), Some(&DriveIssue::SmartFailed));
    }

    #[test]
    fn missing_protocol_is_an_error() {
        let err = DriveReport::parse("/dev/sdz", r#"{"device": {"name": "/dev/sdz"}}"#)
            .unwrap_err();
        assert!(format!("{err:#}").contains("/dev/sdz"));
        assert!(DriveReport::parse("/dev/sdz", "not json").is_err());
    }

    #[test]
    fn years_round_to_two_decimals() {
        assert_eq!(power_on_years(0), 0.0);
        assert_eq!(power_on_years(10_000), 1.14);
    }
}
