use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;

use autosweep::drives::probe::{DriveProbe, ProbeFuture};
use autosweep::notify::{Notification, Notifier};

/// smartctl JSON for an ATA drive; `attributes` are `(id, name, value, raw)`.
pub fn ata_json(path: &str, passed: bool, attributes: &[(u32, &str, u32, u64)]) -> String {
    let table: Vec<_> = attributes
        .iter()
        .map(|(id, name, value, raw)| {
            json!({
                "id": id,
                "name": name,
                "value": value,
                "worst": value,
                "thresh": 10,
                "raw": { "value": raw, "string": raw.to_string() },
            })
        })
        .collect();

    json!({
        "device": { "name": path, "type": "sat", "protocol": "ATA" },
        "model_family": "Test Family",
        "model_name": "TESTDISK",
        "serial_number": format!("SN-{path}"),
        "firmware_version": "1.0",
        "smart_status": { "passed": passed },
        "power_on_time": { "hours": 8760 },
        "power_cycle_count": 42,
        "ata_smart_attributes": { "revision": 16, "table": table },
    })
    .to_string()
}

/// A healthy ATA drive.
pub fn healthy_ata_json(path: &str) -> String {
    ata_json(
        path,
        true,
        &[(5, "Reallocated_Sector_Ct", 100, 0), (197, "Current_Pending_Sector", 100, 0)],
    )
}

/// An ATA drive with reallocated sectors.
pub fn failing_ata_json(path: &str) -> String {
    ata_json(path, true, &[(5, "Reallocated_Sector_Ct", 100, 12)])
}

/// smartctl JSON for an NVMe drive with the given media error count.
pub fn nvme_json(path: &str, media_errors: u64) -> String {
    json!({
        "device": { "name": path, "type": "nvme", "protocol": "NVMe" },
        "model_name": "TEST NVME",
        "serial_number": format!("SN-{path}"),
        "firmware_version": "2.0",
        "smart_status": { "passed": true },
        "power_on_time": { "hours": 100 },
        "power_cycle_count": 7,
        "nvme_smart_health_information_log": {
            "critical_warning": 0,
            "temperature": 35,
            "available_spare": 100,
            "percentage_used": 2,
            "media_errors": media_errors,
            "num_err_log_entries": 0,
            "warning_temp_time": 0,
            "critical_comp_time": 0,
        },
    })
    .to_string()
}

/// Drive probe serving canned smartctl JSON.
///
/// Clones share call counters and failure switches, so a test can keep one
/// handle while the checker owns another.
#[derive(Clone, Default)]
pub struct FakeProbe {
    drives: Arc<Vec<(String, String)>>,
    scans: Arc<AtomicUsize>,
    queries: Arc<AtomicUsize>,
    fail_scan: Arc<AtomicBool>,
    fail_queries: Arc<Mutex<HashMap<String, String>>>,
}

impl FakeProbe {
    /// `drives` are `(path, smartctl JSON)` in scan order.
    pub fn new(drives: Vec<(String, String)>) -> Self {
        Self {
            drives: Arc::new(drives),
            ..Self::default()
        }
    }

    pub fn scans(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn set_fail_scan(&self, fail: bool) {
        self.fail_scan.store(fail, Ordering::SeqCst);
    }

    pub fn fail_query(&self, path: &str, message: &str) {
        self.fail_queries
            .lock()
            .unwrap()
            .insert(path.to_string(), message.to_string());
    }
}

impl DriveProbe for FakeProbe {
    fn scan(&self) -> ProbeFuture<'_, Vec<String>> {
        Box::pin(async move {
            self.scans.fetch_add(1, Ordering::SeqCst);
            if self.fail_scan.load(Ordering::SeqCst) {
                anyhow::bail!("smartctl: command not found");
            }
            Ok(self.drives.iter().map(|(path, _)| path.clone()).collect())
        })
    }

    fn query<'a>(&'a self, path: &'a str) -> ProbeFuture<'a, String> {
        Box::pin(async move {
            self.queries.fetch_add(1, Ordering::SeqCst);
            let failure = self.fail_queries.lock().unwrap().get(path).cloned();
            if let Some(message) = failure {
                anyhow::bail!("{message}");
            }
            self.drives
                .iter()
                .find(|(p, _)| p == path)
                .map(|(_, json)| json.clone())
                .ok_or_else(|| anyhow::anyhow!("no such drive {path}"))
        })
    }
}

/// Notifier that keeps every notification it was asked to send.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the notification, then report a delivery failure.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn send<'a>(
        &'a self,
        notification: &'a Notification,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.sent.lock().unwrap().push(notification.clone());
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("mail relay unreachable");
            }
            Ok(())
        })
    }
}
