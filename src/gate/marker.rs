// src/gate/marker.rs

//! Persisted "last successful run" markers.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone};
use tracing::info;

use crate::errors::{AutosweepError, Result};
use crate::fs::FileSystem;

/// When a gated task's guarded action last fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunMarker {
    pub last_run: DateTime<Local>,
}

impl RunMarker {
    pub fn new(last_run: DateTime<Local>) -> Self {
        Self { last_run }
    }

    /// Parse marker text: RFC 3339, or a legacy UNIX timestamp in
    /// (fractional) seconds.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();

        if let Ok(t) = DateTime::parse_from_rfc3339(text) {
            return Ok(Self::new(t.with_timezone(&Local)));
        }

        if let Ok(secs) = text.parse::<f64>() {
            if secs.is_finite() && secs >= 0.0 {
                let whole = secs.trunc() as i64;
                let nanos = ((secs - secs.trunc()) * 1e9) as u32;
                if let Some(t) = Local.timestamp_opt(whole, nanos).single() {
                    return Ok(Self::new(t));
                }
            }
        }

        Err(AutosweepError::MarkerError(format!(
            "unrecognised marker contents: {text:?}"
        )))
    }

    pub fn render(&self) -> String {
        format!("{}\n", self.last_run.to_rfc3339())
    }
}

/// Abstract storage for run markers, keyed by task name.
pub trait MarkerStore: Send + Sync {
    fn load(&self, task: &str) -> Result<Option<RunMarker>>;
    fn save(&mut self, task: &str, marker: &RunMarker) -> Result<()>;
}

/// Stores one marker file per task: `<dir>/<task>_last_exe_time.txt`.
#[derive(Debug, Clone)]
pub struct FileMarkerStore {
    fs: Arc<dyn FileSystem>,
    dir: PathBuf,
}

impl FileMarkerStore {
    pub fn new(fs: Arc<dyn FileSystem>, dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            dir: dir.into(),
        }
    }

    pub fn marker_path(&self, task: &str) -> PathBuf {
        marker_path(&self.dir, task)
    }
}

pub fn marker_path(dir: &Path, task: &str) -> PathBuf {
    dir.join(format!("{task}_last_exe_time.txt"))
}

impl MarkerStore for FileMarkerStore {
    fn load(&self, task: &str) -> Result<Option<RunMarker>> {
        let path = self.marker_path(task);
        if !self.fs.exists(&path) {
            return Ok(None);
        }
        let text = self.fs.read_to_string(&path)?;
        RunMarker::parse(&text).map(Some)
    }

    fn save(&mut self, task: &str, marker: &RunMarker) -> Result<()> {
        let path = self.marker_path(task);
        self.fs.write(&path, marker.render().as_bytes())?;
        info!(task = %task, last_run = %marker.last_run, "stored run marker (file)");
        Ok(())
    }
}

/// Stores markers in memory only (lost on restart).
#[derive(Debug, Default)]
pub struct MemoryMarkerStore {
    map: HashMap<String, RunMarker>,
}

impl MemoryMarkerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MarkerStore for MemoryMarkerStore {
    fn load(&self, task: &str) -> Result<Option<RunMarker>> {
        Ok(self.map.get(task).copied())
    }

    fn save(&mut self, task: &str, marker: &RunMarker) -> Result<()> {
        self.map.insert(task.to_string(), *marker);
        info!(task = %task, last_run = %marker.last_run, "stored run marker (memory)");
        Ok(())
    }
}
