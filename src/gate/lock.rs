// src/gate/lock.rs

//! Single-instance guard for a gated task.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::Result;
use chrono::Local;
use tracing::{debug, info, warn};

use crate::fs::FileSystem;

/// Lock file held for the lifetime of one invocation.
///
/// Created with create-new semantics; removed on drop. A lock older than the
/// configured staleness bound is assumed to belong to a crashed invocation
/// and is replaced.
#[derive(Debug)]
pub struct InstanceLock {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
}

impl InstanceLock {
    /// Try to take the lock at `path`.
    ///
    /// `Ok(None)` means another live invocation holds it.
    pub fn acquire(
        fs: Arc<dyn FileSystem>,
        path: impl Into<PathBuf>,
        stale_after: Duration,
    ) -> Result<Option<Self>> {
        let path = path.into();
        let contents = format!(
            "pid={}\nsince={}\n",
            std::process::id(),
            Local::now().to_rfc3339()
        );

        if fs.create_new(&path, contents.as_bytes())? {
            debug!(lock = ?path, "instance lock acquired");
            return Ok(Some(Self { fs, path }));
        }

        let age = fs
            .modified(&path)
            .ok()
            .and_then(|m| SystemTime::now().duration_since(m).ok());

        match age {
            Some(age) if age >= stale_after => {
                warn!(
                    lock = ?path,
                    age_secs = age.as_secs(),
                    "replacing stale instance lock"
                );
                fs.remove_file(&path)?;
                if fs.create_new(&path, contents.as_bytes())? {
                    return Ok(Some(Self { fs, path }));
                }
                info!(lock = ?path, "lost the race for a stale lock");
                Ok(None)
            }
            _ => {
                info!(lock = ?path, "another instance holds the lock");
                Ok(None)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if let Err(e) = self.fs.remove_file(&self.path) {
            warn!(lock = ?self.path, error = %e, "failed to release instance lock");
        }
    }
}
