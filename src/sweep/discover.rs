// src/sweep/discover.rs

//! Script discovery: which files in the scripts folder get run, and in what
//! order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, trace};

use crate::config::ConfigFile;
use crate::errors::{AutosweepError, Result};
use crate::fs::FileSystem;

/// One runnable script found during a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptEntry {
    pub path: PathBuf,
    /// File name, used as the script's identifier in logs.
    pub name: String,
    /// Interpreter command for the script's extension, if one is configured.
    pub interpreter: Option<String>,
}

/// The "is this a script?" predicate.
///
/// A path qualifies when:
/// - it is a regular file whose name does not start with `.`,
/// - its lower-cased extension is listed (`""` admits extension-less files),
/// - its file name matches none of the skip globs,
/// - an interpreter is configured for the extension, or the file is
///   executable.
#[derive(Debug, Clone)]
pub struct DiscoveryRules {
    extensions: Vec<String>,
    skip: GlobSet,
    interpreters: BTreeMap<String, String>,
}

impl DiscoveryRules {
    pub fn new(
        extensions: &[String],
        skip_patterns: &[String],
        interpreters: &BTreeMap<String, String>,
    ) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in skip_patterns {
            let glob = Glob::new(pattern).map_err(|e| {
                AutosweepError::ConfigError(format!("invalid skip pattern '{pattern}': {e}"))
            })?;
            builder.add(glob);
        }
        let skip = builder
            .build()
            .map_err(|e| AutosweepError::ConfigError(format!("building skip set: {e}")))?;

        Ok(Self {
            extensions: extensions.iter().map(|e| e.to_lowercase()).collect(),
            skip,
            interpreters: interpreters.clone(),
        })
    }

    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        Self::new(&cfg.sweep.extensions, &cfg.sweep.skip, &cfg.interpreter)
    }

    /// Apply the predicate to one path; `Some` when it is a script.
    pub fn classify(&self, fs: &dyn FileSystem, path: &Path) -> Option<ScriptEntry> {
        let name = path.file_name()?.to_str()?;

        if name.starts_with('.') || !fs.is_file(path) {
            return None;
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        if !self.extensions.contains(&extension) {
            trace!(file = %name, "extension not recognised");
            return None;
        }

        if self.skip.is_match(name) {
            debug!(file = %name, "skipped by skip pattern");
            return None;
        }

        let interpreter = self.interpreters.get(&extension).cloned();
        if interpreter.is_none() && !fs.is_executable(path) {
            debug!(file = %name, "no interpreter configured and not executable; ignoring");
            return None;
        }

        Some(ScriptEntry {
            path: path.to_path_buf(),
            name: name.to_string(),
            interpreter,
        })
    }
}

/// List the scripts in `folder` (non-recursive).
///
/// Ordered by case-insensitive file name, ties broken by the exact name, so
/// an unchanged folder always yields the same sequence.
pub fn discover(
    fs: &dyn FileSystem,
    folder: &Path,
    rules: &DiscoveryRules,
) -> Result<Vec<ScriptEntry>> {
    if !fs.is_dir(folder) {
        return Err(AutosweepError::ScriptsDirNotFound(folder.to_path_buf()));
    }

    let mut entries: Vec<ScriptEntry> = fs
        .read_dir(folder)?
        .iter()
        .filter_map(|path| rules.classify(fs, path))
        .collect();

    entries.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });

    Ok(entries)
}
