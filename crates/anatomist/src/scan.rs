//! # Source Discovery
//!
//! Walks input paths for `.py` files and loads them. Unreadable files are
//! reported alongside the loaded sources instead of failing the whole scan.

use crate::path_util::display_path;
use crate::SourceFile;
use common::AnalysisError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const DEFAULT_EXCLUDES: &[&str] = &[
    "__pycache__",
    ".git",
    "venv",
    ".venv",
    "node_modules",
    "build",
    "dist",
    ".tox",
    ".mypy_cache",
    ".pytest_cache",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// Directory names skipped during the walk.
    pub exclude: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            exclude: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ScanOptions {
    fn is_excluded(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|s| s.to_str())
            .is_some_and(|name| self.exclude.iter().any(|e| e == name))
    }
}

/// Sources that loaded plus the ones that did not.
#[derive(Debug, Default)]
pub struct LoadedSources {
    pub sources: Vec<SourceFile>,
    pub failures: Vec<(String, AnalysisError)>,
}

/// All `.py` files under `root`, sorted. A file root is returned as is.
pub fn discover(root: &Path, options: &ScanOptions) -> Result<Vec<PathBuf>, AnalysisError> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !options.is_excluded(e.path()))
    {
        let entry = entry.map_err(|e| AnalysisError::Io(e.into()))?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().and_then(|s| s.to_str()) == Some("py") {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

/// Discovers and loads every source under `roots`.
///
/// Module names are relative to the root a file was found under (the parent
/// directory for file roots). A file reachable from two roots is loaded once.
///
/// # Errors
/// Only walk failures (missing root, unreadable directory) are fatal.
pub fn load_sources(roots: &[PathBuf], options: &ScanOptions) -> Result<LoadedSources, AnalysisError> {
    let mut loaded = LoadedSources::default();
    let mut seen = BTreeSet::new();

    for root in roots {
        if !root.exists() {
            return Err(AnalysisError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", root.display()),
            )));
        }
        let module_root = if root.is_file() {
            root.parent().unwrap_or_else(|| Path::new("")).to_path_buf()
        } else {
            root.clone()
        };

        for path in discover(root, options)? {
            let key = display_path(&path);
            if !seen.insert(key.clone()) {
                continue;
            }
            match SourceFile::load(&path, &module_root) {
                Ok(source) => loaded.sources.push(source),
                Err(err) => {
                    tracing::warn!(path = %key, error = %err, "failed to load source");
                    loaded.failures.push((key, err));
                }
            }
        }
    }

    loaded.sources.sort_by(|a, b| a.path.cmp(&b.path));
    tracing::info!(
        files = loaded.sources.len(),
        failures = loaded.failures.len(),
        "sources loaded"
    );
    Ok(loaded)
}
