//! Cache format versioning.
//!
//! Every key folder holds its content under a version subdirectory. Only
//! [`CACHE_VERSION`] is ever read; any sibling with another name is a cache
//! written by an incompatible layout and may be discarded.

use std::fs;
use std::path::{Path, PathBuf};

use super::fsops::remove_dir_if_exists;

/// Current cache format tag. Bump on breaking changes to the cache layout.
pub const CACHE_VERSION: &str = "1";

/// `root/CACHE_VERSION`.
pub fn versioned(root: &Path) -> PathBuf {
    root.join(CACHE_VERSION)
}

/// Whether `child` is a directory written under a different cache version.
pub fn is_foreign_version(child: &Path) -> bool {
    child.is_dir()
        && child
            .file_name()
            .is_some_and(|name| name != CACHE_VERSION)
}

/// Result of purging foreign versions from one key folder.
#[derive(Debug, Default)]
pub struct PurgeReport {
    /// Version folders that were removed.
    pub removed: Vec<PathBuf>,
    /// Folders that could not be removed, with the reason.
    pub errors: Vec<(PathBuf, String)>,
}

/// Remove every foreign-version directory directly under `root`.
///
/// Best-effort: individual failures are logged and collected, never raised.
pub fn purge_foreign_versions(root: &Path) -> PurgeReport {
    let mut report = PurgeReport::default();

    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!("Skipping version purge of {:?}: {}", root, e);
            return report;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !is_foreign_version(&path) {
            continue;
        }
        match remove_dir_if_exists(&path) {
            Ok(_) => {
                tracing::debug!("Removed foreign cache version {:?}", path);
                report.removed.push(path);
            }
            Err(e) => {
                tracing::warn!("Failed to remove foreign cache version {:?}: {}", path, e);
                report.errors.push((path, e.to_string()));
            }
        }
    }

    report
}
