//! Filesystem primitives used by the cache.
//!
//! Every mutation here is idempotent on its own (remove-if-exists,
//! create-if-absent), which is what lets the synchronizer and the sweeper
//! share the cache root without a lock.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use walkdir::WalkDir;

/// Absolute, canonical form of `path`.
///
/// Paths that no longer exist (the old side of a rename) are resolved through
/// their parent so they still agree with the canonical form recorded while
/// they existed.
pub fn absolute_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }

    if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
        if let Ok(parent) = parent.canonicalize() {
            return parent.join(name);
        }
    }

    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Modification time of `path`.
pub fn last_write_time(path: &Path) -> io::Result<DateTime<Utc>> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(DateTime::<Utc>::from(modified))
}

/// Rename `from` to `to`, creating `to`'s parent first.
pub fn move_dir(from: &Path, to: &Path) -> io::Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::rename(from, to)
}

/// Copy the tree under `from` to `to`, keeping file modification times.
///
/// Returns the number of files copied.
pub fn copy_dir_recursive(from: &Path, to: &Path) -> io::Result<usize> {
    let mut copied = 0;

    for entry in WalkDir::new(from) {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }

        fs::copy(entry.path(), &target)?;
        let modified = fs::metadata(entry.path())?.modified()?;
        File::options()
            .write(true)
            .open(&target)?
            .set_modified(modified)?;
        copied += 1;
    }

    Ok(copied)
}

/// Remove a directory tree. Returns false if it did not exist.
pub fn remove_dir_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Remove `path` only if it is an empty directory.
pub fn remove_empty_dir(path: &Path) -> bool {
    fs::remove_dir(path).is_ok()
}
