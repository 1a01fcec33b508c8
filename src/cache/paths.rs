//! Document path to short id mapping.
//!
//! Saved-document cache folders embed a short id derived from the document's
//! absolute path. The mapping is persisted so the sweeper can go back from a
//! folder name to the document it belongs to.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::fsops::absolute_path;
use crate::error::{CacheError, Result};

/// Bidirectional path ↔ short id lookup, partitioned by context id.
pub trait PathIds: Send + Sync {
    /// Short id for `path`, assigning and persisting one if needed.
    fn id_for_path(&self, path: &Path, context: &str) -> Result<String>;

    /// The id [`PathIds::id_for_path`] would return, without recording it.
    fn peek_id(&self, path: &Path, context: &str) -> Result<String>;

    /// Absolute document path recorded for `id`.
    fn path_for_id(&self, id: &str, context: &str) -> Result<PathBuf>;

    /// Drop the record for `id`. Unknown ids are ignored.
    fn forget(&self, id: &str, context: &str) -> Result<()>;
}

/// On-disk shape of the index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct IndexFile {
    /// context id -> short id -> absolute document path
    #[serde(default)]
    contexts: BTreeMap<String, BTreeMap<String, PathBuf>>,
}

/// [`PathIds`] persisted as a YAML file.
///
/// Several processes or contexts may share one file, so every write
/// re-reads it first and only changes the entry it is about.
#[derive(Debug)]
pub struct PathIndex {
    file: PathBuf,
    state: Mutex<IndexFile>,
}

impl PathIndex {
    /// Open the index stored at `file`, starting empty if it does not exist.
    pub fn open(file: impl Into<PathBuf>) -> Result<Self> {
        let file = file.into();
        let state = read_index(&file)?;
        Ok(Self {
            file,
            state: Mutex::new(state),
        })
    }

    /// Location of the index file.
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Number of ids recorded for `context`.
    pub fn len(&self, context: &str) -> usize {
        self.lock().contexts.get(context).map_or(0, BTreeMap::len)
    }

    fn lock(&self) -> MutexGuard<'_, IndexFile> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace `state` with what is on disk now.
    fn refresh(&self, state: &mut IndexFile) -> Result<()> {
        *state = read_index(&self.file)?;
        Ok(())
    }

    /// Write-to-temp-then-rename so a crash never leaves a torn index.
    fn save(&self, state: &IndexFile) -> Result<()> {
        if let Some(parent) = self.file.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(state).map_err(|e| {
            CacheError::ConfigValidationError {
                message: format!("Failed to serialize path index: {}", e),
            }
        })?;

        let temp_path = self.file.with_extension("yml.tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, &self.file)?;
        Ok(())
    }
}

impl PathIds for PathIndex {
    fn id_for_path(&self, path: &Path, context: &str) -> Result<String> {
        let absolute = absolute_path(path);
        let unresolved = |e: CacheError| CacheError::PathIdUnresolved {
            path: absolute.clone(),
            message: e.to_string(),
        };
        let mut state = self.lock();

        if let Some(id) = recorded_id(&state, context, &absolute) {
            return Ok(id);
        }
        self.refresh(&mut state).map_err(unresolved)?;

        let ids = state.contexts.entry(context.to_string()).or_default();
        let (id, fresh) = resolve(ids, &absolute);
        if !fresh {
            return Ok(id);
        }

        ids.insert(id.clone(), absolute.clone());
        self.save(&state).map_err(unresolved)?;
        tracing::debug!("Assigned short id {} in context {}", id, context);
        Ok(id)
    }

    fn peek_id(&self, path: &Path, context: &str) -> Result<String> {
        let absolute = absolute_path(path);
        let mut state = self.lock();

        if recorded_id(&state, context, &absolute).is_none() {
            if let Err(e) = self.refresh(&mut state) {
                tracing::debug!("Cannot reload path index {:?}: {}", self.file, e);
            }
        }

        let empty = BTreeMap::new();
        let ids = state.contexts.get(context).unwrap_or(&empty);
        Ok(resolve(ids, &absolute).0)
    }

    fn path_for_id(&self, id: &str, context: &str) -> Result<PathBuf> {
        let mut state = self.lock();

        if let Some(path) = recorded_path(&state, id, context) {
            return Ok(path);
        }
        self.refresh(&mut state)?;

        recorded_path(&state, id, context).ok_or_else(|| CacheError::ShortIdUnknown {
            id: id.to_string(),
            context: context.to_string(),
        })
    }

    fn forget(&self, id: &str, context: &str) -> Result<()> {
        let mut state = self.lock();
        self.refresh(&mut state)?;

        let removed = state
            .contexts
            .get_mut(context)
            .and_then(|ids| ids.remove(id))
            .is_some();
        if removed {
            self.save(&state)?;
            tracing::debug!("Forgot short id {} in context {}", id, context);
        }
        Ok(())
    }
}

/// Parse the index at `file`. A missing or empty file is an empty index.
fn read_index(file: &Path) -> Result<IndexFile> {
    let content = match fs::read_to_string(file) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(IndexFile::default()),
        Err(e) => return Err(e.into()),
    };
    if content.trim().is_empty() {
        return Ok(IndexFile::default());
    }

    serde_yaml::from_str(&content).map_err(|e| CacheError::ConfigParseError {
        path: file.to_path_buf(),
        message: e.to_string(),
    })
}

fn recorded_id(state: &IndexFile, context: &str, path: &Path) -> Option<String> {
    state
        .contexts
        .get(context)?
        .iter()
        .find(|(_, p)| p.as_path() == path)
        .map(|(id, _)| id.clone())
}

fn recorded_path(state: &IndexFile, id: &str, context: &str) -> Option<PathBuf> {
    state.contexts.get(context)?.get(id).cloned()
}

/// Existing id for `path`, or the first free candidate. The flag is true
/// when the id is not yet recorded.
fn resolve(ids: &BTreeMap<String, PathBuf>, path: &Path) -> (String, bool) {
    if let Some((id, _)) = ids.iter().find(|(_, p)| p.as_path() == path) {
        return (id.clone(), false);
    }

    let mut salt = 0u32;
    loop {
        let candidate = short_id(path, salt);
        if !ids.contains_key(&candidate) {
            return (candidate, true);
        }
        salt += 1;
    }
}

/// 8 hex chars (4 bytes of SHA256) over the path, plus a salt on collision.
fn short_id(path: &Path, salt: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    if salt > 0 {
        hasher.update(salt.to_le_bytes());
    }
    let result = hasher.finalize();
    hex::encode(&result[..4])
}
