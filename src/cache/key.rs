//! Cache folder identity.
//!
//! A document's cache lives in one of two places:
//!
//! - unsaved documents: `{unsaved_root}/{document_id}/{version}`; the folder
//!   does not depend on any path
//! - saved documents: `{cache_root}/{context}-{short_id}-{stem}/{version}`;
//!   the folder moves whenever the document's path does
//!
//! The file stem may itself contain the delimiter, so parsing splits off the
//! first two fields and keeps the remainder intact.

use std::fmt;
use std::path::{Path, PathBuf};

use super::paths::PathIds;
use super::version::versioned;
use crate::error::{CacheError, Result};
use crate::host::DocumentId;

/// Separator between the fields of a saved-document folder name.
pub const DELIMITER: char = '-';

/// Marker file inside the version folder. Its modification time is when the
/// cache content last meaningfully changed.
pub const CHUNK_DEFS_FILENAME: &str = "chunks.json";

/// Parsed name of a saved-document cache folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FolderName {
    pub context: String,
    pub short_id: String,
    pub stem: String,
}

impl FolderName {
    /// Parse a folder base name. Returns `None` for anything that is not a
    /// saved-document cache folder.
    pub fn parse(name: &str) -> Option<Self> {
        let mut parts = name.splitn(3, DELIMITER);
        let context = parts.next()?;
        let short_id = parts.next()?;
        let stem = parts.next()?;

        if context.is_empty() || short_id.is_empty() || stem.is_empty() {
            return None;
        }

        Some(Self {
            context: context.to_string(),
            short_id: short_id.to_string(),
            stem: stem.to_string(),
        })
    }
}

impl fmt::Display for FolderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}{}",
            self.context, DELIMITER, self.short_id, DELIMITER, self.stem
        )
    }
}

/// Which folder scheme a document's cache uses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Unsaved(DocumentId),
    Saved(FolderName),
}

/// Check that a context id can be embedded in a folder name.
pub fn validate_context_id(context: &str) -> Result<()> {
    if context.is_empty() {
        return Err(CacheError::ConfigValidationError {
            message: "context_id must not be empty".to_string(),
        });
    }
    if context.contains(DELIMITER) || context.contains(['/', '\\']) {
        return Err(CacheError::ConfigValidationError {
            message: format!(
                "context_id '{}' must not contain '{}' or path separators",
                context, DELIMITER
            ),
        });
    }
    Ok(())
}

/// The two roots cache folders live under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    cache_root: PathBuf,
    unsaved_root: PathBuf,
}

impl CacheLayout {
    pub fn new(cache_root: impl Into<PathBuf>, unsaved_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            unsaved_root: unsaved_root.into(),
        }
    }

    /// Root holding saved-document caches.
    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// Root holding unsaved-document caches.
    pub fn unsaved_root(&self) -> &Path {
        &self.unsaved_root
    }

    /// Key for a document, assigning a short id if the path has none yet.
    pub fn key_for(
        &self,
        path: Option<&Path>,
        document: &DocumentId,
        context: &str,
        ids: &dyn PathIds,
    ) -> Result<CacheKey> {
        match path {
            None => Ok(CacheKey::Unsaved(document.clone())),
            Some(path) => {
                let short_id = ids.id_for_path(path, context)?;
                saved_key(path, short_id, context)
            }
        }
    }

    /// Like [`CacheLayout::key_for`] but never records a new short id.
    pub fn peek_key_for(
        &self,
        path: Option<&Path>,
        document: &DocumentId,
        context: &str,
        ids: &dyn PathIds,
    ) -> Result<CacheKey> {
        match path {
            None => Ok(CacheKey::Unsaved(document.clone())),
            Some(path) => {
                let short_id = ids.peek_id(path, context)?;
                saved_key(path, short_id, context)
            }
        }
    }

    /// Folder holding every version of a key's cache.
    pub fn key_root(&self, key: &CacheKey) -> PathBuf {
        match key {
            CacheKey::Unsaved(document) => self.unsaved_root.join(document.as_str()),
            CacheKey::Saved(name) => self.cache_root.join(name.to_string()),
        }
    }

    /// Current-version cache folder for a key.
    pub fn folder(&self, key: &CacheKey) -> PathBuf {
        versioned(&self.key_root(key))
    }

    /// Chunk definitions marker for a key.
    pub fn chunk_definitions_path(&self, key: &CacheKey) -> PathBuf {
        self.folder(key).join(CHUNK_DEFS_FILENAME)
    }

    /// Current-version cache folder for a document.
    pub fn folder_for(
        &self,
        path: Option<&Path>,
        document: &DocumentId,
        context: &str,
        ids: &dyn PathIds,
    ) -> Result<PathBuf> {
        Ok(self.folder(&self.key_for(path, document, context, ids)?))
    }
}

fn saved_key(path: &Path, short_id: String, context: &str) -> Result<CacheKey> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| CacheError::PathIdUnresolved {
            path: path.to_path_buf(),
            message: "path has no file name".to_string(),
        })?;

    Ok(CacheKey::Saved(FolderName {
        context: context.to_string(),
        short_id,
        stem,
    }))
}
