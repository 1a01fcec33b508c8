//! In-memory document registry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::{DocumentId, DocumentRef, DocumentRegistry};
use crate::cache::fsops::absolute_path;
use crate::error::{CacheError, Result};

/// [`DocumentRegistry`] holding the open documents in a map.
///
/// Paths are compared in absolute form, so `is_open` matches regardless of
/// how the caller spelled the path.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    documents: Mutex<HashMap<DocumentId, Option<PathBuf>>>,
}

impl InMemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry where each of `paths` is an open, saved document.
    ///
    /// Ids are synthesized from the position in the list.
    pub fn with_open_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let registry = Self::new();
        for (i, path) in paths.into_iter().enumerate() {
            registry.open(DocumentRef::saved(format!("open-{}", i), path));
        }
        registry
    }

    /// Record a document as open.
    pub fn open(&self, document: DocumentRef) {
        self.lock().insert(document.id, document.path);
    }

    /// Forget a document. Returns its last path if it was open.
    pub fn close(&self, id: &DocumentId) -> Option<Option<PathBuf>> {
        self.lock().remove(id)
    }

    /// Point an open document at a new path.
    pub fn rename(&self, id: &DocumentId, path: impl Into<PathBuf>) -> Result<()> {
        match self.lock().get_mut(id) {
            Some(slot) => {
                *slot = Some(path.into());
                Ok(())
            }
            None => Err(CacheError::DocumentNotFound { id: id.to_string() }),
        }
    }

    /// Number of open documents.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if no documents are open.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<DocumentId, Option<PathBuf>>> {
        self.documents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DocumentRegistry for InMemoryRegistry {
    fn path_of(&self, id: &DocumentId) -> Result<Option<PathBuf>> {
        self.lock()
            .get(id)
            .cloned()
            .ok_or_else(|| CacheError::DocumentNotFound { id: id.to_string() })
    }

    fn is_open(&self, path: &Path) -> bool {
        let wanted = absolute_path(path);
        self.lock()
            .values()
            .flatten()
            .any(|open| absolute_path(open) == wanted)
    }
}
