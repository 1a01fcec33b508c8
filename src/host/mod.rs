//! Seams to the host editor.
//!
//! The cache never owns documents. It reads them through a
//! [`DocumentRegistry`], rehydrates folders through an [`ArchiveParser`],
//! and learns about lifecycle changes by subscribing to [`DocumentEvents`].
//! Everything here is injected, so the cache can be driven by fakes in tests.

pub mod bus;
pub mod command;
pub mod memory;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use bus::{EventBus, SubscriptionId};
pub use command::CommandParser;
pub use memory::InMemoryRegistry;

/// Opaque document identifier, stable across renames within one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Wrap a raw identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A document as the registry currently sees it.
///
/// `path` is `None` while the document has never been saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub id: DocumentId,
    pub path: Option<PathBuf>,
}

impl DocumentRef {
    /// A document that has been saved to `path`.
    pub fn saved(id: impl Into<DocumentId>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: Some(path.into()),
        }
    }

    /// A document that has no file yet.
    pub fn unsaved(id: impl Into<DocumentId>) -> Self {
        Self {
            id: id.into(),
            path: None,
        }
    }
}

/// Lifecycle notifications fired by the host's document registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    /// A document was opened or created.
    Added { id: DocumentId },
    /// A document was closed. `path` is its path at close time.
    Removed {
        id: DocumentId,
        path: Option<PathBuf>,
    },
    /// A document's path changed; `document` carries the new path.
    Renamed {
        old_path: Option<PathBuf>,
        document: DocumentRef,
    },
}

/// Read access to the set of open documents.
pub trait DocumentRegistry: Send + Sync {
    /// Current path of an open document; `Ok(None)` when it is unsaved.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CacheError::DocumentNotFound`] if the id is unknown.
    fn path_of(&self, id: &DocumentId) -> Result<Option<PathBuf>>;

    /// Whether some open document lives at `path`.
    fn is_open(&self, path: &Path) -> bool;
}

/// Rehydrates a saved notebook bundle into a cache folder.
pub trait ArchiveParser: Send + Sync {
    /// Populate `folder` from `archive`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CacheError::Populate`] when the archive cannot be read.
    fn populate(&self, archive: &Path, folder: &Path) -> Result<()>;
}

impl<F> ArchiveParser for F
where
    F: Fn(&Path, &Path) -> Result<()> + Send + Sync,
{
    fn populate(&self, archive: &Path, folder: &Path) -> Result<()> {
        self(archive, folder)
    }
}

/// Receives document lifecycle notifications.
pub trait DocumentEventHandler: Send + Sync {
    fn handle(&self, event: &DocumentEvent) -> Result<()>;
}

/// Something the cache can subscribe to for lifecycle notifications.
pub trait DocumentEvents {
    /// Register `handler` for all future events.
    fn subscribe(&self, handler: Arc<dyn DocumentEventHandler>) -> Result<SubscriptionId>;
}
