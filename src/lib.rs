//! nbcache - On-disk chunk output cache for notebook documents.
//!
//! Notebook documents keep computed chunk output in per-document cache
//! folders. nbcache decides where those folders live, keeps them in step as
//! documents are opened, saved under a new name and closed, and periodically
//! evicts caches nobody has touched in a while.
//!
//! # Modules
//!
//! - [`cache`] - Cache keys, lifecycle synchronization and retention sweeps
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Error types and result aliases
//! - [`host`] - Seams to the editor: documents, events, archive parsing
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use nbcache::cache::{Collaborators, NotebookCache, PathIndex};
//! use nbcache::config::CacheConfig;
//! use nbcache::host::{DocumentId, InMemoryRegistry};
//!
//! let temp = tempfile::TempDir::new().unwrap();
//! let config = CacheConfig::with_base(temp.path());
//! let collaborators = Collaborators {
//!     registry: Arc::new(InMemoryRegistry::new()),
//!     parser: Arc::new(|_: &Path, folder: &Path| -> nbcache::Result<()> {
//!         std::fs::create_dir_all(folder)?;
//!         Ok(())
//!     }),
//!     ids: Arc::new(PathIndex::open(temp.path().join("paths.yml")).unwrap()),
//! };
//!
//! let cache = NotebookCache::new(&config, collaborators).unwrap();
//! let folder = cache
//!     .chunk_cache_folder(None, &DocumentId::from("untitled-1"))
//!     .unwrap();
//! assert!(folder.starts_with(temp.path().join("unsaved-notebooks")));
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod host;

pub use error::{CacheError, Result};
