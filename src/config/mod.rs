//! Cache configuration.
//!
//! Configuration is a small YAML document. Every field has a default, so an
//! empty file (or no file at all) is a valid configuration:
//!
//! ```yaml
//! cache_root: /var/cache/nbcache/notebooks
//! context_id: 3f9a1c
//! document_extensions: [Rmd]
//! archive_extension: Rnb
//! stale_after: 2d
//! sweep_delay: 30s
//! sweep_interval: 1h
//! eviction: delete
//! parser_command: [rnb-unpack, "{archive}", "{folder}"]
//! ```

pub mod duration;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cache::format::NotebookFormat;
use crate::cache::key::{validate_context_id, CacheLayout};
use crate::cache::sweeper::{EvictionMode, SweepPolicy, SweepSchedule};
use crate::error::{CacheError, Result};

pub use duration::{format_duration, parse_duration};
pub use loader::{load_config, ConfigPaths};

/// Context id used when none is configured.
pub const DEFAULT_CONTEXT_ID: &str = "default";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Root of saved-document caches.
    pub cache_root: PathBuf,
    /// Root of unsaved-document caches.
    pub unsaved_root: PathBuf,
    /// Editing context these caches belong to.
    pub context_id: String,
    /// Extensions of documents that get a cache.
    pub document_extensions: Vec<String>,
    /// Extension of the saved notebook bundle beside a document.
    pub archive_extension: String,
    /// How long a closed document's cache may sit unchanged.
    pub stale_after: String,
    /// Delay before the first background sweep.
    pub sweep_delay: String,
    /// Time between background sweeps.
    pub sweep_interval: String,
    /// What a sweep does with stale caches.
    pub eviction: EvictionMode,
    /// Program used to rehydrate archives.
    pub parser_command: Option<Vec<String>>,
    /// Path index location; defaults to a file beside `cache_root`.
    pub path_index: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let base = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("nbcache");

        Self {
            cache_root: base.join("notebooks"),
            unsaved_root: base.join("unsaved-notebooks"),
            context_id: DEFAULT_CONTEXT_ID.to_string(),
            document_extensions: vec!["Rmd".to_string()],
            archive_extension: "Rnb".to_string(),
            stale_after: "2d".to_string(),
            sweep_delay: "30s".to_string(),
            sweep_interval: "1h".to_string(),
            eviction: EvictionMode::Delete,
            parser_command: None,
            path_index: None,
        }
    }
}

impl CacheConfig {
    /// Configuration rooted at `base`, otherwise default.
    pub fn with_base(base: &Path) -> Self {
        Self {
            cache_root: base.join("notebooks"),
            unsaved_root: base.join("unsaved-notebooks"),
            ..Self::default()
        }
    }

    /// Check every field that can be invalid.
    pub fn validate(&self) -> Result<()> {
        validate_context_id(&self.context_id)?;

        if self.document_extensions.is_empty() {
            return Err(CacheError::ConfigValidationError {
                message: "document_extensions must list at least one extension".to_string(),
            });
        }
        if self.archive_extension.trim_start_matches('.').is_empty() {
            return Err(CacheError::ConfigValidationError {
                message: "archive_extension must not be empty".to_string(),
            });
        }

        self.sweep_policy()?;
        self.sweep_schedule()?;
        Ok(())
    }

    /// Folder layout.
    pub fn layout(&self) -> CacheLayout {
        CacheLayout::new(&self.cache_root, &self.unsaved_root)
    }

    /// Document and archive extensions.
    pub fn format(&self) -> NotebookFormat {
        NotebookFormat::new(&self.document_extensions, &self.archive_extension)
    }

    /// Where the path index lives.
    pub fn path_index_file(&self) -> PathBuf {
        match &self.path_index {
            Some(path) => path.clone(),
            None => self
                .cache_root
                .parent()
                .unwrap_or(&self.cache_root)
                .join("notebook-paths.yml"),
        }
    }

    /// Staleness and eviction settings.
    pub fn sweep_policy(&self) -> Result<SweepPolicy> {
        Ok(SweepPolicy {
            stale_after: field_duration("stale_after", &self.stale_after)?,
            eviction: self.eviction,
        })
    }

    /// Background sweep timing.
    pub fn sweep_schedule(&self) -> Result<SweepSchedule> {
        let interval = field_duration("sweep_interval", &self.sweep_interval)?;
        if interval.is_zero() {
            return Err(CacheError::ConfigValidationError {
                message: "sweep_interval must be greater than zero".to_string(),
            });
        }
        Ok(SweepSchedule {
            initial_delay: duration::to_std(field_duration("sweep_delay", &self.sweep_delay)?),
            interval: duration::to_std(interval),
        })
    }
}

fn field_duration(field: &str, value: &str) -> Result<chrono::Duration> {
    parse_duration(value).map_err(|e| CacheError::ConfigValidationError {
        message: format!("{} '{}': {}", field, value, e),
    })
}
