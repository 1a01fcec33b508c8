//! Notebook chunk cache lifecycle.
//!
//! Cache folders hold computed chunk output for notebook documents. This
//! module keeps those folders consistent with documents that are opened,
//! saved, renamed and closed elsewhere, and reclaims the ones nobody needs.
//!
//! - [`key`] - folder identity for saved and unsaved documents
//! - [`version`] - cache format versioning
//! - [`lifecycle`] - reacting to document events
//! - [`sweeper`] - periodic eviction of stale caches
//! - [`service`] - wiring and host entry points

pub mod format;
pub mod fsops;
pub mod key;
pub mod lifecycle;
pub mod paths;
pub mod service;
pub mod sweeper;
pub mod version;

pub use format::NotebookFormat;
pub use key::{CacheKey, CacheLayout, FolderName, CHUNK_DEFS_FILENAME};
pub use lifecycle::{
    AddOutcome, Collaborators, LifecycleSynchronizer, RemoveOutcome, RenameOutcome, RenameSkip,
};
pub use paths::{PathIds, PathIndex};
pub use service::{init_cache, NotebookCache};
pub use sweeper::{
    EvictionMode, FolderOutcome, RetentionSweeper, SweepPolicy, SweepReport, SweepSchedule,
    SweeperHandle,
};
pub use version::{is_foreign_version, purge_foreign_versions, versioned, CACHE_VERSION};
