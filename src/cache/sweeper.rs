//! Reclaims caches of documents that are closed and have not changed in a
//! while.
//!
//! Keeping a closed document's cache makes reopening it fast, but caches can
//! be large, so one that is unused past the staleness window is deleted.
//! A sweep only ever looks at folders of its own context, never deletes
//! when it cannot tell who owns a folder or how old it is, and keeps going
//! past any single folder that fails.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::fsops::{last_write_time, remove_dir_if_exists};
use super::key::{validate_context_id, FolderName, CHUNK_DEFS_FILENAME};
use super::paths::PathIds;
use super::version::versioned;
use crate::error::{CacheError, Result};
use crate::host::DocumentRegistry;

/// What to do with a folder that is old enough to evict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionMode {
    /// Delete it.
    #[default]
    Delete,
    /// Only report it.
    Report,
}

/// How old a cache must be, and what happens once it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepPolicy {
    pub stale_after: Duration,
    pub eviction: EvictionMode,
}

impl Default for SweepPolicy {
    fn default() -> Self {
        Self {
            stale_after: Duration::days(2),
            eviction: EvictionMode::Delete,
        }
    }
}

/// Decision taken for one cache folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FolderOutcome {
    /// Belongs to another editing context.
    OtherContext,
    /// The short id has no known document path.
    Unresolved { error: String },
    /// The document is open.
    Open { document: PathBuf },
    /// No chunk definitions marker to judge age by.
    NoMarker,
    /// Younger than the staleness window.
    Fresh { age_secs: i64 },
    /// Old enough, reported only.
    Eligible { age_secs: i64 },
    /// Deleted.
    Evicted { age_secs: i64 },
    /// Something went wrong inspecting or deleting the folder.
    Failed { error: String },
}

/// One inspected folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweptFolder {
    pub folder: PathBuf,
    #[serde(flatten)]
    pub outcome: FolderOutcome,
}

/// Result of one sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    /// Entries directly under the cache root.
    pub scanned: usize,
    /// Entries that are not cache folders (files, malformed names).
    pub ignored: usize,
    /// Every cache folder and what happened to it.
    pub folders: Vec<SweptFolder>,
    /// Failure to list the root itself.
    pub root_error: Option<String>,
}

impl SweepReport {
    /// Number of folders deleted.
    pub fn evicted(&self) -> usize {
        self.count(|o| matches!(o, FolderOutcome::Evicted { .. }))
    }

    /// Number of folders old enough to evict but kept by policy.
    pub fn eligible(&self) -> usize {
        self.count(|o| matches!(o, FolderOutcome::Eligible { .. }))
    }

    /// Folders whose handling failed, with the error.
    pub fn errors(&self) -> Vec<(&Path, &str)> {
        self.folders
            .iter()
            .filter_map(|f| match &f.outcome {
                FolderOutcome::Failed { error } | FolderOutcome::Unresolved { error } => {
                    Some((f.folder.as_path(), error.as_str()))
                }
                _ => None,
            })
            .collect()
    }

    /// Outcome recorded for `folder`, if it was inspected.
    pub fn outcome_for(&self, folder: &Path) -> Option<&FolderOutcome> {
        self.folders
            .iter()
            .find(|f| f.folder == folder)
            .map(|f| &f.outcome)
    }

    fn count(&self, pred: impl Fn(&FolderOutcome) -> bool) -> usize {
        self.folders.iter().filter(|f| pred(&f.outcome)).count()
    }
}

/// Scans the cache root and evicts stale caches of closed documents.
pub struct RetentionSweeper {
    cache_root: PathBuf,
    context: String,
    policy: SweepPolicy,
    registry: Arc<dyn DocumentRegistry>,
    ids: Arc<dyn PathIds>,
}

impl RetentionSweeper {
    pub fn new(
        cache_root: impl Into<PathBuf>,
        context: impl Into<String>,
        policy: SweepPolicy,
        registry: Arc<dyn DocumentRegistry>,
        ids: Arc<dyn PathIds>,
    ) -> Result<Self> {
        let context = context.into();
        validate_context_id(&context)?;
        Ok(Self {
            cache_root: cache_root.into(),
            context,
            policy,
            registry,
            ids,
        })
    }

    /// Run one sweep now.
    pub fn sweep(&self) -> SweepReport {
        self.sweep_at(Utc::now())
    }

    /// Run one sweep, judging ages against `now`.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        let entries = match fs::read_dir(&self.cache_root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return report,
            Err(e) => {
                tracing::warn!("Cannot list cache root {:?}: {}", self.cache_root, e);
                report.root_error = Some(e.to_string());
                return report;
            }
        };

        for entry in entries {
            report.scanned += 1;
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    tracing::warn!("Cannot read entry in {:?}: {}", self.cache_root, e);
                    report.folders.push(SweptFolder {
                        folder: self.cache_root.clone(),
                        outcome: FolderOutcome::Failed {
                            error: e.to_string(),
                        },
                    });
                    continue;
                }
            };

            let name = match cache_folder_name(&path) {
                Some(name) => name,
                None => {
                    report.ignored += 1;
                    continue;
                }
            };

            let outcome = self.sweep_folder(&path, &name, now);
            report.folders.push(SweptFolder {
                folder: path,
                outcome,
            });
        }

        tracing::debug!(
            "Swept {:?}: {} scanned, {} evicted, {} eligible, {} error(s)",
            self.cache_root,
            report.scanned,
            report.evicted(),
            report.eligible(),
            report.errors().len()
        );
        report
    }

    fn sweep_folder(&self, folder: &Path, name: &FolderName, now: DateTime<Utc>) -> FolderOutcome {
        if name.context != self.context {
            return FolderOutcome::OtherContext;
        }

        let document = match self.ids.path_for_id(&name.short_id, &self.context) {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!("Cannot resolve owner of cache {:?}: {}", folder, e);
                return FolderOutcome::Unresolved {
                    error: e.to_string(),
                };
            }
        };

        if self.registry.is_open(&document) {
            return FolderOutcome::Open { document };
        }

        let marker = versioned(folder).join(CHUNK_DEFS_FILENAME);
        if !marker.exists() {
            return FolderOutcome::NoMarker;
        }
        let written = match last_write_time(&marker) {
            Ok(written) => written,
            Err(e) => {
                tracing::warn!("Cannot stat {:?}: {}", marker, e);
                return FolderOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };

        let age = now.signed_duration_since(written);
        let age_secs = age.num_seconds();
        if age <= self.policy.stale_after {
            return FolderOutcome::Fresh { age_secs };
        }

        if self.policy.eviction == EvictionMode::Report {
            return FolderOutcome::Eligible { age_secs };
        }

        // The document may have been reopened while we were looking.
        if self.registry.is_open(&document) {
            return FolderOutcome::Open { document };
        }

        match remove_dir_if_exists(folder) {
            Ok(_) => {
                tracing::info!("Evicted cache {:?} (unused for {}s)", folder, age_secs);
                if let Err(e) = self.ids.forget(&name.short_id, &self.context) {
                    tracing::warn!("Cannot forget short id {}: {}", name.short_id, e);
                }
                FolderOutcome::Evicted { age_secs }
            }
            Err(e) => {
                tracing::warn!("Failed to evict cache {:?}: {}", folder, e);
                FolderOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}

/// Parsed name of `path` if it is a directory named like a cache folder.
fn cache_folder_name(path: &Path) -> Option<FolderName> {
    if !path.is_dir() {
        return None;
    }
    FolderName::parse(&path.file_name()?.to_string_lossy())
}

/// When background sweeps run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSchedule {
    pub initial_delay: std::time::Duration,
    pub interval: std::time::Duration,
}

impl Default for SweepSchedule {
    fn default() -> Self {
        Self {
            initial_delay: std::time::Duration::from_secs(30),
            interval: std::time::Duration::from_secs(60 * 60),
        }
    }
}

/// Background sweeper thread. Dropping the handle stops the thread.
pub struct SweeperHandle {
    stop: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
    runs: Arc<AtomicUsize>,
}

impl SweeperHandle {
    /// Number of sweeps completed so far.
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    /// Stop the thread and wait for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Closing the channel wakes the thread immediately.
        self.stop.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("Cache sweeper thread panicked");
            }
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Run `sweeper` after `schedule.initial_delay`, then every
/// `schedule.interval`, until the returned handle is dropped.
pub fn spawn_sweeper(
    sweeper: Arc<RetentionSweeper>,
    schedule: SweepSchedule,
) -> Result<SweeperHandle> {
    let (stop, stopped) = mpsc::channel::<()>();
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);

    let thread = std::thread::Builder::new()
        .name("nbcache-sweeper".to_string())
        .spawn(move || {
            let mut wait = schedule.initial_delay;
            loop {
                match stopped.recv_timeout(wait) {
                    Err(RecvTimeoutError::Timeout) => {
                        let report = sweeper.sweep();
                        for (folder, error) in report.errors() {
                            tracing::debug!("Sweep error for {:?}: {}", folder, error);
                        }
                        counter.fetch_add(1, Ordering::SeqCst);
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
                wait = schedule.interval;
            }
        })
        .map_err(|e| CacheError::Schedule {
            message: e.to_string(),
        })?;

    Ok(SweeperHandle {
        stop: Some(stop),
        thread: Some(thread),
        runs,
    })
}
