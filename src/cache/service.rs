//! Wiring of the synchronizer and sweeper, plus the entry points a host
//! calls directly.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::format::NotebookFormat;
use super::fsops::remove_dir_if_exists;
use super::key::{validate_context_id, CacheLayout};
use super::lifecycle::{populate_folder, Collaborators, LifecycleSynchronizer};
use super::sweeper::{
    spawn_sweeper, RetentionSweeper, SweepReport, SweepSchedule, SweeperHandle,
};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::host::{DocumentEvents, DocumentId, SubscriptionId};

/// A configured notebook cache.
///
/// Built with [`NotebookCache::new`] it is inert: nothing is subscribed and
/// no sweeps run until [`NotebookCache::start`]. [`init_cache`] does both.
pub struct NotebookCache {
    synchronizer: Arc<LifecycleSynchronizer>,
    sweeper: Arc<RetentionSweeper>,
    schedule: SweepSchedule,
    collaborators: Collaborators,
    subscription: Option<SubscriptionId>,
    sweeps: Option<SweeperHandle>,
}

impl NotebookCache {
    /// Build the cache from configuration and collaborators.
    pub fn new(config: &CacheConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;

        let synchronizer = LifecycleSynchronizer::new(
            config.layout(),
            &config.context_id,
            config.format(),
            collaborators.clone(),
        )?;
        let sweeper = RetentionSweeper::new(
            &config.cache_root,
            &config.context_id,
            config.sweep_policy()?,
            Arc::clone(&collaborators.registry),
            Arc::clone(&collaborators.ids),
        )?;

        Ok(Self {
            synchronizer: Arc::new(synchronizer),
            sweeper: Arc::new(sweeper),
            schedule: config.sweep_schedule()?,
            collaborators,
            subscription: None,
            sweeps: None,
        })
    }

    /// Subscribe to document events and start background sweeps.
    ///
    /// # Errors
    ///
    /// Returns the subscription error, or [`CacheError::Schedule`] if the
    /// sweeper thread cannot be started.
    pub fn start(&mut self, events: &dyn DocumentEvents) -> Result<()> {
        if self.subscription.is_none() {
            let handler = Arc::clone(&self.synchronizer);
            self.subscription = Some(events.subscribe(handler)?);
        }
        if self.sweeps.is_none() {
            self.sweeps = Some(spawn_sweeper(Arc::clone(&self.sweeper), self.schedule)?);
        }
        tracing::debug!(
            "Notebook cache started for context {} at {:?}",
            self.context(),
            self.notebook_cache_root()
        );
        Ok(())
    }

    /// Stop background sweeps. The event subscription belongs to the bus
    /// and is released with [`crate::host::EventBus::unsubscribe`].
    pub fn stop(&mut self) {
        if let Some(handle) = self.sweeps.take() {
            handle.stop();
        }
    }

    /// Root holding saved-document caches.
    pub fn notebook_cache_root(&self) -> &Path {
        self.layout().cache_root()
    }

    /// Current-version cache folder for a document in `context`.
    pub fn chunk_cache_folder_in(
        &self,
        path: Option<&Path>,
        document: &DocumentId,
        context: &str,
    ) -> Result<PathBuf> {
        validate_context_id(context)?;
        self.layout()
            .folder_for(path, document, context, self.collaborators.ids.as_ref())
    }

    /// Current-version cache folder for a document in the configured context.
    pub fn chunk_cache_folder(
        &self,
        path: Option<&Path>,
        document: &DocumentId,
    ) -> Result<PathBuf> {
        self.chunk_cache_folder_in(path, document, self.context())
    }

    /// Cache folder for `file`, computed without touching the disk.
    ///
    /// `file` may be the document or its archive.
    pub fn cache_folder_for(&self, file: &Path) -> Result<PathBuf> {
        let document = self.document_path(file);
        let key = self.layout().peek_key_for(
            Some(&document),
            &anonymous(),
            self.context(),
            self.collaborators.ids.as_ref(),
        )?;
        Ok(self.layout().folder(&key))
    }

    /// Rebuild the cache for `file` from its archive now.
    ///
    /// `file` may be the document or its archive. Any existing cache for the
    /// document is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Populate`] if there is no archive or it cannot
    /// be parsed.
    pub fn populate_now(&self, file: &Path) -> Result<PathBuf> {
        let archive = if self.format().is_archive(file) {
            file.to_path_buf()
        } else {
            self.format().archive_for(file)
        };
        if !archive.exists() {
            return Err(CacheError::Populate {
                archive,
                message: "archive not found".to_string(),
            });
        }

        let folder = self.chunk_cache_folder(Some(&self.document_path(file)), &anonymous())?;
        remove_dir_if_exists(&folder)?;
        populate_folder(self.collaborators.parser.as_ref(), &archive, &folder)?;
        Ok(folder)
    }

    /// Run one sweep on the calling thread.
    pub fn sweep_now(&self) -> SweepReport {
        self.sweeper.sweep()
    }

    pub fn subscription(&self) -> Option<SubscriptionId> {
        self.subscription
    }

    pub fn context(&self) -> &str {
        self.synchronizer.context()
    }

    fn layout(&self) -> &CacheLayout {
        self.synchronizer.layout()
    }

    fn format(&self) -> &NotebookFormat {
        self.synchronizer.format()
    }

    fn document_path(&self, file: &Path) -> PathBuf {
        if self.format().is_archive(file) {
            self.format().document_for(file)
        } else {
            file.to_path_buf()
        }
    }
}

/// Saved-document keys do not depend on the document id.
fn anonymous() -> DocumentId {
    DocumentId::new("")
}

/// Build the cache, subscribe it to `events`, and schedule sweeps.
pub fn init_cache(
    config: &CacheConfig,
    collaborators: Collaborators,
    events: &dyn DocumentEvents,
) -> Result<NotebookCache> {
    let mut cache = NotebookCache::new(config, collaborators)?;
    cache.start(events)?;
    Ok(cache)
}
