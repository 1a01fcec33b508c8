//! Keeps cache folders in step with their documents.
//!
//! Each document event maps to one folder operation:
//!
//! - added: purge foreign versions, then populate from the archive if there
//!   is no cache yet
//! - removed: keep the cache if it is no newer than the saved file, delete it
//!   otherwise
//! - renamed: carry the cache over to the folder for the new path
//!
//! Handlers for different documents touch disjoint folders and need no
//! coordination. Cleanup failures are logged and reported in the returned
//! outcome; only populate and relocate failures come back as errors.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::format::NotebookFormat;
use super::fsops::{
    copy_dir_recursive, last_write_time, move_dir, remove_dir_if_exists, remove_empty_dir,
};
use super::key::{validate_context_id, CacheKey, CacheLayout};
use super::paths::PathIds;
use super::version::{purge_foreign_versions, versioned};
use crate::error::{CacheError, Result};
use crate::host::{
    ArchiveParser, DocumentEvent, DocumentEventHandler, DocumentId, DocumentRef, DocumentRegistry,
};

/// External collaborators the cache is built against.
#[derive(Clone)]
pub struct Collaborators {
    pub registry: Arc<dyn DocumentRegistry>,
    pub parser: Arc<dyn ArchiveParser>,
    pub ids: Arc<dyn PathIds>,
}

/// What handling an added document did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// Unsaved, or not a notebook.
    Ignored,
    /// The document or its short id could not be resolved.
    Unresolved(String),
    /// A current-version cache was already present and left alone.
    AlreadyCached(PathBuf),
    /// The cache was rehydrated from the document's archive.
    Populated(PathBuf),
    /// No cache and no archive to build one from.
    NoArchive(PathBuf),
}

/// What handling a removed document did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The cache matches the saved file and was kept for a fast reopen.
    Preserved(PathBuf),
    /// The cache was deleted.
    Deleted(PathBuf),
    /// There was no cache to delete.
    Absent,
    /// The short id could not be resolved.
    Unresolved(String),
    /// Deletion failed; the sweeper will get another chance later.
    DeleteFailed { folder: PathBuf, error: String },
}

/// Why a rename left the cache where it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameSkip {
    /// No cache exists for the old path.
    SourceMissing,
    /// A cache already exists for the new path and is not overwritten.
    TargetExists,
    /// A short id could not be resolved.
    Unresolved(String),
}

/// What handling a renamed document did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    Skipped(RenameSkip),
    /// Unsaved cache moved into place in one step.
    Moved { from: PathBuf, to: PathBuf },
    /// Cache copied to the new folder and the old one removed.
    Copied { from: PathBuf, to: PathBuf },
}

/// Reacts to document events by creating, moving and deleting cache folders.
pub struct LifecycleSynchronizer {
    layout: CacheLayout,
    context: String,
    format: NotebookFormat,
    collaborators: Collaborators,
}

impl LifecycleSynchronizer {
    /// Create a synchronizer for one editing context.
    ///
    /// # Errors
    ///
    /// Returns an error if `context` cannot be embedded in a folder name.
    pub fn new(
        layout: CacheLayout,
        context: impl Into<String>,
        format: NotebookFormat,
        collaborators: Collaborators,
    ) -> Result<Self> {
        let context = context.into();
        validate_context_id(&context)?;
        Ok(Self {
            layout,
            context,
            format,
            collaborators,
        })
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn format(&self) -> &NotebookFormat {
        &self.format
    }

    /// Handle a newly opened document.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Populate`] if the archive cannot be rehydrated.
    /// The cache folder is left absent so the next add retries.
    pub fn on_document_added(&self, id: &DocumentId) -> Result<AddOutcome> {
        let path = match self.collaborators.registry.path_of(id) {
            Ok(Some(path)) => path,
            Ok(None) => return Ok(AddOutcome::Ignored),
            Err(e) => {
                tracing::warn!("Cannot resolve path of added document {}: {}", id, e);
                return Ok(AddOutcome::Unresolved(e.to_string()));
            }
        };

        if !self.format.is_document(&path) {
            tracing::debug!("Ignoring non-notebook document {:?}", path);
            return Ok(AddOutcome::Ignored);
        }

        let key = match self.key_for(Some(&path), id) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!("Cannot compute cache folder for {:?}: {}", path, e);
                return Ok(AddOutcome::Unresolved(e.to_string()));
            }
        };

        // The document is about to be mutated without updating caches in
        // other formats, so they are dead either way.
        let root = self.layout.key_root(&key);
        if root.exists() {
            purge_foreign_versions(&root);
        }

        let folder = versioned(&root);
        if folder.exists() {
            // TODO: compare cache, document and archive write times to decide
            // whether a newer archive should replace the cache.
            return Ok(AddOutcome::AlreadyCached(folder));
        }

        let archive = self.format.archive_for(&path);
        if !archive.exists() {
            return Ok(AddOutcome::NoArchive(folder));
        }

        populate_folder(self.collaborators.parser.as_ref(), &archive, &folder)?;
        Ok(AddOutcome::Populated(folder))
    }

    /// Handle a closed document. Never fails; see [`RemoveOutcome`].
    pub fn on_document_removed(&self, id: &DocumentId, path: Option<&Path>) -> RemoveOutcome {
        let key = match self.peek_key_for(path, id) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!("Cannot compute cache folder for removed {}: {}", id, e);
                return RemoveOutcome::Unresolved(e.to_string());
            }
        };

        let root = self.layout.key_root(&key);
        let marker = self.layout.chunk_definitions_path(&key);

        if let Some(document) = path {
            if marker.exists() && cache_is_current(&marker, document) {
                tracing::debug!("Keeping up-to-date cache {:?}", root);
                return RemoveOutcome::Preserved(root);
            }
        }

        match remove_dir_if_exists(&root) {
            Ok(true) => {
                tracing::debug!("Removed cache {:?} of closed document {}", root, id);
                RemoveOutcome::Deleted(root)
            }
            Ok(false) => RemoveOutcome::Absent,
            Err(e) => {
                tracing::warn!("Failed to remove cache {:?}: {}", root, e);
                RemoveOutcome::DeleteFailed {
                    folder: root,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Handle a document whose path changed from `old_path`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Relocate`] if the cache could not be copied to
    /// its new folder. The old folder is kept in that case.
    pub fn on_document_renamed(
        &self,
        old_path: Option<&Path>,
        document: &DocumentRef,
    ) -> Result<RenameOutcome> {
        let keys = self
            .peek_key_for(old_path, &document.id)
            .and_then(|old| Ok((old, self.key_for(document.path.as_deref(), &document.id)?)));
        let (old_key, new_key) = match keys {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!("Cannot compute cache folders for rename of {}: {}", document.id, e);
                return Ok(RenameOutcome::Skipped(RenameSkip::Unresolved(e.to_string())));
            }
        };

        let old_root = self.layout.key_root(&old_key);
        let old_folder = versioned(&old_root);
        let new_folder = self.layout.folder(&new_key);

        if !old_folder.exists() {
            return Ok(RenameOutcome::Skipped(RenameSkip::SourceMissing));
        }
        if new_folder.exists() {
            return Ok(RenameOutcome::Skipped(RenameSkip::TargetExists));
        }

        // Saved folders are keyed by path; always copy between them.
        let mover: Option<Mover> = match old_key {
            CacheKey::Unsaved(_) => Some(move_dir),
            CacheKey::Saved(_) => None,
        };

        match carry_over(&old_folder, &new_folder, mover) {
            Ok(moved) => {
                discard_old_root(&old_root);
                tracing::debug!("Relocated cache {:?} -> {:?}", old_folder, new_folder);
                let (from, to) = (old_folder, new_folder);
                Ok(if moved {
                    RenameOutcome::Moved { from, to }
                } else {
                    RenameOutcome::Copied { from, to }
                })
            }
            Err(e) => Err(CacheError::Relocate {
                from: old_folder,
                to: new_folder,
                message: e.to_string(),
            }),
        }
    }

    fn key_for(&self, path: Option<&Path>, id: &DocumentId) -> Result<CacheKey> {
        self.layout
            .key_for(path, id, &self.context, self.collaborators.ids.as_ref())
    }

    fn peek_key_for(&self, path: Option<&Path>, id: &DocumentId) -> Result<CacheKey> {
        self.layout
            .peek_key_for(path, id, &self.context, self.collaborators.ids.as_ref())
    }
}

impl DocumentEventHandler for LifecycleSynchronizer {
    fn handle(&self, event: &DocumentEvent) -> Result<()> {
        match event {
            DocumentEvent::Added { id } => self.on_document_added(id).map(|_| ()),
            DocumentEvent::Removed { id, path } => {
                self.on_document_removed(id, path.as_deref());
                Ok(())
            }
            DocumentEvent::Renamed { old_path, document } => self
                .on_document_renamed(old_path.as_deref(), document)
                .map(|_| ()),
        }
    }
}

/// Run `parser` into `folder`, leaving no partial folder behind on failure.
pub(crate) fn populate_folder(
    parser: &dyn ArchiveParser,
    archive: &Path,
    folder: &Path,
) -> Result<()> {
    match parser.populate(archive, folder) {
        Ok(()) => {
            tracing::info!("Populated cache {:?} from {:?}", folder, archive);
            Ok(())
        }
        Err(e) => {
            if let Err(cleanup) = remove_dir_if_exists(folder) {
                tracing::warn!("Failed to clean partial cache {:?}: {}", folder, cleanup);
            }
            if let Some(root) = folder.parent() {
                remove_empty_dir(root);
            }
            match e {
                CacheError::Populate { .. } => Err(e),
                other => Err(CacheError::Populate {
                    archive: archive.to_path_buf(),
                    message: other.to_string(),
                }),
            }
        }
    }
}

type Mover = fn(&Path, &Path) -> io::Result<()>;

/// Bring `from` over to `to`, trying `mover` first and copying if it fails.
/// Returns true if the tree was moved. A failed copy leaves neither `to`
/// nor a parent it created behind; `from` is untouched unless moved.
fn carry_over(from: &Path, to: &Path, mover: Option<Mover>) -> io::Result<bool> {
    if let Some(mover) = mover {
        match mover(from, to) {
            Ok(()) => return Ok(true),
            Err(e) => tracing::debug!("Move of {:?} failed ({}), copying instead", from, e),
        }
    }

    if let Err(e) = copy_dir_recursive(from, to) {
        if let Err(cleanup) = remove_dir_if_exists(to) {
            tracing::warn!("Failed to clean partial copy {:?}: {}", to, cleanup);
        }
        if let Some(parent) = to.parent() {
            remove_empty_dir(parent);
        }
        return Err(e);
    }
    Ok(false)
}

/// True when the marker is no newer than the document file on disk.
fn cache_is_current(marker: &Path, document: &Path) -> bool {
    match (last_write_time(marker), last_write_time(document)) {
        (Ok(marker_time), Ok(document_time)) => marker_time <= document_time,
        (marker_time, document_time) => {
            tracing::debug!(
                "Cannot compare cache and document times ({:?}, {:?}); treating cache as stale",
                marker_time.err(),
                document_time.err()
            );
            false
        }
    }
}

fn discard_old_root(root: &Path) {
    if let Err(e) = remove_dir_if_exists(root) {
        tracing::warn!("Failed to remove old cache {:?}: {}", root, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::key::CHUNK_DEFS_FILENAME;
    use crate::cache::paths::PathIndex;
    use crate::cache::version::CACHE_VERSION;
    use crate::host::InMemoryRegistry;
    use filetime::FileTime;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct Fixture {
        temp: TempDir,
        registry: Arc<InMemoryRegistry>,
        parses: Arc<AtomicUsize>,
        sync: LifecycleSynchronizer,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_parser(|_, folder| {
                fs::create_dir_all(folder)?;
                fs::write(folder.join(CHUNK_DEFS_FILENAME), "{\"chunks\":[]}")?;
                Ok(())
            })
        }

        fn with_parser<F>(parse: F) -> Self
        where
            F: Fn(&Path, &Path) -> Result<()> + Send + Sync + 'static,
        {
            let temp = TempDir::new().unwrap();
            let registry = Arc::new(InMemoryRegistry::new());
            let parses = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&parses);
            let parser = move |archive: &Path, folder: &Path| -> Result<()> {
                counter.fetch_add(1, Ordering::SeqCst);
                parse(archive, folder)
            };
            let ids = PathIndex::open(temp.path().join("paths.yml")).unwrap();
            let layout = CacheLayout::new(temp.path().join("nb"), temp.path().join("unsaved"));
            let sync = LifecycleSynchronizer::new(
                layout,
                "ctx",
                NotebookFormat::default(),
                Collaborators {
                    registry: registry.clone(),
                    parser: Arc::new(parser),
                    ids: Arc::new(ids),
                },
            )
            .unwrap();

            Self {
                temp,
                registry,
                parses,
                sync,
            }
        }

        fn document(&self, name: &str) -> PathBuf {
            let path = self.temp.path().join(name);
            fs::write(&path, "---\ntitle: t\n---\n").unwrap();
            path
        }

        fn open(&self, id: &str, path: Option<&Path>) -> DocumentId {
            let id = DocumentId::from(id);
            self.registry.open(DocumentRef {
                id: id.clone(),
                path: path.map(Path::to_path_buf),
            });
            id
        }

        fn folder(&self, id: &DocumentId, path: Option<&Path>) -> PathBuf {
            self.sync.peek_key_for(path, id).map(|k| self.sync.layout.folder(&k)).unwrap()
        }

        fn write_cache(&self, folder: &Path) {
            fs::create_dir_all(folder.join("lib")).unwrap();
            fs::write(folder.join(CHUNK_DEFS_FILENAME), "{\"chunks\":[1]}").unwrap();
            fs::write(folder.join("lib/out.html"), "<p>hi</p>").unwrap();
        }
    }

    fn set_mtime(path: &Path, secs: i64) {
        filetime::set_file_mtime(path, FileTime::from_unix_time(secs, 0)).unwrap();
    }

    #[test]
    fn invalid_context_is_rejected() {
        let temp = TempDir::new().unwrap();
        let result = LifecycleSynchronizer::new(
            CacheLayout::new(temp.path(), temp.path()),
            "bad-ctx",
            NotebookFormat::default(),
            Collaborators {
                registry: Arc::new(InMemoryRegistry::new()),
                parser: Arc::new(|_: &Path, _: &Path| -> Result<()> { Ok(()) }),
                ids: Arc::new(PathIndex::open(temp.path().join("p.yml")).unwrap()),
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn add_populates_from_archive_once() {
        let fx = Fixture::new();
        let doc = fx.document("report.Rmd");
        fs::write(fx.temp.path().join("report.Rnb"), "archive").unwrap();
        let id = fx.open("D1", Some(&doc));

        let first = fx.sync.on_document_added(&id).unwrap();
        let second = fx.sync.on_document_added(&id).unwrap();

        let folder = fx.folder(&id, Some(&doc));
        assert_eq!(first, AddOutcome::Populated(folder.clone()));
        assert_eq!(second, AddOutcome::AlreadyCached(folder.clone()));
        assert_eq!(fx.parses.load(Ordering::SeqCst), 1);
        assert!(folder.join(CHUNK_DEFS_FILENAME).exists());
    }

    #[test]
    fn add_ignores_unsaved_and_foreign_documents() {
        let fx = Fixture::new();
        let unsaved = fx.open("U1", None);
        let script = fx.document("script.R");
        let other = fx.open("S1", Some(&script));

        assert_eq!(fx.sync.on_document_added(&unsaved).unwrap(), AddOutcome::Ignored);
        assert_eq!(fx.sync.on_document_added(&other).unwrap(), AddOutcome::Ignored);
        assert_eq!(fx.parses.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn add_of_unknown_document_is_unresolved() {
        let fx = Fixture::new();
        let outcome = fx.sync.on_document_added(&DocumentId::from("ghost")).unwrap();
        assert!(matches!(outcome, AddOutcome::Unresolved(_)));
    }

    #[test]
    fn add_without_archive_creates_nothing() {
        let fx = Fixture::new();
        let doc = fx.document("fresh.Rmd");
        let id = fx.open("D1", Some(&doc));

        let outcome = fx.sync.on_document_added(&id).unwrap();

        assert!(matches!(outcome, AddOutcome::NoArchive(_)));
        assert!(!fx.temp.path().join("nb").exists());
    }

    #[test]
    fn add_parse_failure_propagates_and_leaves_no_folder() {
        let fx = Fixture::with_parser(|archive, folder| {
            fs::create_dir_all(folder)?;
            fs::write(folder.join("partial"), "x")?;
            Err(CacheError::Populate {
                archive: archive.to_path_buf(),
                message: "bad header".into(),
            })
        });
        let doc = fx.document("report.Rmd");
        fs::write(fx.temp.path().join("report.Rnb"), "garbage").unwrap();
        let id = fx.open("D1", Some(&doc));

        let err = fx.sync.on_document_added(&id).unwrap_err();

        assert!(matches!(err, CacheError::Populate { .. }));
        let folder = fx.folder(&id, Some(&doc));
        assert!(!folder.exists());
        assert!(!folder.parent().unwrap().exists());

        // A later add tries again.
        assert!(fx.sync.on_document_added(&id).is_err());
        assert_eq!(fx.parses.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn add_purges_foreign_versions_only() {
        let fx = Fixture::new();
        let doc = fx.document("report.Rmd");
        let id = fx.open("D1", Some(&doc));
        let folder = fx.folder(&id, Some(&doc));
        fx.write_cache(&folder);
        let root = folder.parent().unwrap().to_path_buf();
        fs::create_dir_all(root.join("0/lib")).unwrap();

        let outcome = fx.sync.on_document_added(&id).unwrap();

        assert_eq!(outcome, AddOutcome::AlreadyCached(folder.clone()));
        assert!(!root.join("0").exists());
        assert_eq!(fs::read_to_string(folder.join("lib/out.html")).unwrap(), "<p>hi</p>");
    }

    #[test]
    fn remove_keeps_cache_matching_saved_file() {
        let fx = Fixture::new();
        let doc = fx.document("report.Rmd");
        let id = fx.open("D1", Some(&doc));
        let folder = fx.folder(&id, Some(&doc));
        fx.write_cache(&folder);
        set_mtime(&folder.join(CHUNK_DEFS_FILENAME), 1_700_000_000);
        set_mtime(&doc, 1_700_000_000);

        let outcome = fx.sync.on_document_removed(&id, Some(&doc));

        assert!(matches!(outcome, RemoveOutcome::Preserved(_)));
        assert!(folder.exists());
    }

    #[test]
    fn remove_deletes_cache_newer_than_saved_file() {
        let fx = Fixture::new();
        let doc = fx.document("report.Rmd");
        let id = fx.open("D1", Some(&doc));
        let folder = fx.folder(&id, Some(&doc));
        fx.write_cache(&folder);
        set_mtime(&doc, 1_700_000_000);
        set_mtime(&folder.join(CHUNK_DEFS_FILENAME), 1_700_000_100);

        let outcome = fx.sync.on_document_removed(&id, Some(&doc));

        assert!(matches!(outcome, RemoveOutcome::Deleted(_)));
        assert!(!folder.parent().unwrap().exists());
    }

    #[test]
    fn remove_deletes_unsaved_cache() {
        let fx = Fixture::new();
        let id = fx.open("U1", None);
        let folder = fx.folder(&id, None);
        fx.write_cache(&folder);

        let outcome = fx.sync.on_document_removed(&id, None);

        assert!(matches!(outcome, RemoveOutcome::Deleted(_)));
        assert!(!fx.temp.path().join("unsaved/U1").exists());
        assert_eq!(fx.sync.on_document_removed(&id, None), RemoveOutcome::Absent);
    }

    #[test]
    fn remove_deletes_cache_of_vanished_file() {
        let fx = Fixture::new();
        let doc = fx.document("report.Rmd");
        let id = fx.open("D1", Some(&doc));
        let folder = fx.folder(&id, Some(&doc));
        fx.write_cache(&folder);
        fs::remove_file(&doc).unwrap();

        let outcome = fx.sync.on_document_removed(&id, Some(&doc));

        assert!(matches!(outcome, RemoveOutcome::Deleted(_)));
    }

    #[test]
    fn saved_rename_copies_content_and_removes_old() {
        let fx = Fixture::new();
        let old = fx.document("draft.Rmd");
        let id = fx.open("D1", Some(&old));
        let old_folder = fx.folder(&id, Some(&old));
        fx.write_cache(&old_folder);

        let new = fx.document("final-report.Rmd");
        let outcome = fx
            .sync
            .on_document_renamed(Some(&old), &DocumentRef::saved(id.clone(), &new))
            .unwrap();

        let new_folder = fx.folder(&id, Some(&new));
        assert!(matches!(outcome, RenameOutcome::Copied { .. }));
        assert_eq!(
            fs::read_to_string(new_folder.join("lib/out.html")).unwrap(),
            "<p>hi</p>"
        );
        assert!(new_folder.join(CHUNK_DEFS_FILENAME).exists());
        assert!(!old_folder.parent().unwrap().exists());
    }

    #[test]
    fn first_save_moves_unsaved_cache() {
        let fx = Fixture::new();
        let id = fx.open("U1", None);
        let unsaved = fx.folder(&id, None);
        fx.write_cache(&unsaved);

        let path = fx.document("untitled.Rmd");
        let outcome = fx
            .sync
            .on_document_renamed(None, &DocumentRef::saved(id.clone(), &path))
            .unwrap();

        let saved = fx.folder(&id, Some(&path));
        assert!(matches!(outcome, RenameOutcome::Moved { .. }));
        assert!(saved.join("lib/out.html").exists());
        assert!(!fx.temp.path().join("unsaved/U1").exists());
        assert!(saved.starts_with(fx.temp.path().join("nb")));
    }

    /// Put a plain file where the key root of `folder` would go.
    fn block_key_root(folder: &Path) {
        let root = folder.parent().unwrap();
        fs::create_dir_all(root.parent().unwrap()).unwrap();
        fs::write(root, "in the way").unwrap();
    }

    #[test]
    fn failed_first_save_keeps_unsaved_cache() {
        let fx = Fixture::new();
        let id = fx.open("U1", None);
        let unsaved = fx.folder(&id, None);
        fx.write_cache(&unsaved);
        let path = fx.document("untitled.Rmd");
        let saved = fx.folder(&id, Some(&path));
        block_key_root(&saved);

        let err = fx
            .sync
            .on_document_renamed(None, &DocumentRef::saved(id.clone(), &path))
            .unwrap_err();

        assert!(matches!(err, CacheError::Relocate { .. }));
        assert!(unsaved.join("lib/out.html").exists());
        assert!(!saved.exists());
    }

    #[test]
    fn failed_saved_rename_keeps_old_cache() {
        let fx = Fixture::new();
        let old = fx.document("draft.Rmd");
        let id = fx.open("D1", Some(&old));
        let old_folder = fx.folder(&id, Some(&old));
        fx.write_cache(&old_folder);
        let new = fx.document("final.Rmd");
        let new_folder = fx.folder(&id, Some(&new));
        block_key_root(&new_folder);

        let err = fx
            .sync
            .on_document_renamed(Some(&old), &DocumentRef::saved(id.clone(), &new))
            .unwrap_err();

        assert!(matches!(err, CacheError::Relocate { .. }));
        assert_eq!(
            fs::read_to_string(old_folder.join("lib/out.html")).unwrap(),
            "<p>hi</p>"
        );
        assert!(!new_folder.exists());
    }

    #[test]
    fn failed_move_falls_back_to_copy() {
        let temp = TempDir::new().unwrap();
        let from = temp.path().join("unsaved/U1/1");
        let to = temp.path().join("nb/ctx-1234abcd-a/1");
        fs::create_dir_all(from.join("lib")).unwrap();
        fs::write(from.join("lib/out.html"), "<p>hi</p>").unwrap();
        let refuse: Mover = |_, _| Err(io::Error::other("cross-device"));

        let moved = carry_over(&from, &to, Some(refuse)).unwrap();

        assert!(!moved);
        assert_eq!(fs::read_to_string(to.join("lib/out.html")).unwrap(), "<p>hi</p>");
        assert!(from.join("lib/out.html").exists());
    }

    #[cfg(unix)]
    #[test]
    fn failed_copy_leaves_no_partial_target() {
        let temp = TempDir::new().unwrap();
        let from = temp.path().join("old/1");
        fs::create_dir_all(&from).unwrap();
        fs::write(from.join(CHUNK_DEFS_FILENAME), "{}").unwrap();
        // A dangling link makes the copy fail after the target was created.
        std::os::unix::fs::symlink(temp.path().join("missing"), from.join("zz-link")).unwrap();
        let to = temp.path().join("nb/ctx-1234abcd-a/1");

        assert!(carry_over(&from, &to, None).is_err());

        assert!(!to.exists());
        assert!(!to.parent().unwrap().exists());
        assert!(from.join(CHUNK_DEFS_FILENAME).exists());
    }

    #[test]
    fn rename_never_overwrites_existing_target() {
        let fx = Fixture::new();
        let old = fx.document("a.Rmd");
        let new = fx.document("b.Rmd");
        let id = fx.open("D1", Some(&old));
        fx.write_cache(&fx.folder(&id, Some(&old)));
        let target = fx.folder(&id, Some(&new));
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("keep"), "mine").unwrap();

        let outcome = fx
            .sync
            .on_document_renamed(Some(&old), &DocumentRef::saved(id.clone(), &new))
            .unwrap();

        assert_eq!(outcome, RenameOutcome::Skipped(RenameSkip::TargetExists));
        assert_eq!(fs::read_to_string(target.join("keep")).unwrap(), "mine");
        assert!(fx.folder(&id, Some(&old)).exists());
    }

    #[test]
    fn rename_without_cache_is_noop() {
        let fx = Fixture::new();
        let old = fx.document("a.Rmd");
        let new = fx.document("b.Rmd");
        let id = fx.open("D1", Some(&old));

        let outcome = fx
            .sync
            .on_document_renamed(Some(&old), &DocumentRef::saved(id.clone(), &new))
            .unwrap();

        assert_eq!(outcome, RenameOutcome::Skipped(RenameSkip::SourceMissing));
        assert!(!fx.folder(&id, Some(&new)).exists());
    }

    #[test]
    fn handler_dispatches_events() {
        let fx = Fixture::new();
        let id = fx.open("U1", None);
        let folder = fx.folder(&id, None);
        fx.write_cache(&folder);

        fx.sync
            .handle(&DocumentEvent::Removed {
                id: id.clone(),
                path: None,
            })
            .unwrap();

        assert!(!folder.exists());
    }

    #[test]
    fn malformed_folders_are_untouched() {
        let fx = Fixture::new();
        let stray = fx.temp.path().join("nb").join("not_a_cache");
        fs::create_dir_all(stray.join(CACHE_VERSION)).unwrap();
        let doc = fx.document("report.Rmd");
        fs::write(fx.temp.path().join("report.Rnb"), "archive").unwrap();
        let id = fx.open("D1", Some(&doc));

        fx.sync.on_document_added(&id).unwrap();
        fx.sync.on_document_removed(&id, Some(&doc));

        assert!(stray.join(CACHE_VERSION).exists());
    }
}
