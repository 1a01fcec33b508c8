//! Which files are notebooks, and where their archives live.

use std::path::{Path, PathBuf};

/// Document and archive extensions the cache reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotebookFormat {
    /// Document extensions without the dot. Matching ignores ASCII case.
    document_extensions: Vec<String>,
    /// Extension of the saved bundle written next to the document.
    archive_extension: String,
}

impl Default for NotebookFormat {
    fn default() -> Self {
        Self::new(["Rmd"], "Rnb")
    }
}

impl NotebookFormat {
    pub fn new<I, S>(document_extensions: I, archive_extension: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            document_extensions: document_extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_string())
                .collect(),
            archive_extension: archive_extension.into().trim_start_matches('.').to_string(),
        }
    }

    /// Whether `path` has one of the document extensions.
    pub fn is_document(&self, path: &Path) -> bool {
        path.extension().is_some_and(|e| {
            let e = e.to_string_lossy();
            self.document_extensions
                .iter()
                .any(|known| known.eq_ignore_ascii_case(&e))
        })
    }

    /// Whether `path` has the archive extension.
    pub fn is_archive(&self, path: &Path) -> bool {
        path.extension()
            .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(&self.archive_extension))
    }

    /// Archive that sits beside `document`: `{stem}.{archive_extension}`.
    pub fn archive_for(&self, document: &Path) -> PathBuf {
        document.with_extension(&self.archive_extension)
    }

    /// Document an archive belongs to, using the first document extension.
    pub fn document_for(&self, archive: &Path) -> PathBuf {
        match self.document_extensions.first() {
            Some(ext) => archive.with_extension(ext),
            None => archive.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_check_is_case_insensitive() {
        let format = NotebookFormat::default();
        assert!(format.is_document(Path::new("/w/a.Rmd")));
        assert!(format.is_document(Path::new("/w/a.RMD")));
        assert!(!format.is_document(Path::new("/w/a.R")));
        assert!(!format.is_document(Path::new("/w/Makefile")));
    }

    #[test]
    fn archive_sits_beside_document() {
        let format = NotebookFormat::default();
        assert_eq!(
            format.archive_for(Path::new("/w/q3-report.Rmd")),
            PathBuf::from("/w/q3-report.Rnb")
        );
        assert!(format.is_archive(Path::new("/w/q3-report.rnb")));
    }

    #[test]
    fn document_for_archive_uses_first_extension() {
        let format = NotebookFormat::new([".qmd", "rmd"], ".nbz");
        assert_eq!(
            format.document_for(Path::new("/w/a.nbz")),
            PathBuf::from("/w/a.qmd")
        );
    }
}
