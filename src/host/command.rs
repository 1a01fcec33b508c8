//! Archive parser backed by an external program.

use std::path::Path;
use std::process::{Command, Stdio};

use super::ArchiveParser;
use crate::error::{CacheError, Result};

/// Placeholder replaced with the archive path.
pub const ARCHIVE_PLACEHOLDER: &str = "{archive}";

/// Placeholder replaced with the target cache folder.
pub const FOLDER_PLACEHOLDER: &str = "{folder}";

/// Runs a configured command to rehydrate an archive.
///
/// The argv template may use [`ARCHIVE_PLACEHOLDER`] and
/// [`FOLDER_PLACEHOLDER`] anywhere inside its arguments.
#[derive(Debug, Clone)]
pub struct CommandParser {
    argv: Vec<String>,
}

impl CommandParser {
    /// Create a parser from an argv template.
    ///
    /// # Errors
    ///
    /// Returns an error if the template has no program.
    pub fn new(argv: Vec<String>) -> Result<Self> {
        if argv.first().is_none_or(|program| program.trim().is_empty()) {
            return Err(CacheError::ConfigValidationError {
                message: "parser_command must name a program".to_string(),
            });
        }
        Ok(Self { argv })
    }

    /// The argv that would run for the given archive and folder.
    pub fn render(&self, archive: &Path, folder: &Path) -> Vec<String> {
        let archive = archive.to_string_lossy();
        let folder = folder.to_string_lossy();
        self.argv
            .iter()
            .map(|arg| {
                arg.replace(ARCHIVE_PLACEHOLDER, &archive)
                    .replace(FOLDER_PLACEHOLDER, &folder)
            })
            .collect()
    }
}

impl ArchiveParser for CommandParser {
    fn populate(&self, archive: &Path, folder: &Path) -> Result<()> {
        let argv = self.render(archive, folder);
        tracing::debug!("Running archive parser: {:?}", argv);

        let output = Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| CacheError::Populate {
                archive: archive.to_path_buf(),
                message: format!("cannot run {}: {}", argv[0], e),
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(CacheError::Populate {
            archive: archive.to_path_buf(),
            message: format!(
                "{} exited with {:?}: {}",
                argv[0],
                output.status.code(),
                stderr.trim()
            ),
        })
    }
}
