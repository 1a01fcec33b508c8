//! `nbcache folder <FILE>`.

use std::path::PathBuf;

use crate::cli::output::UserInterface;
use crate::config::CacheConfig;
use crate::error::Result;

use super::dispatcher::{open_cache, Command, CommandResult};

/// Prints the cache folder for a document or archive without creating it.
pub struct FolderCommand {
    config: CacheConfig,
    file: PathBuf,
}

impl FolderCommand {
    pub fn new(config: CacheConfig, file: PathBuf) -> Self {
        Self { config, file }
    }
}

impl Command for FolderCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let cache = open_cache(&self.config, &[])?;
        let folder = cache.cache_folder_for(&self.file)?;
        ui.message(&folder.display().to_string());
        Ok(CommandResult::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::output::MockUI;
    use tempfile::TempDir;

    #[test]
    fn prints_versioned_folder_under_root() {
        let temp = TempDir::new().unwrap();
        let config = CacheConfig::with_base(temp.path());
        let mut ui = MockUI::new();

        FolderCommand::new(config, temp.path().join("report.Rmd"))
            .execute(&mut ui)
            .unwrap();

        let folder = PathBuf::from(&ui.messages()[0]);
        assert!(folder.starts_with(temp.path().join("notebooks")));
        assert!(folder.ends_with(crate::cache::CACHE_VERSION));
        assert!(!folder.exists());
    }
}
