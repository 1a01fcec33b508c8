//! `nbcache populate <FILE>`.

use std::path::PathBuf;

use crate::cli::output::UserInterface;
use crate::config::CacheConfig;
use crate::error::Result;

use super::dispatcher::{open_cache, Command, CommandResult};

/// Rebuilds a document's cache from its archive.
pub struct PopulateCommand {
    config: CacheConfig,
    file: PathBuf,
}

impl PopulateCommand {
    pub fn new(config: CacheConfig, file: PathBuf) -> Self {
        Self { config, file }
    }
}

impl Command for PopulateCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let cache = open_cache(&self.config, &[])?;
        let folder = cache.populate_now(&self.file)?;
        ui.success(&format!("Populated {}", folder.display()));
        Ok(CommandResult::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::output::MockUI;
    use crate::error::CacheError;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn missing_archive_is_an_error() {
        let temp = TempDir::new().unwrap();
        let config = CacheConfig::with_base(temp.path());
        let mut ui = MockUI::new();

        let result = PopulateCommand::new(config, temp.path().join("doc.Rmd")).execute(&mut ui);

        assert!(matches!(result, Err(CacheError::Populate { .. })));
        assert!(ui.successes().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn runs_configured_parser() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("doc.Rnb"), "archive").unwrap();
        let config = CacheConfig {
            parser_command: Some(vec![
                "sh".to_string(),
                "-c".to_string(),
                "mkdir -p \"$1\" && cp \"$0\" \"$1/chunks.json\"".to_string(),
                "{archive}".to_string(),
                "{folder}".to_string(),
            ]),
            ..CacheConfig::with_base(temp.path())
        };
        let mut ui = MockUI::new();

        PopulateCommand::new(config, temp.path().join("doc.Rnb"))
            .execute(&mut ui)
            .unwrap();

        assert_eq!(ui.successes().len(), 1);
        let folder = ui.successes()[0].trim_start_matches("Populated ").to_string();
        assert_eq!(
            fs::read_to_string(PathBuf::from(folder).join("chunks.json")).unwrap(),
            "archive"
        );
    }
}
