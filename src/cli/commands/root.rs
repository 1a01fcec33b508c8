//! `nbcache root`.

use crate::cli::output::UserInterface;
use crate::config::CacheConfig;
use crate::error::Result;

use super::dispatcher::{open_cache, Command, CommandResult};

/// Prints the saved-document cache root.
pub struct RootCommand {
    config: CacheConfig,
}

impl RootCommand {
    pub fn new(config: CacheConfig) -> Self {
        Self { config }
    }
}

impl Command for RootCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let cache = open_cache(&self.config, &[])?;
        ui.message(&cache.notebook_cache_root().display().to_string());
        Ok(CommandResult::success())
    }
}
