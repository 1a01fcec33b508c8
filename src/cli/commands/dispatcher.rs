//! Command dispatching.
//!
//! This module provides the core command infrastructure:
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::{Collaborators, NotebookCache, PathIndex};
use crate::cli::args::{Cli, Commands};
use crate::cli::output::UserInterface;
use crate::config::{load_config, CacheConfig, ConfigPaths};
use crate::error::{CacheError, Result};
use crate::host::{ArchiveParser, CommandParser, DocumentRegistry, InMemoryRegistry};

/// Trait for command implementations.
///
/// Each CLI subcommand implements this trait to provide its execution logic.
pub trait Command {
    /// Execute the command, writing through `ui`.
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    /// Create a failure result.
    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    working_dir: PathBuf,
}

impl CommandDispatcher {
    /// Create a dispatcher resolving relative paths against `working_dir`.
    pub fn new(working_dir: PathBuf) -> Self {
        Self { working_dir }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Load configuration and apply command-line overrides.
    pub fn load_config(&self, cli: &Cli) -> Result<CacheConfig> {
        let paths = ConfigPaths::discover(&self.working_dir, cli.config.clone());
        let mut config = load_config(&paths)?;

        if let Some(root) = &cli.cache_root {
            config.cache_root = self.working_dir.join(root);
        }
        if let Some(context) = &cli.context_id {
            config.context_id = context.clone();
        }
        config.validate()?;
        Ok(config)
    }

    /// Dispatch and execute a command.
    pub fn dispatch(&self, cli: &Cli, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let config = self.load_config(cli)?;
        tracing::debug!("Using cache root {:?}", config.cache_root);

        match &cli.command {
            Commands::Root => super::root::RootCommand::new(config).execute(ui),
            Commands::Folder(args) => {
                let file = self.working_dir.join(&args.file);
                super::folder::FolderCommand::new(config, file).execute(ui)
            }
            Commands::Populate(args) => {
                let file = self.working_dir.join(&args.file);
                super::populate::PopulateCommand::new(config, file).execute(ui)
            }
            Commands::Sweep(args) => {
                let mut args = args.clone();
                args.open = args.open.iter().map(|p| self.working_dir.join(p)).collect();
                super::sweep::SweepCommand::new(config, args).execute(ui)
            }
        }
    }
}

/// Build an inert cache for one-shot commands.
///
/// `open` lists documents the sweeper must treat as open.
pub(crate) fn open_cache(config: &CacheConfig, open: &[PathBuf]) -> Result<NotebookCache> {
    let registry: Arc<dyn DocumentRegistry> =
        Arc::new(InMemoryRegistry::with_open_paths(open.iter().cloned()));

    let parser: Arc<dyn ArchiveParser> = match &config.parser_command {
        Some(argv) => Arc::new(CommandParser::new(argv.clone())?),
        None => Arc::new(|archive: &Path, _folder: &Path| -> Result<()> {
            Err(CacheError::Populate {
                archive: archive.to_path_buf(),
                message: "no parser_command configured".to_string(),
            })
        }),
    };

    let collaborators = Collaborators {
        registry,
        parser,
        ids: Arc::new(PathIndex::open(config.path_index_file())?),
    };
    NotebookCache::new(config, collaborators)
}
