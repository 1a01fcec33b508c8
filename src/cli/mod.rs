//! Command-line interface for nbcache.
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations
//! - [`output`] - Terminal output

pub mod args;
pub mod commands;
pub mod output;

pub use args::{Cli, Commands, FolderArgs, PopulateArgs, SweepArgs};
pub use commands::{Command, CommandDispatcher, CommandResult};
pub use output::{MockUI, TerminalUI, UserInterface};
