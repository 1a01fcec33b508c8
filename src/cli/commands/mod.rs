//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait, which provides a uniform
//! interface for executing commands and reporting results.
//!
//! Commands are dispatched via [`CommandDispatcher`], which loads the
//! configuration once, applies global flag overrides, and routes the
//! subcommand to its implementation.

pub mod dispatcher;
pub mod folder;
pub mod populate;
pub mod root;
pub mod sweep;

pub use dispatcher::{Command, CommandDispatcher, CommandResult};
