//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// nbcache - Notebook chunk cache maintenance.
#[derive(Debug, Parser)]
#[command(name = "nbcache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to config file (overrides .nbcache.yml and ~/.nbcache/config.yml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Root of saved-document caches
    #[arg(long, global = true, env = "NBCACHE_CACHE_ROOT")]
    pub cache_root: Option<PathBuf>,

    /// Editing context the caches belong to
    #[arg(long, global = true, env = "NBCACHE_CONTEXT_ID")]
    pub context_id: Option<String>,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the root holding saved-document caches
    Root,

    /// Print the cache folder for a document or archive
    Folder(FolderArgs),

    /// Rebuild a document's cache from its archive
    Populate(PopulateArgs),

    /// Evict stale caches of closed documents
    Sweep(SweepArgs),
}

/// Arguments for the `folder` command.
#[derive(Debug, Clone, clap::Args)]
pub struct FolderArgs {
    /// Document or archive path
    pub file: PathBuf,
}

/// Arguments for the `populate` command.
#[derive(Debug, Clone, clap::Args)]
pub struct PopulateArgs {
    /// Document or archive path
    pub file: PathBuf,
}

/// Arguments for the `sweep` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct SweepArgs {
    /// Report what would be evicted without deleting anything
    #[arg(long)]
    pub dry_run: bool,

    /// Treat these documents as open (repeatable)
    #[arg(long = "open", value_name = "PATH")]
    pub open: Vec<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
