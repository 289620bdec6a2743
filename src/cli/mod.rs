//! CLI argument parsing for doclock.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};

/// Doclock: coordinator for exclusive document editing backed by Git LFS locks.
///
/// Documents live in a Git repository and are guarded by Git LFS locks.
/// doclock reconciles a local cache and intent store with the remote lock
/// table and enforces single-writer access per document.
#[derive(Parser, Debug)]
#[command(name = "doclock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the deployment config file.
    #[arg(long, global = true, default_value = "doclock.yaml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for doclock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the lock state of one document.
    ///
    /// Reports whether the document is unlocked, held by the acting
    /// account, or held by someone else.
    Status(StatusArgs),

    /// List every active lock with owner and age.
    List,

    /// Acquire the lock on a document.
    ///
    /// Idempotent when the acting account already holds it.
    Lock(LockArgs),

    /// Release the lock on a document.
    ///
    /// Only the holder may release; admins can pass --force to clear a
    /// lock regardless of owner.
    Unlock(UnlockArgs),
}

/// Arguments for the `status` command.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Repository-relative document path.
    pub path: String,

    /// Acting account id.
    #[arg(short, long)]
    pub account: i64,
}

/// Arguments for the `lock` command.
#[derive(Parser, Debug)]
pub struct LockArgs {
    /// Repository-relative document path.
    pub path: String,

    /// Acting account id.
    #[arg(short, long)]
    pub account: i64,
}

/// Arguments for the `unlock` command.
#[derive(Parser, Debug)]
pub struct UnlockArgs {
    /// Repository-relative document path.
    pub path: String,

    /// Acting account id.
    #[arg(short, long)]
    pub account: i64,

    /// Clear the lock regardless of owner (admin accounts only).
    #[arg(long)]
    pub force: bool,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
