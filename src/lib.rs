//! Doclock: coordinator for exclusive document editing backed by Git LFS locks.
//!
//! Multiple users edit shared documents kept in a Git repository; the
//! authoritative lock state lives in the Git LFS lock service, reachable only
//! through slow blocking calls. This crate mediates that access:
//!
//! - [`oracle`]: the blocking three-operation contract to the lock service
//!   (create / list / remove), with a production `git lfs` adapter and an
//!   in-memory one for tests
//! - [`cache`]: a TTL-bounded, single-flight cache of the remote lock table
//! - [`store`]: a durable, advisory record of locks this process created
//! - [`identity`]: account id to git identity resolution and the ownership
//!   comparison rule
//! - [`session`]: ephemeral per-account front-end workflow state
//! - [`coordinator`]: the public state machine: acquire / release /
//!   force-release / status with per-path serialization and reconciliation
//!
//! The `cli` and `commands` modules expose the same operations as a small
//! operator CLI.

pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod exit_codes;
pub mod identity;
pub mod oracle;
pub mod session;
pub mod store;
