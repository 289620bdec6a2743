//! Document lock coordination.
//!
//! The coordinator is the public-facing state machine over the remote lock
//! service. Per document path it derives one of three states relative to the
//! calling account:
//! - `Unlocked`: no active lock
//! - `LockedBySelf`: held by the caller's identity
//! - `LockedByOther`: held by someone else
//!
//! # Policy
//!
//! Reads are served from the time-bounded [`crate::cache`]; mutations go to
//! the oracle directly, bypass the cache, invalidate it on success, and keep
//! the [`crate::store`] in step. Duplicate acquires by the holder and
//! releases of unlocked paths are idempotent and generate no oracle calls.
//! Force release requires the admin capability and ignores ownership.
//!
//! # Serialization
//!
//! Mutations on the same path are mutually exclusive with bounded waits;
//! different paths never block each other, since oracle calls are slow I/O.
//! Whenever a fresh remote table is obtained, local intent records with no
//! remote counterpart are pruned.

mod operations;
mod paths;
mod types;


// Re-export public API
pub use operations::{Coordinator, DEFAULT_PATH_WAIT};
pub use types::{AdminAuthority, AdminList, LockStatus};
