//! Remote lock oracle contract.
//!
//! The oracle is the external distributed lock service that authoritatively
//! tracks which identity holds which document lock. Everything above this
//! module depends only on the three-operation contract defined here and the
//! error taxonomy in [`crate::error`]; the concrete transport lives in the
//! adapters:
//!
//! - [`lfs::LfsOracle`]: production adapter shelling out to `git lfs` with a
//!   bounded timeout.
//! - [`memory::MemoryOracle`]: deterministic in-memory adapter with call
//!   counters and fault injection, for tests.
//!
//! All operations are blocking and possibly slow; callers must treat them as
//! the only suspension points in a lock operation.

pub mod lfs;
pub mod memory;

#[cfg(test)]
mod tests;

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where a lock record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockOrigin {
    /// Reported by the remote lock table.
    Remote,
    /// Created by this process and not yet confirmed by a remote listing.
    LocalPending,
}

/// A single document lock as exposed by the lock service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    /// Repository-relative document path.
    pub path: String,

    /// Identity the lock service reports as the holder.
    pub owner: String,

    /// Opaque lock token assigned by the service. Kept for display and the
    /// local store; removal is keyed by path.
    pub id: String,

    /// When the lock was created, when the service reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_at: Option<DateTime<Utc>>,

    /// Provenance of this record.
    pub origin: LockOrigin,
}

impl LockRecord {
    /// Format the lock age as a human-readable string, or "unknown" when the
    /// service did not report a creation time.
    pub fn age_string(&self) -> String {
        let Some(locked_at) = self.locked_at else {
            return "unknown".to_string();
        };
        let age = Utc::now().signed_duration_since(locked_at);
        let minutes = age.num_minutes();
        let hours = age.num_hours();
        let days = age.num_days();

        if days > 0 {
            format!("{}d {}h", days, hours % 24)
        } else if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else {
            format!("{}m", minutes.max(0))
        }
    }
}

/// The full remote lock table, keyed by document path.
pub type LockTable = BTreeMap<String, LockRecord>;

/// Blocking interface to the external lock service.
///
/// Implementations report failures using the shared taxonomy: `Conflict` when
/// a create loses to an existing lock, `NotFound` when a removal targets a
/// lock that no longer exists, `Forbidden` when the service itself refuses an
/// unforced removal, and `Unavailable` for transport failures and timeouts.
/// `list` never partially applies: callers get a complete table or an error.
pub trait LockOracle: Send + Sync {
    /// Create a lock on `path` for the resolved identity.
    ///
    /// The production service derives the owner from transport credentials;
    /// `owner` is passed so in-memory adapters can attribute ownership
    /// deterministically.
    fn create(&self, path: &str, owner: &str) -> Result<LockRecord>;

    /// List every active lock.
    fn list(&self) -> Result<LockTable>;

    /// Remove the lock on `path`. With `force` the service removes it
    /// regardless of who holds it.
    fn remove(&self, path: &str, force: bool) -> Result<()>;
}
