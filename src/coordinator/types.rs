//! Coordinator-facing types: derived lock states and the admin capability.

use crate::oracle::LockRecord;
use std::collections::BTreeSet;

/// Lock state of a document path relative to the calling account.
///
/// Derived from the remote table on every query, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockStatus {
    /// No active lock on the path.
    Unlocked,
    /// Locked, and the caller's identity matches the holder.
    LockedBySelf(LockRecord),
    /// Locked by a different identity.
    LockedByOther(LockRecord),
}

impl LockStatus {
    /// The underlying lock record, when the path is locked.
    pub fn record(&self) -> Option<&LockRecord> {
        match self {
            LockStatus::Unlocked => None,
            LockStatus::LockedBySelf(rec) | LockStatus::LockedByOther(rec) => Some(rec),
        }
    }

    /// Whether any lock is active on the path.
    pub fn is_locked(&self) -> bool {
        !matches!(self, LockStatus::Unlocked)
    }
}

/// Capability query for privileged override, supplied by an external
/// authorization collaborator. Consulted once per force-release.
pub trait AdminAuthority: Send + Sync {
    fn is_admin(&self, account_id: i64) -> bool;
}

/// Admin authority backed by a fixed id list from deployment config.
#[derive(Debug, Clone, Default)]
pub struct AdminList {
    ids: BTreeSet<i64>,
}

impl AdminList {
    pub fn new<I: IntoIterator<Item = i64>>(ids: I) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }
}

impl AdminAuthority for AdminList {
    fn is_admin(&self, account_id: i64) -> bool {
        self.ids.contains(&account_id)
    }
}
