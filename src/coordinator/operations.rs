//! Acquire, release, force-release, and status operations.

use super::paths::PathLocks;
use super::types::{AdminAuthority, LockStatus};
use crate::cache::{CachedTable, DEFAULT_TTL, LockCache};
use crate::error::{LockError, Result};
use crate::identity::IdentityResolver;
use crate::oracle::{LockOracle, LockOrigin, LockRecord, LockTable};
use crate::session::SessionStore;
use crate::store::LocalLockStore;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Default bound on waiting for another mutation on the same path.
pub const DEFAULT_PATH_WAIT: Duration = Duration::from_secs(15);

/// The document lock coordinator.
///
/// Reconciles the local cache and lock store with the remote lock table and
/// enforces single-writer semantics per document. Reads go through the cache;
/// mutations call the oracle directly, then invalidate the cache and update
/// the local store. All mutating operations on the same path are mutually
/// exclusive; different paths proceed independently.
pub struct Coordinator {
    oracle: Arc<dyn LockOracle>,
    cache: LockCache,
    store: Mutex<LocalLockStore>,
    identities: IdentityResolver,
    admin: Arc<dyn AdminAuthority>,
    sessions: Option<Arc<SessionStore>>,
    paths: PathLocks,
    path_wait: Duration,
}

impl Coordinator {
    /// Build a coordinator over the given collaborators, with the default
    /// cache TTL and path-wait bound.
    pub fn new(
        oracle: Arc<dyn LockOracle>,
        identities: IdentityResolver,
        admin: Arc<dyn AdminAuthority>,
        store: LocalLockStore,
    ) -> Self {
        Self {
            cache: LockCache::new(Arc::clone(&oracle), DEFAULT_TTL),
            oracle,
            store: Mutex::new(store),
            identities,
            admin,
            sessions: None,
            paths: PathLocks::new(),
            path_wait: DEFAULT_PATH_WAIT,
        }
    }

    /// Override the cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = LockCache::new(Arc::clone(&self.oracle), ttl);
        self
    }

    /// Override the bound on waiting for a same-path mutation.
    pub fn with_path_wait(mut self, timeout: Duration) -> Self {
        self.path_wait = timeout;
        self
    }

    /// Attach the front end's session store. The coordinator only reads it,
    /// to tell whether an acquire belongs to an active workflow.
    pub fn with_sessions(mut self, sessions: Arc<SessionStore>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// Acquire the lock on `path` for `account_id`.
    ///
    /// Idempotent for the current holder: a repeated acquire returns the
    /// existing record without another oracle call. Fails `Conflict` when a
    /// different identity holds the lock, `NotConfigured` when the account
    /// has no git identity.
    pub fn acquire(&self, path: &str, account_id: i64) -> Result<LockRecord> {
        let identity = self.identities.resolve(account_id)?.to_string();
        let _guard = self.paths.lock(path, self.path_wait)?;

        let view = self.fresh_view()?;
        match view.table.get(path) {
            Some(existing) if self.identities.owner_matches(&existing.owner, account_id) => {
                tracing::debug!(path, account_id, "acquire already satisfied by existing lock");
                Ok(existing.clone())
            }
            Some(existing) => Err(LockError::Conflict {
                owner: existing.owner.clone(),
            }),
            None => self.create_lock(path, account_id, &identity),
        }
    }

    fn create_lock(&self, path: &str, account_id: i64, identity: &str) -> Result<LockRecord> {
        let in_session = self
            .sessions
            .as_ref()
            .is_some_and(|s| s.get(account_id).is_some());

        match self.oracle.create(path, identity) {
            Ok(mut record) => {
                // Not yet confirmed by a remote listing.
                record.origin = LockOrigin::LocalPending;
                self.cache.invalidate();
                self.lock_store().record(&record)?;
                tracing::info!(path, owner = identity, in_session, "lock acquired");
                Ok(record)
            }
            Err(LockError::Conflict { owner }) => {
                // Lost a race against a writer that succeeded remotely after
                // our cache read; the cached table is stale.
                self.cache.invalidate();
                tracing::info!(path, winner = %owner, "acquire lost remote race");
                Err(LockError::Conflict { owner })
            }
            Err(err) => Err(err),
        }
    }

    /// Release the lock on `path` held by `account_id`.
    ///
    /// Releasing an unlocked path is idempotent success with no oracle call.
    /// Fails `Forbidden` when a different identity holds the lock.
    pub fn release(&self, path: &str, account_id: i64) -> Result<()> {
        let _guard = self.paths.lock(path, self.path_wait)?;

        let view = self.fresh_view()?;
        match view.table.get(path) {
            None => {
                tracing::debug!(path, "release of unlocked path, nothing to do");
                Ok(())
            }
            Some(existing) if self.identities.owner_matches(&existing.owner, account_id) => {
                self.remove_lock(path, false)
            }
            Some(existing) => Err(LockError::Forbidden {
                owner: Some(existing.owner.clone()),
            }),
        }
    }

    /// Forcibly release whatever lock exists on `path`, regardless of owner.
    ///
    /// Requires the admin capability. Removal is attempted even when the
    /// cached table shows no lock, to clear a possibly cache-stale one.
    pub fn force_release(&self, path: &str, admin_account_id: i64) -> Result<()> {
        if !self.admin.is_admin(admin_account_id) {
            tracing::warn!(path, account_id = admin_account_id, "force release denied");
            return Err(LockError::Forbidden { owner: None });
        }

        let _guard = self.paths.lock(path, self.path_wait)?;
        self.remove_lock(path, true)
    }

    /// Report the lock state of `path` relative to `account_id`.
    ///
    /// Pure read: serves from the cache, never mutates lock state. An account
    /// without an identity binding can still match a lock by numeric id.
    pub fn status(&self, path: &str, account_id: i64) -> Result<LockStatus> {
        let view = self.fresh_view()?;
        Ok(match view.table.get(path) {
            None => LockStatus::Unlocked,
            Some(rec) if self.identities.owner_matches(&rec.owner, account_id) => {
                LockStatus::LockedBySelf(rec.clone())
            }
            Some(rec) => LockStatus::LockedByOther(rec.clone()),
        })
    }

    /// The full lock table, served from the cache.
    pub fn list(&self) -> Result<LockTable> {
        Ok(self.fresh_view()?.table)
    }

    /// Remove a lock via the oracle and perform the follow-up bookkeeping.
    /// `NotFound` from the oracle means the lock was already gone; that is
    /// idempotent success, and the bookkeeping still runs.
    fn remove_lock(&self, path: &str, force: bool) -> Result<()> {
        match self.oracle.remove(path, force) {
            Ok(()) | Err(LockError::NotFound) => {}
            Err(err) => return Err(err),
        }
        self.cache.invalidate();
        self.lock_store().remove(path)?;
        tracing::info!(path, force, "lock released");
        Ok(())
    }

    /// Read the lock table through the cache and, when this call performed
    /// the refresh, reconcile the local store: intent records whose path no
    /// longer appears remotely are pruned. Local intent is always subordinate
    /// to remote truth.
    fn fresh_view(&self) -> Result<CachedTable> {
        let view = self.cache.get()?;
        if view.refreshed {
            self.lock_store().prune_missing(&view.table)?;
        }
        Ok(view)
    }

    fn lock_store(&self) -> MutexGuard<'_, LocalLockStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the local store currently records intent for `path`.
    pub fn has_local_intent(&self, path: &str) -> bool {
        self.lock_store().get(path).is_some()
    }

    /// Age the cached table artificially so TTL expiry is testable without
    /// sleeping.
    #[cfg(test)]
    pub(crate) fn backdate_cache(&self, by: Duration) {
        self.cache.backdate(by);
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("path_wait", &self.path_wait)
            .finish()
    }
}
