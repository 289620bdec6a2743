//! In-memory oracle adapter.
//!
//! Behaves like the remote lock service without any I/O, which makes
//! concurrency tests deterministic: call counts are observable, failures are
//! injectable, and ownership is attributed from the identity the coordinator
//! passes to `create`.

use super::{LockOracle, LockOrigin, LockRecord, LockTable};
use crate::error::{LockError, Result};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
struct MemoryState {
    locks: BTreeMap<String, LockRecord>,
    next_id: u64,
    fail_lists: u32,
    fail_creates: u32,
}

/// Deterministic stand-in for the remote lock service.
#[derive(Debug, Default)]
pub struct MemoryOracle {
    state: Mutex<MemoryState>,
    create_calls: AtomicUsize,
    list_calls: AtomicUsize,
    remove_calls: AtomicUsize,
}

impl MemoryOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `create` calls observed so far.
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of `list` calls observed so far.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of `remove` calls observed so far.
    pub fn remove_calls(&self) -> usize {
        self.remove_calls.load(Ordering::SeqCst)
    }

    /// Make the next `n` `list` calls fail with `Unavailable`.
    pub fn fail_next_lists(&self, n: u32) {
        self.lock_state().fail_lists = n;
    }

    /// Make the next `n` `create` calls fail with `Unavailable`.
    pub fn fail_next_creates(&self, n: u32) {
        self.lock_state().fail_creates = n;
    }

    /// Seed a lock directly, bypassing `create` and its counters.
    pub fn seed(&self, path: &str, owner: &str) {
        let mut state = self.lock_state();
        state.next_id += 1;
        let record = LockRecord {
            path: path.to_string(),
            owner: owner.to_string(),
            id: state.next_id.to_string(),
            locked_at: Some(Utc::now()),
            origin: LockOrigin::Remote,
        };
        state.locks.insert(path.to_string(), record);
    }

    /// Drop a lock directly, simulating out-of-band release or expiry.
    pub fn evict(&self, path: &str) {
        self.lock_state().locks.remove(path);
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LockOracle for MemoryOracle {
    fn create(&self, path: &str, owner: &str) -> Result<LockRecord> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock_state();

        if state.fail_creates > 0 {
            state.fail_creates -= 1;
            return Err(LockError::Unavailable("injected create failure".into()));
        }

        if let Some(existing) = state.locks.get(path) {
            return Err(LockError::Conflict {
                owner: existing.owner.clone(),
            });
        }

        state.next_id += 1;
        let record = LockRecord {
            path: path.to_string(),
            owner: owner.to_string(),
            id: state.next_id.to_string(),
            locked_at: Some(Utc::now()),
            origin: LockOrigin::Remote,
        };
        state.locks.insert(path.to_string(), record.clone());
        Ok(record)
    }

    fn list(&self) -> Result<LockTable> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock_state();

        if state.fail_lists > 0 {
            state.fail_lists -= 1;
            return Err(LockError::Unavailable("injected list failure".into()));
        }

        Ok(state.locks.clone())
    }

    fn remove(&self, path: &str, _force: bool) -> Result<()> {
        self.remove_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock_state();

        if state.locks.remove(path).is_none() {
            return Err(LockError::NotFound);
        }
        Ok(())
    }
}
