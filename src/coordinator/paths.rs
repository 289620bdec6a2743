//! Per-path mutual exclusion for mutating lock operations.
//!
//! Mutations on the same document path are totally ordered; operations on
//! different paths never block one another. Waits are bounded: a caller that
//! cannot enter the critical section before its deadline fails `Unavailable`
//! and is left holding no partial state.

use crate::error::{LockError, Result};
use std::collections::HashSet;
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Set of paths with a mutation currently in flight.
#[derive(Debug, Default)]
pub(crate) struct PathLocks {
    busy: Mutex<HashSet<String>>,
    freed: Condvar,
}

/// RAII guard for one path's critical section. Dropping it releases the path
/// and wakes waiters.
#[derive(Debug)]
pub(crate) struct PathGuard<'a> {
    locks: &'a PathLocks,
    path: String,
}

impl PathLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Enter the critical section for `path`, waiting at most `timeout` for
    /// any in-flight mutation on the same path to finish.
    pub(crate) fn lock(&self, path: &str, timeout: Duration) -> Result<PathGuard<'_>> {
        let deadline = Instant::now() + timeout;
        let mut busy = self.busy.lock().unwrap_or_else(PoisonError::into_inner);

        while busy.contains(path) {
            let now = Instant::now();
            if now >= deadline {
                return Err(LockError::Unavailable(format!(
                    "timed out waiting for an in-flight operation on '{}'",
                    path
                )));
            }
            let (guard, _timeout_result) = self
                .freed
                .wait_timeout(busy, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            busy = guard;
        }

        busy.insert(path.to_string());
        Ok(PathGuard {
            locks: self,
            path: path.to_string(),
        })
    }
}

impl Drop for PathGuard<'_> {
    fn drop(&mut self) {
        let mut busy = self
            .locks
            .busy
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        busy.remove(&self.path);
        drop(busy);
        self.locks.freed.notify_all();
    }
}
