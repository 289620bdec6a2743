//! Time-bounded read-through cache of the remote lock table.
//!
//! Reads are served from the cached table while it is younger than the TTL.
//! An expired entry triggers a refresh that is single-flight: all callers
//! that miss concurrently share one oracle `list()` call and observe the same
//! resulting table or the same error. Mutating operations never write through
//! the cache; the coordinator invalidates it after every successful mutation.
//! A refresh that an invalidation overlaps may have listed the service before
//! the mutation, so its table is handed to the caller but never installed;
//! the next read refreshes again.

use crate::error::{LockError, Result};
use crate::oracle::{LockOracle, LockTable};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Default maximum age at which a cached table is still served.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// A lock table as served by the cache.
#[derive(Debug, Clone)]
pub struct CachedTable {
    /// The full remote lock table.
    pub table: LockTable,

    /// Whether this call performed a refresh that no invalidation overlapped.
    /// The coordinator runs its reconciliation pass only on such tables, and
    /// only once per refresh. A refresh overlapped by a mutation may predate
    /// it and is reported as not fresh.
    pub refreshed: bool,
}

#[derive(Debug, Default)]
struct CacheState {
    entry: Option<CacheEntry>,
    refreshing: bool,
    /// Bumped once per completed refresh, success or failure. Waiters use it
    /// to tell "the refresh I was waiting on finished" from a spurious wakeup.
    generation: u64,
    /// Bumped on every `invalidate()`. A refresh records the value it started
    /// under; a mismatch at completion means a mutation landed mid-flight and
    /// the fetched table may predate it, so it must not be installed.
    invalidations: u64,
    /// Error of the most recent completed refresh, shared with waiters.
    last_error: Option<LockError>,
}

#[derive(Debug)]
struct CacheEntry {
    table: LockTable,
    fetched_at: Instant,
}

/// Single-flight, TTL-bounded cache over [`LockOracle::list`].
pub struct LockCache {
    oracle: Arc<dyn LockOracle>,
    ttl: Duration,
    state: Mutex<CacheState>,
    refresh_done: Condvar,
}

impl LockCache {
    /// Create a cache reading through the given oracle.
    pub fn new(oracle: Arc<dyn LockOracle>, ttl: Duration) -> Self {
        Self {
            oracle,
            ttl,
            state: Mutex::new(CacheState::default()),
            refresh_done: Condvar::new(),
        }
    }

    /// Return the lock table, refreshing from the oracle when the cached
    /// entry is missing or older than the TTL.
    pub fn get(&self) -> Result<CachedTable> {
        let mut state = self.lock_state();

        loop {
            if let Some(entry) = &state.entry
                && entry.fetched_at.elapsed() <= self.ttl
            {
                return Ok(CachedTable {
                    table: entry.table.clone(),
                    refreshed: false,
                });
            }

            if !state.refreshing {
                break;
            }

            // Another caller is refreshing; wait for that flight to land and
            // adopt its outcome.
            let observed = state.generation;
            while state.refreshing && state.generation == observed {
                state = self
                    .refresh_done
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            if state.generation != observed
                && let Some(err) = &state.last_error
            {
                return Err(err.clone());
            }
            // A successful refresh landed (or the flight belonged to an older
            // round); re-evaluate from the top.
        }

        state.refreshing = true;
        let epoch = state.invalidations;
        drop(state);

        let result = self.oracle.list();

        let mut state = self.lock_state();
        state.refreshing = false;
        state.generation = state.generation.wrapping_add(1);
        let outcome = match result {
            Ok(table) => {
                let refreshed = state.invalidations == epoch;
                if refreshed {
                    state.entry = Some(CacheEntry {
                        table: table.clone(),
                        fetched_at: Instant::now(),
                    });
                }
                state.last_error = None;
                Ok(CachedTable { table, refreshed })
            }
            Err(err) => {
                state.last_error = Some(err.clone());
                Err(err)
            }
        };
        drop(state);
        self.refresh_done.notify_all();
        outcome
    }

    /// Drop the cached entry so the next `get()` forces a refresh.
    ///
    /// Called by the coordinator immediately after any successful mutation,
    /// never by readers.
    pub fn invalidate(&self) {
        let mut state = self.lock_state();
        state.entry = None;
        state.last_error = None;
        state.invalidations = state.invalidations.wrapping_add(1);
    }

    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Age the cached entry artificially so TTL expiry is testable without
    /// sleeping.
    #[cfg(test)]
    pub(crate) fn backdate(&self, by: Duration) {
        let mut state = self.lock_state();
        if let Some(entry) = &mut state.entry {
            entry.fetched_at -= by;
        }
    }
}

impl std::fmt::Debug for LockCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockCache").field("ttl", &self.ttl).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::memory::MemoryOracle;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    /// Oracle wrapper that makes `list` slow enough for callers to pile up.
    struct SlowOracle {
        inner: MemoryOracle,
        delay: Duration,
    }

    impl LockOracle for SlowOracle {
        fn create(&self, path: &str, owner: &str) -> Result<crate::oracle::LockRecord> {
            self.inner.create(path, owner)
        }

        fn list(&self) -> Result<LockTable> {
            thread::sleep(self.delay);
            self.inner.list()
        }

        fn remove(&self, path: &str, force: bool) -> Result<()> {
            self.inner.remove(path, force)
        }
    }

    #[test]
    fn fresh_entry_is_served_without_a_new_list_call() {
        let oracle = Arc::new(MemoryOracle::new());
        oracle.seed("docs/spec.docx", "alice");
        let cache = LockCache::new(oracle.clone(), DEFAULT_TTL);

        let first = cache.get().unwrap();
        assert!(first.refreshed);
        assert_eq!(oracle.list_calls(), 1);

        // Just inside the TTL: same table, no new oracle call.
        cache.backdate(DEFAULT_TTL - Duration::from_secs(1));
        let second = cache.get().unwrap();
        assert!(!second.refreshed);
        assert_eq!(second.table, first.table);
        assert_eq!(oracle.list_calls(), 1);
    }

    #[test]
    fn expired_entry_triggers_exactly_one_new_list_call() {
        let oracle = Arc::new(MemoryOracle::new());
        let cache = LockCache::new(oracle.clone(), DEFAULT_TTL);

        cache.get().unwrap();
        cache.backdate(DEFAULT_TTL + Duration::from_secs(1));

        let view = cache.get().unwrap();
        assert!(view.refreshed);
        assert_eq!(oracle.list_calls(), 2);
    }

    #[test]
    fn invalidate_forces_a_refresh_on_next_get() {
        let oracle = Arc::new(MemoryOracle::new());
        let cache = LockCache::new(oracle.clone(), DEFAULT_TTL);

        cache.get().unwrap();
        cache.invalidate();
        let view = cache.get().unwrap();

        assert!(view.refreshed);
        assert_eq!(oracle.list_calls(), 2);
    }

    #[test]
    fn concurrent_misses_share_one_list_call() {
        let inner = MemoryOracle::new();
        inner.seed("docs/spec.docx", "alice");
        let oracle = Arc::new(SlowOracle {
            inner,
            delay: Duration::from_millis(100),
        });
        let cache = Arc::new(LockCache::new(oracle.clone(), DEFAULT_TTL));

        let refresher_count = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let refreshers = Arc::clone(&refresher_count);
                thread::spawn(move || {
                    let view = cache.get().unwrap();
                    if view.refreshed {
                        refreshers.fetch_add(1, Ordering::SeqCst);
                    }
                    view.table
                })
            })
            .collect();

        let tables: Vec<LockTable> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(oracle.inner.list_calls(), 1);
        assert_eq!(refresher_count.load(Ordering::SeqCst), 1);
        for table in &tables {
            assert_eq!(table, &tables[0]);
        }
    }

    #[test]
    fn concurrent_misses_share_one_error() {
        let inner = MemoryOracle::new();
        inner.fail_next_lists(1);
        let oracle = Arc::new(SlowOracle {
            inner,
            delay: Duration::from_millis(100),
        });
        let cache = Arc::new(LockCache::new(oracle.clone(), DEFAULT_TTL));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.get())
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(oracle.inner.list_calls(), 1);
        for result in results {
            assert!(matches!(result, Err(LockError::Unavailable(_))));
        }
    }

    #[test]
    fn refresh_overlapping_an_invalidation_is_not_cached() {
        let oracle = Arc::new(SlowOracle {
            inner: MemoryOracle::new(),
            delay: Duration::from_millis(200),
        });
        let cache = Arc::new(LockCache::new(oracle.clone(), DEFAULT_TTL));

        let refresher = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || cache.get().unwrap())
        };
        // A mutation lands while the listing is in flight.
        thread::sleep(Duration::from_millis(50));
        oracle.inner.seed("docs/spec.docx", "alice");
        cache.invalidate();

        // The overlapped refresh must not claim freshness or install its
        // table; the next reader goes back to the oracle and sees the lock.
        let view = refresher.join().unwrap();
        assert!(!view.refreshed);

        let next = cache.get().unwrap();
        assert!(next.refreshed);
        assert!(next.table.contains_key("docs/spec.docx"));
        assert_eq!(oracle.inner.list_calls(), 2);
    }

    #[test]
    fn refresh_after_shared_error_reaches_the_oracle_again() {
        let oracle = Arc::new(MemoryOracle::new());
        oracle.fail_next_lists(1);
        let cache = LockCache::new(oracle.clone(), DEFAULT_TTL);

        assert!(cache.get().is_err());
        // The failure is not cached; the next reader retries the oracle.
        assert!(cache.get().is_ok());
        assert_eq!(oracle.list_calls(), 2);
    }
}
