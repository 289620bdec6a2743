//! Durable record of locks this process believes it created.
//!
//! The store is purely advisory: it annotates "this process likely created
//! this lock" and is pruned whenever a fresh remote listing no longer
//! contains a recorded path. Acquire and release decisions never consult it;
//! only the remote table decides ownership.
//!
//! The store persists as a JSON map in a single file, written atomically
//! (temp file in the same directory, fsync, rename) so a crash never leaves
//! a truncated store behind.

use crate::error::{LockError, Result};
use crate::oracle::{LockRecord, LockTable};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// A local, non-authoritative note that this process created a remote lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalIntentRecord {
    /// Repository-relative document path.
    pub path: String,

    /// Identity the lock was created for.
    pub owner: String,

    /// Opaque lock token the service assigned.
    pub lock_id: String,

    /// When this process created the lock (RFC3339).
    pub created_at: DateTime<Utc>,
}

/// Keyed record store for local lock intent, durable across restarts.
#[derive(Debug)]
pub struct LocalLockStore {
    file: PathBuf,
    entries: BTreeMap<String, LocalIntentRecord>,
}

impl LocalLockStore {
    /// Load the store from `file`. A missing file is an empty store; a
    /// malformed file is an error rather than silent data loss.
    pub fn load<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref().to_path_buf();

        let entries = if file.exists() {
            let content = fs::read_to_string(&file).map_err(|e| {
                LockError::StoreError(format!("failed to read '{}': {}", file.display(), e))
            })?;
            serde_json::from_str(&content).map_err(|e| {
                LockError::StoreError(format!("failed to parse '{}': {}", file.display(), e))
            })?
        } else {
            BTreeMap::new()
        };

        Ok(Self { file, entries })
    }

    /// Record intent for a freshly created lock, overwriting any previous
    /// record for the same path.
    pub fn record(&mut self, lock: &LockRecord) -> Result<()> {
        self.entries.insert(
            lock.path.clone(),
            LocalIntentRecord {
                path: lock.path.clone(),
                owner: lock.owner.clone(),
                lock_id: lock.id.clone(),
                created_at: lock.locked_at.unwrap_or_else(Utc::now),
            },
        );
        self.persist()
    }

    /// Drop the record for `path` after a successful release. A path that
    /// was never recorded is fine; the store only tracks our own creations.
    pub fn remove(&mut self, path: &str) -> Result<()> {
        if self.entries.remove(path).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    /// Reconcile against a fresh remote table: every recorded path absent
    /// from the table was released or expired out-of-band, so its record is
    /// deleted. Returns the pruned paths.
    pub fn prune_missing(&mut self, table: &LockTable) -> Result<Vec<String>> {
        let stale: Vec<String> = self
            .entries
            .keys()
            .filter(|path| !table.contains_key(*path))
            .cloned()
            .collect();

        if !stale.is_empty() {
            for path in &stale {
                self.entries.remove(path);
                tracing::info!(path, "pruned stale local lock intent");
            }
            self.persist()?;
        }
        Ok(stale)
    }

    /// Look up the intent record for a path.
    pub fn get(&self, path: &str) -> Option<&LocalIntentRecord> {
        self.entries.get(path)
    }

    /// Number of recorded intents.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store has no recorded intents.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the store atomically: temp file in the same directory, fsync,
    /// then rename over the target.
    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.file.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| {
                LockError::StoreError(format!(
                    "failed to create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| LockError::StoreError(format!("failed to serialize store: {}", e)))?;

        let temp = self.temp_path();
        let mut out = File::create(&temp).map_err(|e| {
            LockError::StoreError(format!("failed to create '{}': {}", temp.display(), e))
        })?;
        out.write_all(json.as_bytes())
            .and_then(|()| out.sync_all())
            .map_err(|e| {
                let _ = fs::remove_file(&temp);
                LockError::StoreError(format!("failed to write '{}': {}", temp.display(), e))
            })?;

        fs::rename(&temp, &self.file).map_err(|e| {
            let _ = fs::remove_file(&temp);
            LockError::StoreError(format!(
                "failed to replace '{}': {}",
                self.file.display(),
                e
            ))
        })
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "locks.json".to_string());
        self.file.with_file_name(format!(".{}.tmp", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::LockOrigin;
    use tempfile::TempDir;

    fn record(path: &str, owner: &str, id: &str) -> LockRecord {
        LockRecord {
            path: path.to_string(),
            owner: owner.to_string(),
            id: id.to_string(),
            locked_at: Some(Utc::now()),
            origin: LockOrigin::LocalPending,
        }
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = LocalLockStore::load(dir.path().join("locks.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn record_survives_reload() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("locks.json");

        let mut store = LocalLockStore::load(&file).unwrap();
        store.record(&record("docs/spec.docx", "alice", "42")).unwrap();

        let reloaded = LocalLockStore::load(&file).unwrap();
        let intent = reloaded.get("docs/spec.docx").unwrap();
        assert_eq!(intent.owner, "alice");
        assert_eq!(intent.lock_id, "42");
    }

    #[test]
    fn record_overwrites_previous_intent_for_same_path() {
        let dir = TempDir::new().unwrap();
        let mut store = LocalLockStore::load(dir.path().join("locks.json")).unwrap();

        store.record(&record("docs/spec.docx", "alice", "1")).unwrap();
        store.record(&record("docs/spec.docx", "alice", "2")).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("docs/spec.docx").unwrap().lock_id, "2");
    }

    #[test]
    fn remove_unrecorded_path_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let mut store = LocalLockStore::load(dir.path().join("locks.json")).unwrap();
        store.remove("docs/never.docx").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn prune_missing_drops_paths_absent_from_remote_table() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("locks.json");
        let mut store = LocalLockStore::load(&file).unwrap();

        store.record(&record("docs/kept.docx", "alice", "1")).unwrap();
        store.record(&record("docs/gone.docx", "alice", "2")).unwrap();

        let mut table = LockTable::new();
        let kept = record("docs/kept.docx", "alice", "1");
        table.insert(kept.path.clone(), kept);

        let pruned = store.prune_missing(&table).unwrap();
        assert_eq!(pruned, vec!["docs/gone.docx".to_string()]);
        assert!(store.get("docs/gone.docx").is_none());
        assert!(store.get("docs/kept.docx").is_some());

        // Pruning persisted.
        let reloaded = LocalLockStore::load(&file).unwrap();
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn prune_with_nothing_missing_keeps_everything() {
        let dir = TempDir::new().unwrap();
        let mut store = LocalLockStore::load(dir.path().join("locks.json")).unwrap();

        let rec = record("docs/spec.docx", "alice", "1");
        store.record(&rec).unwrap();

        let mut table = LockTable::new();
        table.insert(rec.path.clone(), rec);

        assert!(store.prune_missing(&table).unwrap().is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn malformed_store_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("locks.json");
        fs::write(&file, "not json").unwrap();

        let err = LocalLockStore::load(&file).unwrap_err();
        assert!(matches!(err, LockError::StoreError(_)));
    }
}
