//! Tests for the oracle contract and adapters.

use super::memory::MemoryOracle;
use super::*;
use crate::error::LockError;
use chrono::{Duration, Utc};

#[test]
fn memory_create_then_list_round_trips() {
    let oracle = MemoryOracle::new();
    let record = oracle.create("docs/spec.docx", "alice").unwrap();

    assert_eq!(record.path, "docs/spec.docx");
    assert_eq!(record.owner, "alice");
    assert_eq!(record.origin, LockOrigin::Remote);

    let table = oracle.list().unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table["docs/spec.docx"].owner, "alice");
}

#[test]
fn memory_create_conflicts_with_existing_holder() {
    let oracle = MemoryOracle::new();
    oracle.create("docs/plan.docx", "alice").unwrap();

    let err = oracle.create("docs/plan.docx", "bob").unwrap_err();
    assert_eq!(
        err,
        LockError::Conflict {
            owner: "alice".to_string()
        }
    );
}

#[test]
fn memory_remove_missing_lock_is_not_found() {
    let oracle = MemoryOracle::new();
    assert_eq!(oracle.remove("docs/none.docx", false), Err(LockError::NotFound));
}

#[test]
fn memory_remove_clears_the_lock() {
    let oracle = MemoryOracle::new();
    oracle.create("docs/spec.docx", "alice").unwrap();
    oracle.remove("docs/spec.docx", false).unwrap();
    assert!(oracle.list().unwrap().is_empty());
}

#[test]
fn memory_counts_calls() {
    let oracle = MemoryOracle::new();
    oracle.create("a", "alice").unwrap();
    oracle.list().unwrap();
    oracle.list().unwrap();
    let _ = oracle.remove("a", false);

    assert_eq!(oracle.create_calls(), 1);
    assert_eq!(oracle.list_calls(), 2);
    assert_eq!(oracle.remove_calls(), 1);
}

#[test]
fn memory_injected_list_failures_are_consumed_in_order() {
    let oracle = MemoryOracle::new();
    oracle.fail_next_lists(1);

    assert!(matches!(
        oracle.list().unwrap_err(),
        LockError::Unavailable(_)
    ));
    assert!(oracle.list().is_ok());
}

#[test]
fn age_string_formats_by_magnitude() {
    let mut record = LockRecord {
        path: "docs/spec.docx".to_string(),
        owner: "alice".to_string(),
        id: "1".to_string(),
        locked_at: Some(Utc::now()),
        origin: LockOrigin::Remote,
    };
    assert!(record.age_string().ends_with('m'));

    record.locked_at = Some(Utc::now() - Duration::hours(3));
    assert!(record.age_string().contains('h'));

    record.locked_at = Some(Utc::now() - Duration::days(2));
    assert!(record.age_string().contains('d'));

    record.locked_at = None;
    assert_eq!(record.age_string(), "unknown");
}

#[test]
fn lock_record_serde_round_trip() {
    let record = LockRecord {
        path: "docs/spec.docx".to_string(),
        owner: "alice".to_string(),
        id: "42".to_string(),
        locked_at: Some(Utc::now()),
        origin: LockOrigin::LocalPending,
    };
    let json = serde_json::to_string(&record).unwrap();
    let parsed: LockRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, record);
}
