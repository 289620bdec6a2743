//! Ephemeral per-account workflow state.
//!
//! The session store sequences multi-step front-end interactions such as
//! "user selected document X, now awaiting upload". It is never a source of
//! ownership truth: the coordinator reads it only to tell whether an acquire
//! belongs to an active workflow, and never mutates it. Entries expire
//! lazily; an expired session is dropped on the next `get`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Default session lifetime.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(900);

/// Where an account is in its current workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStep {
    /// A document is selected and actions on it are being chosen.
    DocumentSelected,
    /// An edited copy of the selected document is expected next.
    AwaitingUpload,
    /// The account is walking through repository configuration.
    ConfiguringRepo,
}

/// Workflow state for one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Account this session belongs to.
    pub account_id: i64,

    /// Current workflow step.
    pub step: SessionStep,

    /// Step-specific data, e.g. the selected document path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    /// When this session stops being valid.
    pub expires_at: DateTime<Utc>,
}

impl SessionState {
    /// Create a session expiring `ttl` from now.
    pub fn new(account_id: i64, step: SessionStep, payload: Option<Value>, ttl: Duration) -> Self {
        Self {
            account_id,
            step,
            payload,
            expires_at: Utc::now()
                + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero()),
        }
    }

    fn expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// Process-wide map of active sessions, keyed by account id.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<i64, SessionState>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the session for an account. An expired session is cleared and
    /// reported as absent.
    pub fn get(&self, account_id: i64) -> Option<SessionState> {
        let mut sessions = self.lock_sessions();
        match sessions.get(&account_id) {
            Some(state) if state.expired() => {
                sessions.remove(&account_id);
                None
            }
            Some(state) => Some(state.clone()),
            None => None,
        }
    }

    /// Install or replace the session for an account.
    pub fn set(&self, state: SessionState) {
        self.lock_sessions().insert(state.account_id, state);
    }

    /// Drop the session for an account, if any.
    pub fn clear(&self, account_id: i64) {
        self.lock_sessions().remove(&account_id);
    }

    /// Drop every session. Used at shutdown and between tests.
    pub fn clear_all(&self) {
        self.lock_sessions().clear();
    }

    fn lock_sessions(&self) -> MutexGuard<'_, HashMap<i64, SessionState>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_then_get_round_trips() {
        let store = SessionStore::new();
        store.set(SessionState::new(
            100,
            SessionStep::DocumentSelected,
            Some(json!({"doc": "docs/spec.docx"})),
            DEFAULT_SESSION_TTL,
        ));

        let state = store.get(100).unwrap();
        assert_eq!(state.step, SessionStep::DocumentSelected);
        assert_eq!(state.payload.unwrap()["doc"], "docs/spec.docx");
    }

    #[test]
    fn get_unknown_account_is_none() {
        let store = SessionStore::new();
        assert!(store.get(999).is_none());
    }

    #[test]
    fn expired_session_is_cleared_lazily_on_get() {
        let store = SessionStore::new();
        store.set(SessionState::new(
            100,
            SessionStep::AwaitingUpload,
            None,
            Duration::ZERO,
        ));

        assert!(store.get(100).is_none());
        // The entry itself was dropped, not just hidden.
        assert!(store.lock_sessions().get(&100).is_none());
    }

    #[test]
    fn set_replaces_previous_session() {
        let store = SessionStore::new();
        store.set(SessionState::new(
            100,
            SessionStep::DocumentSelected,
            None,
            DEFAULT_SESSION_TTL,
        ));
        store.set(SessionState::new(
            100,
            SessionStep::AwaitingUpload,
            None,
            DEFAULT_SESSION_TTL,
        ));

        assert_eq!(store.get(100).unwrap().step, SessionStep::AwaitingUpload);
    }

    #[test]
    fn clear_removes_only_the_given_account() {
        let store = SessionStore::new();
        store.set(SessionState::new(
            100,
            SessionStep::DocumentSelected,
            None,
            DEFAULT_SESSION_TTL,
        ));
        store.set(SessionState::new(
            200,
            SessionStep::ConfiguringRepo,
            None,
            DEFAULT_SESSION_TTL,
        ));

        store.clear(100);
        assert!(store.get(100).is_none());
        assert!(store.get(200).is_some());

        store.clear_all();
        assert!(store.get(200).is_none());
    }
}
