//! Error types for doclock.
//!
//! Uses thiserror for derive macros. The variants mirror the lock service's
//! error taxonomy plus the local configuration and storage failure modes.
//! Errors are `Clone` so a single failed cache refresh can be reported to
//! every caller that was waiting on it.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for doclock operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    /// Another identity holds the lock. Carries the owner so the front end
    /// can display who to contact.
    #[error("document is locked by {owner}")]
    Conflict {
        /// Identity reported by the lock service as the current holder.
        owner: String,
    },

    /// The caller attempted a mutation without ownership and without admin
    /// privilege. Not retryable without forcing.
    #[error("not the lock owner{}", owner.as_deref().map(|o| format!(" (held by {o})")).unwrap_or_default())]
    Forbidden {
        /// Current holder, when known.
        owner: Option<String>,
    },

    /// The lock service could not be reached or timed out. Transient; the
    /// caller may retry the whole operation.
    #[error("lock service unavailable: {0}")]
    Unavailable(String),

    /// The lock no longer exists. Removal paths treat this as idempotent
    /// success; it only surfaces from the oracle adapter itself.
    #[error("no such lock")]
    NotFound,

    /// The account has no git identity binding. A configuration problem,
    /// distinct from a contested lock.
    #[error("account {0} has no configured git identity")]
    NotConfigured(i64),

    /// Deployment configuration could not be loaded or failed validation.
    #[error("{0}")]
    ConfigError(String),

    /// The local lock store could not be read or written.
    #[error("lock store error: {0}")]
    StoreError(String),
}

impl LockError {
    /// Returns the appropriate CLI exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LockError::Conflict { .. } => exit_codes::CONFLICT,
            LockError::Forbidden { .. } => exit_codes::FORBIDDEN,
            LockError::Unavailable(_) => exit_codes::UNAVAILABLE,
            LockError::NotFound => exit_codes::USER_ERROR,
            LockError::NotConfigured(_) => exit_codes::USER_ERROR,
            LockError::ConfigError(_) => exit_codes::USER_ERROR,
            LockError::StoreError(_) => exit_codes::USER_ERROR,
        }
    }
}

/// Result type alias for doclock operations.
pub type Result<T> = std::result::Result<T, LockError>;
