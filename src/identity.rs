//! Identity resolution for lock ownership checks.
//!
//! The lock service reports owners as git identity strings, while callers are
//! known by numeric account ids. This module holds the read-only bindings
//! between the two and implements the single documented comparison rule:
//! a lock owner matches an account if it equals the numeric id rendered as a
//! string, or equals the bound git identity case-insensitively. No partial or
//! fuzzy matching.

use crate::error::{LockError, Result};
use std::collections::BTreeMap;

/// One account-to-identity binding, supplied by external configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityBinding {
    /// Numeric account id used by the front end.
    pub account_id: i64,

    /// Git identity the lock service will report as owner.
    pub git_identity: String,
}

/// Read-only map of account ids to git identities.
///
/// Pure over the supplied bindings; nothing here talks to the lock service.
#[derive(Debug, Clone, Default)]
pub struct IdentityResolver {
    bindings: BTreeMap<i64, String>,
}

impl IdentityResolver {
    /// Build a resolver from externally supplied bindings.
    pub fn new<I>(bindings: I) -> Self
    where
        I: IntoIterator<Item = IdentityBinding>,
    {
        Self {
            bindings: bindings
                .into_iter()
                .map(|b| (b.account_id, b.git_identity))
                .collect(),
        }
    }

    /// Resolve an account id to its git identity.
    ///
    /// Fails with `NotConfigured` when the account has no binding, so callers
    /// can distinguish a configuration gap from a contested lock.
    pub fn resolve(&self, account_id: i64) -> Result<&str> {
        self.bindings
            .get(&account_id)
            .map(String::as_str)
            .ok_or(LockError::NotConfigured(account_id))
    }

    /// Check whether a lock owner string belongs to the given account.
    ///
    /// True if `lock_owner` equals the numeric account id as a string, or
    /// equals the bound git identity case-insensitively. An account without a
    /// binding can still match by numeric id.
    pub fn owner_matches(&self, lock_owner: &str, account_id: i64) -> bool {
        if lock_owner == account_id.to_string() {
            return true;
        }
        match self.bindings.get(&account_id) {
            Some(identity) => lock_owner.eq_ignore_ascii_case(identity),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(pairs: &[(i64, &str)]) -> IdentityResolver {
        IdentityResolver::new(pairs.iter().map(|(id, name)| IdentityBinding {
            account_id: *id,
            git_identity: name.to_string(),
        }))
    }

    #[test]
    fn resolve_returns_bound_identity() {
        let r = resolver(&[(100, "alice")]);
        assert_eq!(r.resolve(100).unwrap(), "alice");
    }

    #[test]
    fn resolve_unbound_account_is_not_configured() {
        let r = resolver(&[(100, "alice")]);
        assert_eq!(r.resolve(200).unwrap_err(), LockError::NotConfigured(200));
    }

    #[test]
    fn owner_matches_numeric_account_id() {
        let r = resolver(&[]);
        assert!(r.owner_matches("100", 100));
        assert!(!r.owner_matches("101", 100));
    }

    #[test]
    fn owner_matches_git_identity_case_insensitively() {
        let r = resolver(&[(100, "Alice")]);
        assert!(r.owner_matches("alice", 100));
        assert!(r.owner_matches("ALICE", 100));
        assert!(!r.owner_matches("alicia", 100));
    }

    #[test]
    fn no_partial_matching() {
        let r = resolver(&[(100, "alice")]);
        assert!(!r.owner_matches("alice-2", 100));
        assert!(!r.owner_matches("ali", 100));
    }

    #[test]
    fn numeric_id_colliding_with_another_accounts_identity() {
        // Account 200's git identity is the text "100", which is also account
        // 100's numeric id. Both accounts match a lock owned by "100"; the
        // comparison rule does not disambiguate this case.
        let r = resolver(&[(200, "100")]);
        assert!(r.owner_matches("100", 100));
        assert!(r.owner_matches("100", 200));
    }
}
