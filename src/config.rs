//! Deployment configuration for doclock.
//!
//! This module defines the Config struct that represents `doclock.yaml`.
//! It supports forward-compatible YAML parsing (unknown fields are ignored),
//! sensible defaults for optional fields, and validation of config values.
//! Identity bindings and the admin id list are consumed read-only here; the
//! account/repository provisioning that produces them is out of scope.

use crate::error::{LockError, Result};
use crate::identity::IdentityBinding;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the lock coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the repository working copy the lock service operates on.
    #[serde(default = "default_repo_root")]
    pub repo_root: String,

    /// Path of the local lock store file, relative to the repo root unless
    /// absolute.
    #[serde(default = "default_locks_file")]
    pub locks_file: String,

    /// Maximum age in seconds at which a cached lock table is still served.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Deadline in seconds for a single lock service invocation.
    #[serde(default = "default_oracle_timeout_secs")]
    pub oracle_timeout_secs: u64,

    /// Bound in seconds on waiting for another mutation on the same path.
    #[serde(default = "default_path_wait_secs")]
    pub path_wait_secs: u64,

    /// Lifetime in seconds of front-end workflow sessions.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Accounts granted the force-release capability.
    #[serde(default)]
    pub admin_ids: Vec<i64>,

    /// Account id to git identity bindings.
    #[serde(default)]
    pub identities: BTreeMap<i64, String>,
}

fn default_repo_root() -> String {
    ".".to_string()
}

fn default_locks_file() -> String {
    ".doclock/locks.json".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    30
}

fn default_oracle_timeout_secs() -> u64 {
    10
}

fn default_path_wait_secs() -> u64 {
    15
}

fn default_session_ttl_secs() -> u64 {
    900
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repo_root: default_repo_root(),
            locks_file: default_locks_file(),
            cache_ttl_secs: default_cache_ttl_secs(),
            oracle_timeout_secs: default_oracle_timeout_secs(),
            path_wait_secs: default_path_wait_secs(),
            session_ttl_secs: default_session_ttl_secs(),
            admin_ids: Vec::new(),
            identities: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward
    /// compatibility.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            LockError::ConfigError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| LockError::ConfigError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to a YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            LockError::ConfigError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values.
    pub fn validate(&self) -> Result<()> {
        if self.cache_ttl_secs == 0 {
            return Err(LockError::ConfigError(
                "config validation failed: cache_ttl_secs must be greater than 0".to_string(),
            ));
        }
        if self.oracle_timeout_secs == 0 {
            return Err(LockError::ConfigError(
                "config validation failed: oracle_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.path_wait_secs == 0 {
            return Err(LockError::ConfigError(
                "config validation failed: path_wait_secs must be greater than 0".to_string(),
            ));
        }
        for (account_id, identity) in &self.identities {
            if identity.trim().is_empty() {
                return Err(LockError::ConfigError(format!(
                    "config validation failed: identity for account {} must be non-empty",
                    account_id
                )));
            }
        }
        Ok(())
    }

    /// The identity bindings in resolver form.
    pub fn bindings(&self) -> Vec<IdentityBinding> {
        self.identities
            .iter()
            .map(|(account_id, git_identity)| IdentityBinding {
                account_id: *account_id,
                git_identity: git_identity.clone(),
            })
            .collect()
    }

    /// Absolute-ish path of the local lock store file.
    pub fn locks_path(&self) -> PathBuf {
        let locks = Path::new(&self.locks_file);
        if locks.is_absolute() {
            locks.to_path_buf()
        } else {
            Path::new(&self.repo_root).join(locks)
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle_timeout_secs)
    }

    pub fn path_wait(&self) -> Duration {
        Duration::from_secs(self.path_wait_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}
