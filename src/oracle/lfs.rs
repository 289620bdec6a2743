//! Production oracle adapter backed by `git lfs`.
//!
//! Every operation shells out to `git lfs` in the configured repository and
//! blocks until the subprocess exits or a bounded deadline expires. The JSON
//! output mode is used for `lock` and `locks` so records parse structurally;
//! failure classification falls back to pattern-matching stderr, since the
//! CLI does not report machine-readable error kinds.

use super::{LockOracle, LockOrigin, LockRecord, LockTable};
use crate::error::{LockError, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::LazyLock;
use std::time::{Duration, Instant};

/// How often the runner polls a child process for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Stderr patterns indicating the path is already locked by someone.
static CONFLICT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(already\s+(created|exists|locked)|lock\s+exists)").expect("valid regex")
});

/// Stderr patterns indicating the lock no longer exists.
static NOT_FOUND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(no\s+matching\s+locks?|unable\s+to\s+find|not\s+found)").expect("valid regex")
});

/// Stderr patterns indicating the service refused an unforced removal.
static FORBIDDEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(forbidden|permission\s+denied|not\s+authorized|must\s+have\s+(push|admin))")
        .expect("valid regex")
});

/// Oracle adapter invoking `git lfs` in a repository working copy.
///
/// The lock owner reported by the service is derived from the repository's
/// transport credentials; the identity passed to [`LockOracle::create`] is
/// used for logging only.
#[derive(Debug, Clone)]
pub struct LfsOracle {
    repo_root: PathBuf,
    timeout: Duration,
}

/// Output captured from a finished `git lfs` invocation.
#[derive(Debug)]
struct LfsOutput {
    stdout: String,
    stderr: String,
    success: bool,
}

/// Lock object as printed by `git lfs lock --json` and `git lfs locks --json`.
#[derive(Debug, Deserialize)]
struct WireLock {
    id: String,
    path: String,
    owner: Option<WireOwner>,
    locked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct WireOwner {
    name: String,
}

impl From<WireLock> for LockRecord {
    fn from(wire: WireLock) -> Self {
        LockRecord {
            path: wire.path,
            owner: wire.owner.map(|o| o.name).unwrap_or_default(),
            id: wire.id,
            locked_at: wire.locked_at,
            origin: LockOrigin::Remote,
        }
    }
}

impl LfsOracle {
    /// Create an adapter for the repository at `repo_root` with the given
    /// per-invocation deadline.
    pub fn new<P: AsRef<Path>>(repo_root: P, timeout: Duration) -> Self {
        Self {
            repo_root: repo_root.as_ref().to_path_buf(),
            timeout,
        }
    }

    /// Run `git lfs <args>` and wait for it, killing the child when the
    /// deadline expires.
    fn run(&self, args: &[&str]) -> Result<LfsOutput> {
        let verb = args.first().copied().unwrap_or("");

        let mut child = Command::new("git")
            .arg("lfs")
            .args(args)
            .current_dir(&self.repo_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                LockError::Unavailable(format!("failed to execute git lfs {}: {}", verb, e))
            })?;

        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(LockError::Unavailable(format!(
                            "git lfs {} timed out after {}s",
                            verb,
                            self.timeout.as_secs()
                        )));
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(LockError::Unavailable(format!(
                        "failed waiting for git lfs {}: {}",
                        verb, e
                    )));
                }
            }
        }

        // The child has exited; this only drains the remaining output.
        let output = child.wait_with_output().map_err(|e| {
            LockError::Unavailable(format!("failed to collect git lfs {} output: {}", verb, e))
        })?;

        Ok(LfsOutput {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            success: output.status.success(),
        })
    }

    /// Fetch the full lock table, with one bounded retry on transport
    /// failure. Permitted only because `list` is read-only.
    fn list_with_retry(&self) -> Result<LockTable> {
        match self.fetch_table() {
            Err(LockError::Unavailable(first)) => {
                tracing::warn!(error = %first, "lock listing failed, retrying once");
                self.fetch_table()
            }
            other => other,
        }
    }

    fn fetch_table(&self) -> Result<LockTable> {
        let out = self.run(&["locks", "--json"])?;
        if !out.success {
            return Err(LockError::Unavailable(format!(
                "git lfs locks failed: {}",
                pick_message(&out)
            )));
        }

        let wire: Vec<WireLock> = serde_json::from_str(&out.stdout).map_err(|e| {
            LockError::Unavailable(format!("unparseable git lfs locks output: {}", e))
        })?;

        Ok(wire
            .into_iter()
            .map(LockRecord::from)
            .map(|rec| (rec.path.clone(), rec))
            .collect())
    }
}

impl LockOracle for LfsOracle {
    fn create(&self, path: &str, owner: &str) -> Result<LockRecord> {
        let out = self.run(&["lock", path, "--json"])?;

        if out.success {
            let wire: WireLock = serde_json::from_str(&out.stdout).map_err(|e| {
                LockError::Unavailable(format!("unparseable git lfs lock output: {}", e))
            })?;
            let record = LockRecord::from(wire);
            tracing::info!(path, owner, id = %record.id, "created remote lock");
            return Ok(record);
        }

        let message = pick_message(&out);
        if CONFLICT_RE.is_match(&message) {
            // The CLI does not name the holder in the error; list to find out.
            let holder = self
                .list_with_retry()
                .ok()
                .and_then(|table| table.get(path).map(|rec| rec.owner.clone()))
                .unwrap_or_else(|| "unknown".to_string());
            return Err(LockError::Conflict { owner: holder });
        }

        Err(LockError::Unavailable(format!(
            "git lfs lock failed: {}",
            message
        )))
    }

    fn list(&self) -> Result<LockTable> {
        self.list_with_retry()
    }

    fn remove(&self, path: &str, force: bool) -> Result<()> {
        let mut args = vec!["unlock", path];
        if force {
            args.push("--force");
        }

        let out = self.run(&args)?;
        if out.success {
            tracing::info!(path, force, "removed remote lock");
            return Ok(());
        }

        let message = pick_message(&out);
        if NOT_FOUND_RE.is_match(&message) {
            return Err(LockError::NotFound);
        }
        if FORBIDDEN_RE.is_match(&message) {
            return Err(LockError::Forbidden { owner: None });
        }

        Err(LockError::Unavailable(format!(
            "git lfs unlock failed: {}",
            message
        )))
    }
}

/// Prefer stderr for error text, falling back to stdout.
fn pick_message(out: &LfsOutput) -> String {
    if out.stderr.is_empty() {
        out.stdout.clone()
    } else {
        out.stderr.clone()
    }
}
