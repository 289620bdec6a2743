//! Command implementations for doclock.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. Each command builds a coordinator over the configured
//! repository and acts on behalf of the account given on the command line.

use crate::cli::{Command, LockArgs, StatusArgs, UnlockArgs};
use crate::config::Config;
use crate::coordinator::{AdminList, Coordinator, LockStatus};
use crate::error::Result;
use crate::identity::IdentityResolver;
use crate::oracle::LockRecord;
use crate::oracle::lfs::LfsOracle;
use crate::store::LocalLockStore;
use std::path::Path;
use std::sync::Arc;

/// Dispatch a command to its implementation.
pub fn dispatch(config_path: &str, command: Command) -> Result<()> {
    let config = load_config(config_path)?;
    let coordinator = build_coordinator(&config)?;

    match command {
        Command::Status(args) => cmd_status(&coordinator, args),
        Command::List => cmd_list(&coordinator),
        Command::Lock(args) => cmd_lock(&coordinator, args),
        Command::Unlock(args) => cmd_unlock(&coordinator, args),
    }
}

/// Load the config file, falling back to defaults when it does not exist.
fn load_config(path: &str) -> Result<Config> {
    if Path::new(path).exists() {
        Config::load(path)
    } else {
        Ok(Config::default())
    }
}

/// Wire the coordinator up from deployment config: production LFS oracle,
/// durable lock store, config-backed identities and admin list.
fn build_coordinator(config: &Config) -> Result<Coordinator> {
    let oracle = Arc::new(LfsOracle::new(&config.repo_root, config.oracle_timeout()));
    let store = LocalLockStore::load(config.locks_path())?;
    let identities = IdentityResolver::new(config.bindings());
    let admin = Arc::new(AdminList::new(config.admin_ids.iter().copied()));

    Ok(Coordinator::new(oracle, identities, admin, store)
        .with_cache_ttl(config.cache_ttl())
        .with_path_wait(config.path_wait()))
}

fn cmd_status(coordinator: &Coordinator, args: StatusArgs) -> Result<()> {
    match coordinator.status(&args.path, args.account)? {
        LockStatus::Unlocked => println!("{}: unlocked", args.path),
        LockStatus::LockedBySelf(rec) => {
            println!("{}: locked by you", args.path);
            print_record(&rec);
        }
        LockStatus::LockedByOther(rec) => {
            println!("{}: locked by {}", args.path, rec.owner);
            print_record(&rec);
        }
    }
    Ok(())
}

fn cmd_list(coordinator: &Coordinator) -> Result<()> {
    let table = coordinator.list()?;

    if table.is_empty() {
        println!("No active locks.");
        return Ok(());
    }

    println!("Active locks ({}):", table.len());
    println!();
    for record in table.values() {
        println!("  {}:", record.path);
        println!("    Owner:  {}", record.owner);
        println!("    Age:    {}", record.age_string());
        println!("    ID:     {}", record.id);
        println!();
    }
    Ok(())
}

fn cmd_lock(coordinator: &Coordinator, args: LockArgs) -> Result<()> {
    let record = coordinator.acquire(&args.path, args.account)?;
    println!("Locked {} for {}", record.path, record.owner);
    Ok(())
}

fn cmd_unlock(coordinator: &Coordinator, args: UnlockArgs) -> Result<()> {
    if args.force {
        coordinator.force_release(&args.path, args.account)?;
        println!("Force-unlocked {}", args.path);
    } else {
        coordinator.release(&args.path, args.account)?;
        println!("Unlocked {}", args.path);
    }
    Ok(())
}

fn print_record(record: &LockRecord) {
    println!("    Owner:  {}", record.owner);
    println!("    Age:    {}", record.age_string());
    println!("    ID:     {}", record.id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn missing_config_file_falls_back_to_defaults() {
        let config = load_config("/nonexistent/doclock.yaml").unwrap();
        assert_eq!(config.cache_ttl_secs, 30);
        assert!(config.admin_ids.is_empty());
    }

    #[test]
    #[serial]
    fn relative_config_path_resolves_against_current_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("doclock.yaml"),
            "cache_ttl_secs: 5\nadmin_ids: [1]\nidentities:\n  100: alice\n",
        )
        .unwrap();

        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        let config = load_config("doclock.yaml");
        std::env::set_current_dir(previous).unwrap();

        let config = config.unwrap();
        assert_eq!(config.cache_ttl_secs, 5);
        assert_eq!(config.admin_ids, vec![1]);
    }

    #[test]
    fn coordinator_builds_from_default_config() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            repo_root: dir.path().to_string_lossy().into_owned(),
            identities: [(100, "alice".to_string())].into_iter().collect(),
            ..Config::default()
        };
        build_coordinator(&config).unwrap();
    }
}
