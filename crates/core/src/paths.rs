// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem locations with system-path to home-directory fallback.
//!
//! Konta prefers the conventional system locations (`/var/lib/konta`,
//! `/var/run`, `/var/log/konta`, `/etc/konta`) and falls back to paths under
//! the invoking user's home directory when those are not writable, so an
//! unprivileged run still works end to end.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// Environment variable overriding the state directory (highest priority).
pub const STATE_DIR_ENV: &str = "KONTA_STATE_DIR";

const SYSTEM_STATE_DIR: &str = "/var/lib/konta";
const SYSTEM_LOCK_PATH: &str = "/var/run/konta.lock";
const SYSTEM_LOG_DIR: &str = "/var/log/konta";
const SYSTEM_CONFIG_PATH: &str = "/etc/konta/config.yaml";

/// Resolved locations of Konta's private state tree.
#[derive(Debug, Clone)]
pub struct StatePaths {
    state_dir: PathBuf,
}

impl StatePaths {
    /// Resolve the state directory: `KONTA_STATE_DIR` env override, then
    /// `/var/lib/konta` when writable, then `~/.konta/state`.
    pub fn resolve() -> Self {
        if let Ok(dir) = std::env::var(STATE_DIR_ENV) {
            if !dir.is_empty() {
                return Self::at(dir);
            }
        }
        let primary = PathBuf::from(SYSTEM_STATE_DIR);
        if dir_writable(&primary) {
            return Self { state_dir: primary };
        }
        Self {
            state_dir: home_dir().join(".konta").join("state"),
        }
    }

    /// Pin the state directory to an explicit location.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: dir.into(),
        }
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Deployment-state document.
    pub fn state_file(&self) -> PathBuf {
        self.state_dir.join("state.json")
    }

    /// Parent of the per-commit release directories.
    pub fn releases_dir(&self) -> PathBuf {
        self.state_dir.join("releases")
    }

    /// Stable symbolic reference to the active release.
    pub fn current_link(&self) -> PathBuf {
        self.state_dir.join("current")
    }

    /// Create the state and releases directories.
    pub fn init(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.state_dir)?;
        std::fs::create_dir_all(self.releases_dir())?;
        Ok(())
    }
}

/// Process-lock path: `/var/run/konta.lock` when `/var/run` is writable,
/// otherwise `~/.konta/konta.lock`.
pub fn lock_path() -> PathBuf {
    let primary = PathBuf::from(SYSTEM_LOCK_PATH);
    if let Some(parent) = primary.parent() {
        if dir_writable(parent) {
            return primary;
        }
    }
    home_dir().join(".konta").join("konta.lock")
}

/// Log-file path: `/var/log/konta/konta.log` when writable, otherwise
/// `~/.konta/logs/konta.log`.
pub fn log_path() -> PathBuf {
    let primary = PathBuf::from(SYSTEM_LOG_DIR);
    if dir_writable(&primary) {
        return primary.join("konta.log");
    }
    home_dir().join(".konta").join("logs").join("konta.log")
}

/// Ordered configuration-file candidates: system, user, working directory.
pub fn config_candidates() -> Vec<PathBuf> {
    vec![
        PathBuf::from(SYSTEM_CONFIG_PATH),
        home_dir().join(".konta").join("config.yaml"),
        PathBuf::from("./konta.yaml"),
    ]
}

fn home_dir() -> PathBuf {
    match std::env::var("HOME") {
        Ok(home) if !home.is_empty() => PathBuf::from(home),
        _ => PathBuf::from("/tmp"),
    }
}

/// True if `dir` exists (or can be created) and a file can be written in it.
fn dir_writable(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }
    let probe = dir.join(".konta_probe");
    match File::create(&probe) {
        Ok(_) => {
            let _ = std::fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
