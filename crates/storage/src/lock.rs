// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-writer advisory process lock.
//!
//! One reconciliation cycle at a time: the lock is acquired at the start of a
//! pass and released when it ends. `fs2` provides advisory file locking on
//! POSIX hosts (the deployment target); elsewhere it degrades to the
//! platform's best effort.

use fs2::FileExt;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

/// Errors from lock acquisition.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("another konta instance is running (lock held at {path:?})")]
    AlreadyLocked {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to prepare lock file: {0}")]
    Io(#[from] std::io::Error),
}

/// Held advisory lock. Released on [`ProcessLock::release`] or drop.
#[derive(Debug)]
pub struct ProcessLock {
    file: Option<File>,
    path: PathBuf,
}

impl ProcessLock {
    /// Acquire the lock at the well-known path (with home fallback).
    pub fn acquire() -> Result<Self, LockError> {
        Self::acquire_at(konta_core::paths::lock_path())
    }

    /// Acquire the lock at an explicit path.
    pub fn acquire_at(path: PathBuf) -> Result<Self, LockError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Open without truncating: the file may belong to a running instance
        // whose PID we must not wipe before holding the lock.
        let file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        file.try_lock_exclusive()
            .map_err(|source| LockError::AlreadyLocked {
                path: path.clone(),
                source,
            })?;

        // Now that we hold the lock, record our PID.
        let mut file = file;
        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;

        debug!(path = %path.display(), "lock acquired");
        Ok(Self {
            file: Some(file),
            path,
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Release the lock. Idempotent.
    pub fn release(&mut self) -> Result<(), LockError> {
        if let Some(file) = self.file.take() {
            FileExt::unlock(&file)?;
            debug!(path = %self.path.display(), "lock released");
        }
        Ok(())
    }
}

impl Drop for ProcessLock {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
