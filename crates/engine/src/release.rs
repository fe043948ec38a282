// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic release switch.
//!
//! A fetched working tree becomes `releases/<commit>` and the stable
//! `current` symlink is repointed at it. Observers of `current` see either
//! the prior release or the new one, never an intermediate path. Superseded
//! releases are pruned eagerly: after a successful switch only the current
//! release directory survives.

use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use konta_core::short_commit;

/// Errors from publishing a release.
#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("failed to move release into place: {0}")]
    Move(#[source] io::Error),

    #[error("failed to update current symlink: {0}")]
    Symlink(#[source] io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Publish `source_dir` as the release for `commit` and repoint `current`.
pub fn atomic_switch(
    releases_dir: &Path,
    current_link: &Path,
    commit: &str,
    source_dir: &Path,
) -> Result<(), ReleaseError> {
    std::fs::create_dir_all(releases_dir)?;
    let target = releases_dir.join(commit);

    if target.exists() {
        // Same commit applied twice: discard the fresh materialisation and
        // just repoint.
        std::fs::remove_dir_all(source_dir)?;
        repoint(current_link, &target)?;
        info!("atomic switch completed (reused): {}", short_commit(commit));
    } else {
        if let Err(err) = std::fs::rename(source_dir, &target) {
            // Rename across filesystems is not supported; fall back to a
            // copy, keeping the contract that `current` never observes a
            // partial tree (the copy lands before the symlink moves).
            warn!("rename failed ({err}), copying release instead");
            copy_dir_all(source_dir, &target).map_err(ReleaseError::Move)?;
            std::fs::remove_dir_all(source_dir)?;
        }
        repoint(current_link, &target)?;
        info!("atomic switch completed: {}", short_commit(commit));
    }

    prune_releases(releases_dir, commit);
    Ok(())
}

fn repoint(current_link: &Path, target: &Path) -> Result<(), ReleaseError> {
    match std::fs::remove_file(current_link) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(ReleaseError::Symlink(err)),
    }
    std::os::unix::fs::symlink(target, current_link).map_err(ReleaseError::Symlink)
}

/// Remove every release directory other than the current commit's.
/// Best-effort: failures are logged and pruning continues.
fn prune_releases(releases_dir: &Path, current_commit: &str) {
    let entries = match std::fs::read_dir(releases_dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("failed to read releases directory: {err}");
            return;
        }
    };

    for entry in entries.flatten() {
        let name = entry.file_name();
        if name == current_commit {
            continue;
        }
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if let Err(err) = std::fs::remove_dir_all(&path) {
            warn!("failed to remove old release {}: {err}", path.display());
            continue;
        }
        info!("removed old release: {}", name.to_string_lossy());
    }
}

fn copy_dir_all(src: &Path, dst: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            copy_dir_all(&entry.path(), &target)?;
        } else if file_type.is_symlink() {
            let link = std::fs::read_link(entry.path())?;
            std::os::unix::fs::symlink(link, target)?;
        } else {
            std::fs::copy(entry.path(), target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "release_tests.rs"]
mod tests;
