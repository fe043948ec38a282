// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One reconciliation pass.
//!
//! `run_cycle` sequences the steps against injected collaborators so tests
//! can drive it with a fake runtime and a local git fixture;
//! `reconcile_once` binds the real lock path, config search, state
//! directory, and Docker CLI.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use konta_adapters::{ContainerRuntime, DockerCli, GitClient, GitError};
use konta_core::{short_commit, Config, ConfigError, StatePaths};
use konta_storage::lock::{LockError, ProcessLock};
use konta_storage::state::{self, StateError};

use crate::hooks::{log_advisory, HookError, HookRunner};
use crate::reconciler::{ReconcileError, Reconciler};
use crate::release::{self, ReleaseError};

/// How a pass ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Another instance holds the process lock; nothing was done.
    AlreadyRunning,
    /// The branch tip equals the recorded commit; only the health check ran.
    NoChange { commit: String },
    /// A new commit touched nothing under the apps subtree; state advanced
    /// without reconciliation.
    NoAppChanges { commit: String },
    /// Dry run: intended mutations were logged, nothing was applied.
    DryRun { commit: String },
    /// A new commit was reconciled and published.
    Deployed {
        commit: String,
        projects: Vec<String>,
    },
}

/// Errors that end a pass unsuccessfully.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("pre-deploy hook rejected the release: {0}")]
    PreHook(#[source] HookError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Release(#[from] ReleaseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One full pass against the real collaborators: process lock, config
/// search path, resolved state directory, Docker CLI.
pub async fn reconcile_once(dry_run: bool) -> Result<CycleOutcome, CycleError> {
    let _lock = match ProcessLock::acquire() {
        Ok(lock) => lock,
        Err(LockError::AlreadyLocked { path, .. }) => {
            warn!(
                "another konta instance is running (lock held at {})",
                path.display()
            );
            return Ok(CycleOutcome::AlreadyRunning);
        }
        Err(err) => return Err(err.into()),
    };

    let cfg = Config::load()?;
    let paths = StatePaths::resolve();
    run_cycle(&cfg, &paths, &GitClient::new(), &DockerCli::new(), dry_run).await
}

/// One full pass with injected collaborators. The caller holds the process
/// lock.
pub async fn run_cycle<R: ContainerRuntime>(
    cfg: &Config,
    paths: &StatePaths,
    git: &GitClient,
    runtime: &R,
    dry_run: bool,
) -> Result<CycleOutcome, CycleError> {
    paths.init()?;
    let state_file = paths.state_file();
    let current_state = state::load(&state_file);

    // Materialise the branch tip in a temp tree; cleaned up on every exit
    // path until the atomic switch renames it away.
    let work_tree = TempWorkTree::create(&paths.releases_dir())?;
    let new_commit = git.clone_at(&cfg.repository, work_tree.path()).await?;

    if new_commit == current_state.last_commit {
        info!(
            "no changes detected (current: {})",
            short_commit(&current_state.last_commit)
        );
        if !dry_run {
            info!("performing container health check");
            let reconciler =
                Reconciler::new(runtime.clone(), work_tree.path(), &cfg.resolved.apps_path, dry_run);
            let started = reconciler.health_check().await;
            if !started.is_empty() {
                info!("health check started {} project(s): {started:?}", started.len());
            }
        }
        return Ok(CycleOutcome::NoChange { commit: new_commit });
    }

    info!(
        "new commit detected: {} -> {}",
        short_commit(&current_state.last_commit),
        short_commit(&new_commit)
    );
    if let Some(subject) = git.commit_message(work_tree.path(), &new_commit).await {
        info!("commit: {subject}");
    }

    git.validate_subtree(work_tree.path(), &cfg.resolved.apps_path)?;

    let changed = git
        .changed_projects(
            work_tree.path(),
            &cfg.resolved.apps_path,
            &current_state.last_commit,
            &new_commit,
        )
        .await;

    if let Some(projects) = &changed {
        if projects.is_empty() {
            info!(
                "no project changes under {}, skipping reconciliation",
                cfg.resolved.apps_path
            );
            if !dry_run {
                state::update(&state_file, &new_commit, &[])?;
                info!("state updated to new commit (no app changes)");
            }
            return Ok(CycleOutcome::NoAppChanges { commit: new_commit });
        }
        info!(
            "will reconcile {} changed project(s): {projects:?}",
            projects.len()
        );
    } else {
        info!("reconciling all projects (first deployment or change detection unavailable)");
    }

    // Record the commit before processing so a failing hook or deployment is
    // not retried on every subsequent tick. The project list is provisional;
    // it is rewritten with the reconciled set after the switch.
    if !dry_run {
        let provisional = changed.clone().unwrap_or_default();
        state::update(&state_file, &new_commit, &provisional)?;
        debug!(
            "state updated to {} before processing",
            short_commit(&new_commit)
        );
    }

    let hooks = HookRunner::new(work_tree.path(), cfg.resolved.hooks.clone());

    if let Err(err) = hooks.run_pre().await {
        error!("pre-deploy hook failed: {err}");
        log_advisory(hooks.run_failure().await);
        return Err(CycleError::PreHook(err));
    }

    let mut reconciler =
        Reconciler::new(runtime.clone(), work_tree.path(), &cfg.resolved.apps_path, dry_run);
    reconciler.set_changed_projects(changed);
    let reconciled = match reconciler.reconcile().await {
        Ok(projects) => projects,
        Err(err) => {
            error!("reconciliation failed: {err}");
            log_advisory(hooks.run_failure().await);
            return Err(err.into());
        }
    };

    if dry_run {
        info!("[dry-run] would switch to commit {}", short_commit(&new_commit));
        log_advisory(hooks.run_success().await);
        return Ok(CycleOutcome::DryRun { commit: new_commit });
    }

    if let Err(err) = release::atomic_switch(
        &paths.releases_dir(),
        &paths.current_link(),
        &new_commit,
        work_tree.path(),
    ) {
        error!("atomic switch failed: {err}");
        log_advisory(hooks.run_failure().await);
        return Err(err.into());
    }

    state::update(&state_file, &new_commit, &reconciled)?;

    // The temp tree has been renamed away; run the success hook against the
    // published release.
    let current_hooks = HookRunner::new(paths.current_link(), cfg.resolved.hooks.clone());
    log_advisory(current_hooks.run_success().await);

    info!("deployment complete");
    Ok(CycleOutcome::Deployed {
        commit: new_commit,
        projects: reconciled,
    })
}

/// Temp working tree under `releases/`, removed on drop unless the atomic
/// switch has already renamed it away.
struct TempWorkTree {
    path: PathBuf,
}

impl TempWorkTree {
    fn create(releases_dir: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(releases_dir)?;
        let name = format!("temp-{}", chrono::Local::now().format("%Y%m%d%H%M%S"));
        Ok(Self {
            path: releases_dir.join(name),
        })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempWorkTree {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(err) = std::fs::remove_dir_all(&self.path) {
                warn!(
                    "failed to clean temp working tree {}: {err}",
                    self.path.display()
                );
            }
        }
    }
}

#[cfg(test)]
#[path = "cycle_tests.rs"]
mod tests;
