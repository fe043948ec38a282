// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle hook engine.
//!
//! User-supplied shell scripts run at defined points around a cycle. A
//! missing hook file is a silent no-op. Exit-code policy belongs to the
//! caller: the control loop treats a failing `pre` hook as fatal and every
//! other hook as advisory.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use konta_core::config::ResolvedHooks;

/// Errors from hook invocation.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("{hook} hook failed to start: {source}")]
    Spawn {
        hook: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{hook} hook exited with {code:?}")]
    Failed {
        hook: &'static str,
        code: Option<i32>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hook {
    Started,
    Pre,
    Success,
    Failure,
    PostUpdate,
}

impl Hook {
    fn name(self) -> &'static str {
        match self {
            Hook::Started => "started",
            Hook::Pre => "pre",
            Hook::Success => "success",
            Hook::Failure => "failure",
            Hook::PostUpdate => "post_update",
        }
    }
}

/// Runs hooks with the release directory as working directory.
#[derive(Debug, Clone)]
pub struct HookRunner {
    release_dir: PathBuf,
    hooks: ResolvedHooks,
}

impl HookRunner {
    pub fn new(release_dir: impl Into<PathBuf>, hooks: ResolvedHooks) -> Self {
        Self {
            release_dir: release_dir.into(),
            hooks,
        }
    }

    /// Runs when watch mode starts.
    pub async fn run_started(&self) -> Result<(), HookError> {
        self.run(Hook::Started).await
    }

    /// Runs before reconciliation; non-zero exit vetoes the cycle.
    pub async fn run_pre(&self) -> Result<(), HookError> {
        self.run(Hook::Pre).await
    }

    /// Runs after a successful switch, against the published release.
    pub async fn run_success(&self) -> Result<(), HookError> {
        self.run(Hook::Success).await
    }

    /// Runs when a cycle fails past the pre-hook point.
    pub async fn run_failure(&self) -> Result<(), HookError> {
        self.run(Hook::Failure).await
    }

    /// Runs after the agent binary is updated. Output is suppressed.
    pub async fn run_post_update(&self) -> Result<(), HookError> {
        self.run(Hook::PostUpdate).await
    }

    fn hook_path(&self, hook: Hook) -> &Path {
        match hook {
            Hook::Started => &self.hooks.started,
            Hook::Pre => &self.hooks.pre,
            Hook::Success => &self.hooks.success,
            Hook::Failure => &self.hooks.failure,
            Hook::PostUpdate => &self.hooks.post_update,
        }
    }

    async fn run(&self, hook: Hook) -> Result<(), HookError> {
        let configured = self.hook_path(hook);
        let path = if configured.is_absolute() {
            configured.to_path_buf()
        } else {
            self.release_dir.join(configured)
        };

        if !path.is_file() {
            debug!("no {} hook at {}", hook.name(), path.display());
            return Ok(());
        }

        debug!("running {} hook: {}", hook.name(), path.display());

        let mut cmd = Command::new("bash");
        cmd.arg(&path).current_dir(&self.release_dir);
        if hook == Hook::PostUpdate {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }

        let status = cmd.status().await.map_err(|source| HookError::Spawn {
            hook: hook.name(),
            source,
        })?;

        if !status.success() {
            return Err(HookError::Failed {
                hook: hook.name(),
                code: status.code(),
            });
        }

        debug!("{} hook completed", hook.name());
        Ok(())
    }
}

/// Log an advisory hook's failure instead of propagating it.
pub fn log_advisory(result: Result<(), HookError>) {
    if let Err(err) = result {
        warn!("{err}");
    }
}

#[cfg(test)]
#[path = "hooks_tests.rs"]
mod tests;
