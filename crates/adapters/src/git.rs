// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git revision-store client.
//!
//! All access goes through the `git` CLI as a child process: `clone` to
//! materialise a branch tip, `rev-parse` to identify it, `diff --name-only`
//! to compute changed applications. Authentication uses URL-embedded basic
//! credentials for the duration of the invocation; the terminal-prompt
//! facility is disabled so auth failures surface immediately instead of
//! hanging the cycle.

use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::subprocess::{run_with_timeout, OutputExt, GIT_CLONE_TIMEOUT, GIT_QUERY_TIMEOUT};
use konta_core::config::RepositoryConfig;
use konta_core::is_commit_hash;

/// Shallow-clone depth. Covers typical multi-commit pushes; a push with more
/// commits than this between polls falls back to reconcile-all.
pub const CLONE_DEPTH: u32 = 5;

/// Errors from revision-store operations.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("git clone failed: {0}")]
    CloneFailed(String),

    #[error("failed to resolve HEAD: {0}")]
    RevParseFailed(String),

    #[error("invalid commit hash: {0}")]
    InvalidCommit(String),

    #[error("configured path not found in repository: {0}")]
    SubtreeMissing(String),

    #[error("failed to prepare working tree: {0}")]
    Io(#[from] std::io::Error),
}

/// Child-process git client.
#[derive(Debug, Clone, Default)]
pub struct GitClient;

impl GitClient {
    pub fn new() -> Self {
        Self
    }

    /// Materialise the branch tip at `target` and return its commit.
    ///
    /// The target directory is recreated from scratch; the clone is shallow
    /// and single-branch.
    pub async fn clone_at(
        &self,
        repo: &RepositoryConfig,
        target: &Path,
    ) -> Result<String, GitError> {
        info!(
            url = %redact_url(&repo.url),
            branch = %repo.branch,
            "cloning repository"
        );

        if target.exists() {
            std::fs::remove_dir_all(target)?;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let url = authenticated_url(&repo.url, &repo.token);
        let mut cmd = Command::new("git");
        cmd.arg("clone")
            .args(["--depth", &CLONE_DEPTH.to_string()])
            .arg("--single-branch")
            .args(["--branch", &repo.branch])
            .arg(&url)
            .arg(target)
            .env("GIT_TERMINAL_PROMPT", "0");

        let output = run_with_timeout(cmd, GIT_CLONE_TIMEOUT, "git clone")
            .await
            .map_err(GitError::CloneFailed)?;
        if !output.status.success() {
            let stderr = redact_secret(&output.stderr_trimmed(), &repo.token);
            return Err(GitError::CloneFailed(stderr));
        }

        let commit = self.head_commit(target).await?;
        info!(commit = %konta_core::short_commit(&commit), "repository cloned");
        Ok(commit)
    }

    /// Resolve the working tree's HEAD to a full commit hash.
    pub async fn head_commit(&self, repo_dir: &Path) -> Result<String, GitError> {
        let mut cmd = Command::new("git");
        cmd.args(["rev-parse", "HEAD"]).current_dir(repo_dir);

        let output = run_with_timeout(cmd, GIT_QUERY_TIMEOUT, "git rev-parse")
            .await
            .map_err(GitError::RevParseFailed)?;
        if !output.status.success() {
            return Err(GitError::RevParseFailed(output.stderr_trimmed()));
        }

        let commit = output.stdout_trimmed();
        if !is_commit_hash(&commit) {
            return Err(GitError::InvalidCommit(commit));
        }
        Ok(commit)
    }

    /// Application directories under `<apps_path>/` with at least one changed
    /// file in `(old_commit, new_commit]`.
    ///
    /// Returns `None` when `old_commit` is empty (no prior state) or when the
    /// diff cannot be computed (typically the old commit lies outside the
    /// shallow-clone depth); the caller then reconciles everything. Returns an
    /// empty vec when the commits are equal or nothing under the subtree
    /// changed.
    pub async fn changed_projects(
        &self,
        repo_dir: &Path,
        apps_path: &str,
        old_commit: &str,
        new_commit: &str,
    ) -> Option<Vec<String>> {
        if old_commit.is_empty() {
            return None;
        }
        if old_commit == new_commit {
            return Some(Vec::new());
        }

        let mut cmd = Command::new("git");
        cmd.args(["diff", "--name-only", old_commit, new_commit])
            .current_dir(repo_dir);

        let output = match run_with_timeout(cmd, GIT_QUERY_TIMEOUT, "git diff").await {
            Ok(output) => output,
            Err(err) => {
                warn!("failed to diff revisions: {err} (will reconcile all)");
                return None;
            }
        };
        if !output.status.success() {
            warn!(
                old = %konta_core::short_commit(old_commit),
                new = %konta_core::short_commit(new_commit),
                stderr = %output.stderr_trimmed(),
                "git diff failed, likely outside shallow history (will reconcile all)"
            );
            return None;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let projects = projects_from_paths(stdout.lines(), apps_path);
        if projects.is_empty() {
            info!("diff contains no changes under {apps_path}");
        } else {
            info!("detected changes in {} project(s): {projects:?}", projects.len());
        }
        Some(projects)
    }

    /// Confirm the configured subtree exists in the working tree.
    pub fn validate_subtree(&self, repo_dir: &Path, apps_path: &str) -> Result<(), GitError> {
        let dir = repo_dir.join(apps_path);
        if !dir.is_dir() {
            return Err(GitError::SubtreeMissing(dir.display().to_string()));
        }
        Ok(())
    }

    /// First line of a commit's message, truncated, for cycle logging.
    pub async fn commit_message(&self, repo_dir: &Path, commit: &str) -> Option<String> {
        let mut cmd = Command::new("git");
        cmd.args(["log", "-1", "--format=%s", commit])
            .current_dir(repo_dir);

        let output = match run_with_timeout(cmd, GIT_QUERY_TIMEOUT, "git log").await {
            Ok(output) if output.status.success() => output,
            _ => {
                debug!("failed to read commit message for {commit}");
                return None;
            }
        };

        let mut subject = output.stdout_trimmed();
        if subject.is_empty() {
            return None;
        }
        if subject.len() > 100 {
            subject.truncate(100);
            subject.push_str("...");
        }
        Some(subject)
    }
}

/// Embed the token as HTTP basic-auth credentials for one invocation.
fn authenticated_url(url: &str, token: &str) -> String {
    if token.is_empty() {
        return url.to_string();
    }
    match url.strip_prefix("https://") {
        Some(rest) => format!("https://git:{token}@{rest}"),
        None => url.to_string(),
    }
}

/// Strip userinfo from a URL for logging.
fn redact_url(url: &str) -> String {
    if let Some(scheme_end) = url.find("://") {
        let rest = &url[scheme_end + 3..];
        if let Some(at) = rest.find('@') {
            return format!("{}://{}", &url[..scheme_end], &rest[at + 1..]);
        }
    }
    url.to_string()
}

/// Replace the credential in child-process output before it reaches the log.
fn redact_secret(text: &str, token: &str) -> String {
    if token.is_empty() {
        return text.to_string();
    }
    text.replace(token, "***")
}

/// Distinct application names owning the changed paths.
///
/// A path counts toward `<project>` iff it matches the prefix
/// `<apps_path>/<project>/`; files sitting directly under the apps root
/// belong to no application.
fn projects_from_paths<'a>(
    paths: impl Iterator<Item = &'a str>,
    apps_path: &str,
) -> Vec<String> {
    let prefix = format!("{}/", apps_path.trim_end_matches('/').replace('\\', "/"));
    let mut projects = BTreeSet::new();

    for path in paths {
        let path = path.trim();
        if path.is_empty() {
            continue;
        }
        if let Some(rest) = path.strip_prefix(&prefix) {
            if let Some((project, _)) = rest.split_once('/') {
                if !project.is_empty() {
                    projects.insert(project.to_string());
                }
            }
        }
    }

    projects.into_iter().collect()
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
