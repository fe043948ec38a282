// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deployment-state store.
//!
//! A compact JSON record of the last applied commit plus per-application
//! entries. Writes go to a temp file, are fsync'd, then renamed over the
//! target so a crash never leaves a torn state file. A missing or
//! unparseable file loads as the empty record ("never deployed").

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from persisting deployment state. Failure to persist is fatal to
/// the cycle; loading never fails.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Persistent record of what has been deployed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentState {
    /// Commit of the most recently applied snapshot; empty on first run.
    #[serde(default)]
    pub last_commit: String,
    #[serde(default)]
    pub last_deploy_time: String,
    #[serde(default)]
    pub version: String,
    /// Per-application entries. Additive: entries for removed applications
    /// are retained until manually cleared.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub projects: BTreeMap<String, ProjectState>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectState {
    /// Last commit that affected this application.
    pub last_commit: String,
    pub last_deploy_time: String,
}

/// Load the deployment state, treating an absent or unparseable file as
/// "never deployed".
pub fn load(path: &Path) -> DeploymentState {
    let data = match std::fs::read(path) {
        Ok(d) => d,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return DeploymentState::default();
        }
        Err(err) => {
            warn!("failed to read state file: {err}");
            return DeploymentState::default();
        }
    };

    match serde_json::from_slice(&data) {
        Ok(state) => state,
        Err(err) => {
            warn!("failed to parse state file: {err}");
            DeploymentState::default()
        }
    }
}

/// Persist the deployment state atomically.
pub fn save(path: &Path, state: &DeploymentState) -> Result<(), StateError> {
    let mut state = state.clone();
    if state.version.is_empty() {
        state.version = "0.1.0".to_string();
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let data = serde_json::to_vec_pretty(&state)?;
    let tmp = path.with_extension("tmp");
    {
        let mut file = File::create(&tmp)?;
        file.write_all(&data)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Record a deployment: set the global commit and timestamp, and merge the
/// supplied application list into the per-application map.
pub fn update(
    path: &Path,
    commit: &str,
    projects: &[String],
) -> Result<DeploymentState, StateError> {
    let mut state = load(path);
    let now = now_stamp();

    for project in projects {
        state.projects.insert(
            project.clone(),
            ProjectState {
                last_commit: commit.to_string(),
                last_deploy_time: now.clone(),
            },
        );
    }

    state.last_commit = commit.to_string();
    state.last_deploy_time = now;

    save(path, &state)?;
    debug!(commit = %konta_core::short_commit(commit), "state updated");
    Ok(state)
}

fn now_stamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
