// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container-runtime adapters.
//!
//! Every query issued through this trait is already scoped to containers
//! bearing the Konta ownership label (`container_id_by_name` excepted; it
//! exists solely for name-conflict recovery). Callers never add label
//! filters of their own.

mod docker;

pub use docker::DockerCli;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeRuntime, RuntimeCall};

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors from container-runtime operations.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("container runtime query failed: {0}")]
    QueryFailed(String),

    #[error("docker compose failed: {stderr}")]
    ComposeFailed { stderr: String },

    #[error("container command failed: {0}")]
    CommandFailed(String),
}

impl RuntimeError {
    /// True for the compose failure produced when a declared container name
    /// collides with an existing container.
    pub fn is_name_conflict(&self) -> bool {
        matches!(self, RuntimeError::ComposeFailed { stderr }
            if stderr.contains("already in use by container"))
    }
}

/// An observed managed container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub id: String,
    /// True when the container carries the keep-stopped opt-out label.
    pub opt_out: bool,
}

/// Adapter for the `docker`-compatible container runtime.
#[async_trait]
pub trait ContainerRuntime: Clone + Send + Sync + 'static {
    /// Distinct application names across running containers bearing the
    /// ownership label, sorted.
    async fn list_managed_projects(&self) -> Result<Vec<String>, RuntimeError>;

    /// Exited managed containers belonging to one application.
    async fn exited_containers(&self, project: &str) -> Result<Vec<Container>, RuntimeError>;

    /// IDs of running managed containers of one application that carry the
    /// keep-stopped opt-out label.
    async fn running_opt_out_containers(&self, project: &str)
        -> Result<Vec<String>, RuntimeError>;

    /// Bring an application up (`up -d --remove-orphans`), applying the
    /// ownership label to every created container.
    async fn compose_up(
        &self,
        project: &str,
        compose_file: &Path,
        workdir: &Path,
    ) -> Result<(), RuntimeError>;

    /// Tear an application down (`down --remove-orphans`).
    async fn compose_down(&self, project: &str) -> Result<(), RuntimeError>;

    /// Stop a container by ID.
    async fn stop_container(&self, id: &str) -> Result<(), RuntimeError>;

    /// Force-remove a container by ID or name.
    async fn remove_container(&self, id: &str) -> Result<(), RuntimeError>;

    /// ID of the container with exactly this name, if any. The only query
    /// not scoped to the ownership label: name-conflict recovery must see
    /// foreign containers to remove the one squatting on a declared name.
    async fn container_id_by_name(&self, name: &str) -> Result<Option<String>, RuntimeError>;
}
