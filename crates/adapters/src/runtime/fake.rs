// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake container runtime for testing

use super::{Container, ContainerRuntime, RuntimeError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Recorded runtime call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCall {
    ListManagedProjects,
    ExitedContainers {
        project: String,
    },
    RunningOptOut {
        project: String,
    },
    ComposeUp {
        project: String,
        compose_file: PathBuf,
        workdir: PathBuf,
    },
    ComposeDown {
        project: String,
    },
    StopContainer {
        id: String,
    },
    RemoveContainer {
        id: String,
    },
    ContainerIdByName {
        name: String,
    },
}

#[derive(Default)]
struct FakeRuntimeState {
    calls: Vec<RuntimeCall>,
    running_projects: Vec<String>,
    list_fails: bool,
    exited: HashMap<String, Vec<Container>>,
    running_opt_out: HashMap<String, Vec<String>>,
    containers_by_name: HashMap<String, String>,
    /// Scripted `compose_up` failures per project, consumed in order.
    up_failures: HashMap<String, VecDeque<String>>,
}

/// Fake container runtime recording every call, with scripted responses.
#[derive(Clone, Default)]
pub struct FakeRuntime {
    inner: Arc<Mutex<FakeRuntimeState>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.inner.lock().calls.clone()
    }

    /// Projects whose compose was brought up, in call order.
    pub fn upped_projects(&self) -> Vec<String> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                RuntimeCall::ComposeUp { project, .. } => Some(project.clone()),
                _ => None,
            })
            .collect()
    }

    /// Projects that were torn down, in call order.
    pub fn downed_projects(&self) -> Vec<String> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                RuntimeCall::ComposeDown { project } => Some(project.clone()),
                _ => None,
            })
            .collect()
    }

    /// Set the projects reported as running managed containers.
    pub fn set_running_projects(&self, projects: &[&str]) {
        self.inner.lock().running_projects =
            projects.iter().map(|p| p.to_string()).collect();
    }

    /// Make `list_managed_projects` fail (probe degradation path).
    pub fn fail_list_managed(&self) {
        self.inner.lock().list_fails = true;
    }

    /// Report an exited managed container for a project.
    pub fn add_exited_container(&self, project: &str, id: &str, opt_out: bool) {
        self.inner
            .lock()
            .exited
            .entry(project.to_string())
            .or_default()
            .push(Container {
                id: id.to_string(),
                opt_out,
            });
    }

    /// Report a running opt-out container for a project.
    pub fn add_running_opt_out(&self, project: &str, id: &str) {
        self.inner
            .lock()
            .running_opt_out
            .entry(project.to_string())
            .or_default()
            .push(id.to_string());
    }

    /// Register an existing container (conflict-recovery lookups).
    pub fn add_container_name(&self, name: &str, id: &str) {
        self.inner
            .lock()
            .containers_by_name
            .insert(name.to_string(), id.to_string());
    }

    /// Script the next `compose_up` for `project` to fail with `stderr`.
    pub fn push_up_failure(&self, project: &str, stderr: &str) {
        self.inner
            .lock()
            .up_failures
            .entry(project.to_string())
            .or_default()
            .push_back(stderr.to_string());
    }

    fn record(&self, call: RuntimeCall) {
        self.inner.lock().calls.push(call);
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn list_managed_projects(&self) -> Result<Vec<String>, RuntimeError> {
        self.record(RuntimeCall::ListManagedProjects);
        let inner = self.inner.lock();
        if inner.list_fails {
            return Err(RuntimeError::QueryFailed("runtime unreachable".into()));
        }
        let mut projects = inner.running_projects.clone();
        projects.sort();
        projects.dedup();
        Ok(projects)
    }

    async fn exited_containers(&self, project: &str) -> Result<Vec<Container>, RuntimeError> {
        self.record(RuntimeCall::ExitedContainers {
            project: project.to_string(),
        });
        Ok(self
            .inner
            .lock()
            .exited
            .get(project)
            .cloned()
            .unwrap_or_default())
    }

    async fn running_opt_out_containers(
        &self,
        project: &str,
    ) -> Result<Vec<String>, RuntimeError> {
        self.record(RuntimeCall::RunningOptOut {
            project: project.to_string(),
        });
        Ok(self
            .inner
            .lock()
            .running_opt_out
            .get(project)
            .cloned()
            .unwrap_or_default())
    }

    async fn compose_up(
        &self,
        project: &str,
        compose_file: &Path,
        workdir: &Path,
    ) -> Result<(), RuntimeError> {
        self.record(RuntimeCall::ComposeUp {
            project: project.to_string(),
            compose_file: compose_file.to_path_buf(),
            workdir: workdir.to_path_buf(),
        });

        let mut inner = self.inner.lock();
        if let Some(failures) = inner.up_failures.get_mut(project) {
            if let Some(stderr) = failures.pop_front() {
                return Err(RuntimeError::ComposeFailed { stderr });
            }
        }
        Ok(())
    }

    async fn compose_down(&self, project: &str) -> Result<(), RuntimeError> {
        self.record(RuntimeCall::ComposeDown {
            project: project.to_string(),
        });
        Ok(())
    }

    async fn stop_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.record(RuntimeCall::StopContainer { id: id.to_string() });
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> Result<(), RuntimeError> {
        self.record(RuntimeCall::RemoveContainer { id: id.to_string() });
        let mut inner = self.inner.lock();
        inner.containers_by_name.retain(|_, v| v != id);
        Ok(())
    }

    async fn container_id_by_name(&self, name: &str) -> Result<Option<String>, RuntimeError> {
        self.record(RuntimeCall::ContainerIdByName {
            name: name.to_string(),
        });
        Ok(self.inner.lock().containers_by_name.get(name).cloned())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
