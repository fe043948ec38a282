// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Docker CLI runtime adapter

use super::{Container, ContainerRuntime, RuntimeError};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use crate::subprocess::{run_with_timeout, OutputExt, COMPOSE_TIMEOUT, DOCKER_QUERY_TIMEOUT};
use konta_core::labels::{
    COMPOSE_PROJECT_LABEL, COMPOSE_PROJECT_LABELS_ENV, MANAGED_LABEL, STOPPED_LABEL,
    STOPPED_LABEL_KEY,
};

/// Container runtime backed by the `docker` and `docker compose` CLIs.
#[derive(Debug, Clone, Default)]
pub struct DockerCli;

impl DockerCli {
    pub fn new() -> Self {
        Self
    }

    async fn query(&self, args: &[&str], description: &str) -> Result<String, RuntimeError> {
        let mut cmd = Command::new("docker");
        cmd.args(args);

        let output = run_with_timeout(cmd, DOCKER_QUERY_TIMEOUT, description)
            .await
            .map_err(RuntimeError::QueryFailed)?;
        if !output.status.success() {
            return Err(RuntimeError::QueryFailed(format!(
                "{description}: {}",
                output.stderr_trimmed()
            )));
        }
        Ok(output.stdout_trimmed())
    }
}

fn managed_filter() -> String {
    format!("label={MANAGED_LABEL}")
}

fn project_filter(project: &str) -> String {
    format!("label={COMPOSE_PROJECT_LABEL}={project}")
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn list_managed_projects(&self) -> Result<Vec<String>, RuntimeError> {
        let format = format!("{{{{.Label \"{COMPOSE_PROJECT_LABEL}\"}}}}");
        let stdout = self
            .query(
                &["ps", "--filter", &managed_filter(), "--format", &format],
                "docker ps (managed projects)",
            )
            .await?;

        let projects: BTreeSet<String> = stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Ok(projects.into_iter().collect())
    }

    async fn exited_containers(&self, project: &str) -> Result<Vec<Container>, RuntimeError> {
        let format = format!("{{{{.ID}}}}\t{{{{.Label \"{STOPPED_LABEL_KEY}\"}}}}");
        let stdout = self
            .query(
                &[
                    "ps",
                    "-a",
                    "--filter",
                    &project_filter(project),
                    "--filter",
                    &managed_filter(),
                    "--filter",
                    "status=exited",
                    "--format",
                    &format,
                ],
                "docker ps (exited containers)",
            )
            .await?;

        let containers = stdout
            .lines()
            .filter_map(|line| {
                let mut fields = line.split('\t');
                let id = fields.next()?.trim();
                if id.is_empty() {
                    return None;
                }
                let opt_out = fields.next().map(str::trim) == Some("true");
                Some(Container {
                    id: id.to_string(),
                    opt_out,
                })
            })
            .collect();
        Ok(containers)
    }

    async fn running_opt_out_containers(
        &self,
        project: &str,
    ) -> Result<Vec<String>, RuntimeError> {
        let stopped_filter = format!("label={STOPPED_LABEL}");
        let stdout = self
            .query(
                &[
                    "ps",
                    "--filter",
                    &project_filter(project),
                    "--filter",
                    &managed_filter(),
                    "--filter",
                    &stopped_filter,
                    "--format",
                    "{{.ID}}",
                ],
                "docker ps (opt-out containers)",
            )
            .await?;

        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn compose_up(
        &self,
        project: &str,
        compose_file: &Path,
        workdir: &Path,
    ) -> Result<(), RuntimeError> {
        debug!(project, "docker compose up");

        let mut cmd = Command::new("docker");
        cmd.arg("compose")
            .args(["-p", project])
            .arg("-f")
            .arg(compose_file)
            .args(["up", "-d", "--remove-orphans"])
            .current_dir(workdir)
            .env(COMPOSE_PROJECT_LABELS_ENV, MANAGED_LABEL);

        let output = run_with_timeout(cmd, COMPOSE_TIMEOUT, "docker compose up")
            .await
            .map_err(|err| RuntimeError::ComposeFailed { stderr: err })?;
        if !output.status.success() {
            return Err(RuntimeError::ComposeFailed {
                stderr: output.stderr_trimmed(),
            });
        }
        Ok(())
    }

    async fn compose_down(&self, project: &str) -> Result<(), RuntimeError> {
        debug!(project, "docker compose down");

        let mut cmd = Command::new("docker");
        cmd.arg("compose")
            .args(["-p", project])
            .args(["down", "--remove-orphans"]);

        let output = run_with_timeout(cmd, COMPOSE_TIMEOUT, "docker compose down")
            .await
            .map_err(RuntimeError::CommandFailed)?;
        if !output.status.success() {
            return Err(RuntimeError::CommandFailed(format!(
                "docker compose down: {}",
                output.stderr_trimmed()
            )));
        }
        Ok(())
    }

    async fn stop_container(&self, id: &str) -> Result<(), RuntimeError> {
        let mut cmd = Command::new("docker");
        cmd.args(["stop", id]);

        let output = run_with_timeout(cmd, COMPOSE_TIMEOUT, "docker stop")
            .await
            .map_err(RuntimeError::CommandFailed)?;
        if !output.status.success() {
            return Err(RuntimeError::CommandFailed(format!(
                "docker stop {id}: {}",
                output.stderr_trimmed()
            )));
        }
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> Result<(), RuntimeError> {
        let mut cmd = Command::new("docker");
        cmd.args(["rm", "-f", id]);

        let output = run_with_timeout(cmd, COMPOSE_TIMEOUT, "docker rm")
            .await
            .map_err(RuntimeError::CommandFailed)?;
        if !output.status.success() {
            return Err(RuntimeError::CommandFailed(format!(
                "docker rm -f {id}: {}",
                output.stderr_trimmed()
            )));
        }
        Ok(())
    }

    async fn container_id_by_name(&self, name: &str) -> Result<Option<String>, RuntimeError> {
        let name_filter = format!("name=^{name}$");
        let stdout = self
            .query(
                &["ps", "-aq", "--filter", &name_filter],
                "docker ps (by name)",
            )
            .await?;

        Ok(stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string))
    }
}
