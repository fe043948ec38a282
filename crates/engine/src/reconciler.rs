// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconciler: converge managed containers toward the working tree.
//!
//! Applications are processed sequentially in sorted order. Only containers
//! carrying the ownership label are ever probed or torn down; the runtime
//! adapter applies that filter, so no call site here adds one.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use konta_adapters::{Container, ContainerRuntime, RuntimeError};
use konta_core::labels::COMPOSE_FILE;

use crate::scanner;

/// Per-cycle scope: either every application, or only those a commit range
/// touched. `All` arises on first deployment and when change detection is
/// unavailable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectFilter {
    All,
    Only(BTreeSet<String>),
}

impl ProjectFilter {
    pub fn from_changed(changed: Option<Vec<String>>) -> Self {
        match changed {
            None => ProjectFilter::All,
            Some(projects) => ProjectFilter::Only(projects.into_iter().collect()),
        }
    }

    fn includes(&self, project: &str) -> bool {
        match self {
            ProjectFilter::All => true,
            ProjectFilter::Only(projects) => projects.contains(project),
        }
    }
}

/// Errors that abort a reconciliation pass.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to scan applications: {0}")]
    Scan(#[from] io::Error),

    #[error("failed to reconcile {project}: {source}")]
    Project {
        project: String,
        #[source]
        source: RuntimeError,
    },
}

/// Drives the container runtime toward the desired set.
pub struct Reconciler<R: ContainerRuntime> {
    runtime: R,
    apps_dir: PathBuf,
    dry_run: bool,
    filter: ProjectFilter,
}

impl<R: ContainerRuntime> Reconciler<R> {
    pub fn new(runtime: R, repo_dir: &Path, apps_path: &str, dry_run: bool) -> Self {
        Self {
            runtime,
            apps_dir: repo_dir.join(apps_path),
            dry_run,
            filter: ProjectFilter::All,
        }
    }

    /// Scope this pass to the applications a commit range touched.
    pub fn set_changed_projects(&mut self, changed: Option<Vec<String>>) {
        self.filter = ProjectFilter::from_changed(changed);
        match &self.filter {
            ProjectFilter::All => debug!("reconciler configured to process all projects"),
            ProjectFilter::Only(projects) => {
                debug!("reconciler configured for {} project(s): {projects:?}", projects.len())
            }
        }
    }

    /// Run one full reconciliation pass. Returns the applications actually
    /// processed; any per-project failure aborts the pass.
    pub async fn reconcile(&self) -> Result<Vec<String>, ReconcileError> {
        info!("starting reconciliation");

        let desired = scanner::desired_projects(&self.apps_dir)?;
        info!("found {} desired project(s)", desired.len());

        let running = self.running_projects().await;
        info!("found {} running project(s)", running.len());

        let mut reconciled: Vec<String> = Vec::new();

        for project in &desired {
            if !self.filter.includes(project) {
                info!("skipping project {project} (no changes detected)");
                continue;
            }
            self.reconcile_project(project)
                .await
                .map_err(|source| ReconcileError::Project {
                    project: project.clone(),
                    source,
                })?;
            reconciled.push(project.clone());
        }

        // Unchanged applications may still have exited containers, e.g. after
        // a host reboot or an out-of-band `docker stop`. Start those.
        for project in &desired {
            if reconciled.contains(project) {
                continue;
            }
            if self.restart_if_stopped(project).await {
                reconciled.push(project.clone());
            }
        }

        self.remove_orphans(&desired, &running).await;

        info!("reconciliation complete");
        Ok(reconciled)
    }

    /// Lighter-weight pass for cycles where no commit changed: restart
    /// stopped containers and tear down orphans, without re-upping unchanged
    /// compositions. Failures are advisory. Returns the projects started.
    pub async fn health_check(&self) -> Vec<String> {
        let desired = match scanner::desired_projects(&self.apps_dir) {
            Ok(desired) => desired,
            Err(err) => {
                warn!("health check could not scan applications: {err}");
                return Vec::new();
            }
        };

        let mut started = Vec::new();
        for project in &desired {
            if self.restart_if_stopped(project).await {
                started.push(project.clone());
            }
        }

        let running = self.running_projects().await;
        self.remove_orphans(&desired, &running).await;

        started
    }

    /// The prober chokepoint: a failed probe yields the empty set so the
    /// reconciler converges forward (re-create) instead of tearing down
    /// containers it has no evidence about.
    async fn running_projects(&self) -> Vec<String> {
        match self.runtime.list_managed_projects().await {
            Ok(projects) => projects,
            Err(err) => {
                warn!("failed to probe running projects: {err} (assuming none)");
                Vec::new()
            }
        }
    }

    async fn reconcile_project(&self, project: &str) -> Result<(), RuntimeError> {
        info!("reconciling project: {project}");

        if self.dry_run {
            info!("[dry-run] would run docker compose for {project}");
            return Ok(());
        }

        let workdir = self.apps_dir.join(project);
        let compose_file = workdir.join(COMPOSE_FILE);

        if let Err(err) = self
            .runtime
            .compose_up(project, &compose_file, &workdir)
            .await
        {
            if !err.is_name_conflict() {
                return Err(err);
            }

            warn!("container name conflict detected for {project}, attempting cleanup");
            self.remove_conflicting_containers(project, &compose_file)
                .await;

            // One retry after cleanup; a second failure is fatal.
            self.runtime
                .compose_up(project, &compose_file, &workdir)
                .await?;
            info!("resolved container name conflict for {project}");
        }

        self.enforce_opt_out(project).await;

        info!("project {project} reconciled");
        Ok(())
    }

    /// Stop running containers that declare the keep-stopped opt-out.
    async fn enforce_opt_out(&self, project: &str) {
        let ids = match self.runtime.running_opt_out_containers(project).await {
            Ok(ids) => ids,
            Err(err) => {
                warn!("failed to check opt-out containers for {project}: {err}");
                return;
            }
        };
        for id in ids {
            info!("stopping opt-out container {id} for {project}");
            if let Err(err) = self.runtime.stop_container(&id).await {
                warn!("failed to stop opt-out container {id}: {err}");
            }
        }
    }

    /// Force-remove containers squatting on names the composition declares.
    /// Safe outside the ownership label: only names written in the compose
    /// file are touched.
    async fn remove_conflicting_containers(&self, project: &str, compose_file: &Path) {
        let names = match container_names_from_compose(compose_file) {
            Ok(names) => names,
            Err(err) => {
                warn!("failed to parse compose file for {project}: {err}");
                return;
            }
        };

        for name in names {
            match self.runtime.container_id_by_name(&name).await {
                Ok(Some(id)) => {
                    info!("removing conflicting container {name} ({id})");
                    if let Err(err) = self.runtime.remove_container(&id).await {
                        warn!("failed to remove container {name}: {err}");
                    }
                }
                Ok(None) => {}
                Err(err) => warn!("failed to look up container {name}: {err}"),
            }
        }
    }

    /// Start a project whose managed containers have exited, unless every
    /// exited container opted out. Failures are advisory. True if started.
    async fn restart_if_stopped(&self, project: &str) -> bool {
        let exited = match self.runtime.exited_containers(project).await {
            Ok(exited) => exited,
            Err(err) => {
                warn!("failed to check containers for {project}: {err}");
                return false;
            }
        };
        if !exited.iter().any(|c: &Container| !c.opt_out) {
            return false;
        }

        info!("project {project} has stopped containers, starting them");
        match self.start_project(project).await {
            Ok(()) => true,
            Err(err) => {
                warn!("failed to start project {project}: {err}");
                false
            }
        }
    }

    async fn start_project(&self, project: &str) -> Result<(), RuntimeError> {
        if self.dry_run {
            info!("[dry-run] would start containers for {project}");
            return Ok(());
        }

        let workdir = self.apps_dir.join(project);
        let compose_file = workdir.join(COMPOSE_FILE);
        self.runtime
            .compose_up(project, &compose_file, &workdir)
            .await?;

        info!("project {project} started");
        Ok(())
    }

    /// Tear down managed projects no longer present in the working tree.
    /// `running` is already restricted to the ownership label by the probe.
    async fn remove_orphans(&self, desired: &[String], running: &[String]) {
        for project in running {
            if desired.contains(project) {
                continue;
            }
            if self.dry_run {
                info!("[dry-run] would remove project: {project}");
                continue;
            }
            info!("removing orphan managed project: {project}");
            if let Err(err) = self.runtime.compose_down(project).await {
                error!("failed to remove project {project}: {err}");
            }
        }
    }
}

/// Textually extract `container_name:` values from a composition file.
fn container_names_from_compose(path: &Path) -> io::Result<Vec<String>> {
    let data = std::fs::read_to_string(path)?;

    let mut names = Vec::new();
    for line in data.lines() {
        let trimmed = line.trim();
        if let Some(value) = trimmed.strip_prefix("container_name:") {
            let name = value.trim().trim_matches(|c| c == '"' || c == '\'');
            if !name.is_empty() {
                names.push(name.to_string());
            }
        }
    }
    Ok(names)
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;
