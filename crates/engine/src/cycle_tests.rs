// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end cycle scenarios against a local git fixture and the fake
//! container runtime.

use super::*;
use konta_adapters::{FakeRuntime, RuntimeCall};
use konta_storage::state;
use tempfile::TempDir;

fn git(dir: &Path, args: &[&str]) -> String {
    let output = std::process::Command::new("git")
        .args([
            "-c",
            "user.email=konta@example.com",
            "-c",
            "user.name=konta",
        ])
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git available");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn write(path: PathBuf, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

struct Fixture {
    root: TempDir,
    origin: PathBuf,
    cfg: Config,
    paths: StatePaths,
    runtime: FakeRuntime,
}

impl Fixture {
    /// Origin repo with `apps/web` and `apps/api`, one commit.
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        let origin = root.path().join("origin");
        std::fs::create_dir_all(&origin).unwrap();
        git(&origin, &["init", "-b", "main"]);
        write(origin.join("apps/web/docker-compose.yml"), "services: {}\n");
        write(origin.join("apps/api/docker-compose.yml"), "services: {}\n");
        git(&origin, &["add", "-A"]);
        git(&origin, &["commit", "-m", "initial"]);

        let config_path = root.path().join("konta.yaml");
        std::fs::write(
            &config_path,
            format!("repository:\n  url: file://{}\n", origin.display()),
        )
        .unwrap();
        let cfg = Config::load_from(&config_path).unwrap();

        let paths = StatePaths::at(root.path().join("state"));
        Fixture {
            origin,
            cfg,
            paths,
            runtime: FakeRuntime::new(),
            root,
        }
    }

    fn tip(&self) -> String {
        git(&self.origin, &["rev-parse", "HEAD"])
    }

    fn commit_change(&self, rel_path: &str, contents: &str, message: &str) -> String {
        write(self.origin.join(rel_path), contents);
        git(&self.origin, &["add", "-A"]);
        git(&self.origin, &["commit", "-m", message]);
        self.tip()
    }

    async fn run(&self, dry_run: bool) -> Result<CycleOutcome, CycleError> {
        run_cycle(&self.cfg, &self.paths, &GitClient::new(), &self.runtime, dry_run).await
    }

    fn state(&self) -> konta_storage::DeploymentState {
        state::load(&self.paths.state_file())
    }

    fn mutating_call_count(&self) -> usize {
        self.runtime
            .calls()
            .iter()
            .filter(|call| {
                matches!(
                    call,
                    RuntimeCall::ComposeUp { .. }
                        | RuntimeCall::ComposeDown { .. }
                        | RuntimeCall::StopContainer { .. }
                        | RuntimeCall::RemoveContainer { .. }
                )
            })
            .count()
    }
}

#[tokio::test]
async fn first_cycle_deploys_every_application() {
    let fx = Fixture::new();
    let tip = fx.tip();

    let outcome = fx.run(false).await.unwrap();
    assert_eq!(
        outcome,
        CycleOutcome::Deployed {
            commit: tip.clone(),
            projects: vec!["api".to_string(), "web".to_string()],
        }
    );

    // Composition up in sorted order.
    assert_eq!(fx.runtime.upped_projects(), vec!["api", "web"]);

    // Release published and current repointed.
    let release = fx.paths.releases_dir().join(&tip);
    assert!(release.join("apps/web/docker-compose.yml").is_file());
    assert_eq!(
        std::fs::read_link(fx.paths.current_link()).unwrap(),
        release
    );

    // No temp tree left behind.
    let leftovers: Vec<String> = std::fs::read_dir(fx.paths.releases_dir())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("temp-"))
        .collect();
    assert!(leftovers.is_empty(), "stale temp trees: {leftovers:?}");

    // State records the commit and both applications.
    let state = fx.state();
    assert_eq!(state.last_commit, tip);
    assert_eq!(state.projects.len(), 2);
    assert_eq!(state.projects["web"].last_commit, tip);
}

#[tokio::test]
async fn unchanged_commit_only_health_checks() {
    let fx = Fixture::new();
    let tip = fx.tip();

    fx.run(false).await.unwrap();
    let mutations_after_deploy = fx.mutating_call_count();
    let state_before = std::fs::read_to_string(fx.paths.state_file()).unwrap();

    let outcome = fx.run(false).await.unwrap();
    assert_eq!(outcome, CycleOutcome::NoChange { commit: tip });

    // Health check probed but mutated nothing, and state was not rewritten.
    assert_eq!(fx.mutating_call_count(), mutations_after_deploy);
    let state_after = std::fs::read_to_string(fx.paths.state_file()).unwrap();
    assert_eq!(state_before, state_after);
}

#[tokio::test]
async fn edit_confined_to_one_application_restarts_only_it() {
    let fx = Fixture::new();
    let first = fx.tip();
    fx.run(false).await.unwrap();

    let second = fx.commit_change("apps/web/nginx.conf", "server {}\n", "web only");
    let outcome = fx.run(false).await.unwrap();
    assert_eq!(
        outcome,
        CycleOutcome::Deployed {
            commit: second.clone(),
            projects: vec!["web".to_string()],
        }
    );

    assert_eq!(fx.runtime.upped_projects(), vec!["api", "web", "web"]);

    let state = fx.state();
    assert_eq!(state.projects["web"].last_commit, second);
    assert_eq!(state.projects["api"].last_commit, first);
}

#[tokio::test]
async fn removed_application_is_torn_down() {
    let fx = Fixture::new();
    fx.run(false).await.unwrap();

    // The runtime now reports both applications as managed and running.
    fx.runtime.set_running_projects(&["api", "web"]);

    std::fs::remove_dir_all(fx.origin.join("apps/api")).unwrap();
    git(&fx.origin, &["add", "-A"]);
    git(&fx.origin, &["commit", "-m", "drop api"]);

    let outcome = fx.run(false).await.unwrap();
    match outcome {
        CycleOutcome::Deployed { projects, .. } => assert!(projects.is_empty()),
        other => panic!("expected Deployed, got {other:?}"),
    }
    assert_eq!(fx.runtime.downed_projects(), vec!["api"]);
}

#[tokio::test]
async fn commit_outside_apps_advances_state_without_reconciling() {
    let fx = Fixture::new();
    fx.run(false).await.unwrap();
    let ups_after_deploy = fx.runtime.upped_projects().len();

    let second = fx.commit_change("README.md", "# infra\n", "docs");
    let outcome = fx.run(false).await.unwrap();
    assert_eq!(outcome, CycleOutcome::NoAppChanges { commit: second.clone() });

    assert_eq!(fx.runtime.upped_projects().len(), ups_after_deploy);
    assert_eq!(fx.state().last_commit, second);
}

#[tokio::test]
async fn pre_hook_veto_still_records_the_commit() {
    let fx = Fixture::new();
    let marker = fx.root.path().join("failure-ran");

    write(fx.origin.join("hooks/pre.sh"), "exit 1\n");
    write(
        fx.origin.join("hooks/failure.sh"),
        &format!("touch {}\n", marker.display()),
    );
    git(&fx.origin, &["add", "-A"]);
    git(&fx.origin, &["commit", "-m", "add vetoing hooks"]);
    let tip = fx.tip();

    let err = fx.run(false).await.unwrap_err();
    assert!(matches!(err, CycleError::PreHook(_)));

    // Reconciliation was vetoed, the failure hook ran, and the commit was
    // recorded so the next tick does not loop on it.
    assert!(fx.runtime.upped_projects().is_empty());
    assert!(marker.is_file());
    assert_eq!(fx.state().last_commit, tip);

    let outcome = fx.run(false).await.unwrap();
    assert_eq!(outcome, CycleOutcome::NoChange { commit: tip });
}

#[tokio::test]
async fn success_hook_runs_in_the_published_release() {
    let fx = Fixture::new();
    let marker = fx.root.path().join("success-cwd");

    write(
        fx.origin.join("hooks/success.sh"),
        &format!("pwd > {}\n", marker.display()),
    );
    git(&fx.origin, &["add", "-A"]);
    git(&fx.origin, &["commit", "-m", "add success hook"]);
    let tip = fx.tip();

    fx.run(false).await.unwrap();

    let recorded = std::fs::read_to_string(&marker).unwrap();
    assert_eq!(
        std::fs::canonicalize(recorded.trim()).unwrap(),
        std::fs::canonicalize(fx.paths.releases_dir().join(&tip)).unwrap()
    );
}

#[tokio::test]
async fn dry_run_leaves_no_trace() {
    let fx = Fixture::new();

    let outcome = fx.run(true).await.unwrap();
    assert!(matches!(outcome, CycleOutcome::DryRun { .. }));

    assert_eq!(fx.mutating_call_count(), 0);
    assert!(!fx.paths.state_file().exists());
    assert!(!fx.paths.current_link().exists());

    let releases: Vec<_> = std::fs::read_dir(fx.paths.releases_dir())
        .unwrap()
        .collect();
    assert!(releases.is_empty());
}

#[tokio::test]
async fn deployment_failure_runs_failure_hook_and_errors() {
    let fx = Fixture::new();
    let marker = fx.root.path().join("failure-ran");

    write(
        fx.origin.join("hooks/failure.sh"),
        &format!("touch {}\n", marker.display()),
    );
    git(&fx.origin, &["add", "-A"]);
    git(&fx.origin, &["commit", "-m", "add failure hook"]);
    let tip = fx.tip();

    fx.runtime.push_up_failure("api", "invalid compose file");

    let err = fx.run(false).await.unwrap_err();
    assert!(matches!(err, CycleError::Reconcile(_)));
    assert!(marker.is_file());

    // Forward progress: the poisoned commit is already recorded.
    assert_eq!(fx.state().last_commit, tip);
}
