// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use konta_core::config::ResolvedHooks;
use tempfile::TempDir;

fn hooks_in(base: &str) -> ResolvedHooks {
    let base = PathBuf::from(base);
    ResolvedHooks {
        started: base.join("started.sh"),
        pre: base.join("pre.sh"),
        success: base.join("success.sh"),
        failure: base.join("failure.sh"),
        post_update: base.join("post_update.sh"),
    }
}

fn write_hook(release: &Path, rel: &str, script: &str) {
    let path = release.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, script).unwrap();
}

#[tokio::test]
async fn missing_hook_is_a_silent_noop() {
    let release = TempDir::new().unwrap();
    let runner = HookRunner::new(release.path(), hooks_in("hooks"));
    runner.run_pre().await.unwrap();
    runner.run_success().await.unwrap();
}

#[tokio::test]
async fn zero_exit_succeeds() {
    let release = TempDir::new().unwrap();
    write_hook(release.path(), "hooks/pre.sh", "exit 0\n");

    let runner = HookRunner::new(release.path(), hooks_in("hooks"));
    runner.run_pre().await.unwrap();
}

#[tokio::test]
async fn nonzero_exit_reports_hook_and_code() {
    let release = TempDir::new().unwrap();
    write_hook(release.path(), "hooks/pre.sh", "exit 3\n");

    let runner = HookRunner::new(release.path(), hooks_in("hooks"));
    match runner.run_pre().await {
        Err(HookError::Failed { hook, code }) => {
            assert_eq!(hook, "pre");
            assert_eq!(code, Some(3));
        }
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn hook_runs_in_the_release_directory() {
    let release = TempDir::new().unwrap();
    write_hook(release.path(), "hooks/success.sh", "pwd > cwd.txt\n");

    let runner = HookRunner::new(release.path(), hooks_in("hooks"));
    runner.run_success().await.unwrap();

    let recorded = std::fs::read_to_string(release.path().join("cwd.txt")).unwrap();
    assert_eq!(
        std::fs::canonicalize(recorded.trim()).unwrap(),
        std::fs::canonicalize(release.path()).unwrap()
    );
}

#[tokio::test]
async fn absolute_hook_path_is_used_verbatim() {
    let release = TempDir::new().unwrap();
    let elsewhere = TempDir::new().unwrap();
    let script = elsewhere.path().join("custom.sh");
    std::fs::write(&script, "exit 0\n").unwrap();

    let mut hooks = hooks_in("hooks");
    hooks.pre = script;
    let runner = HookRunner::new(release.path(), hooks);
    runner.run_pre().await.unwrap();
}

#[tokio::test]
async fn post_update_output_is_suppressed() {
    let release = TempDir::new().unwrap();
    // Writing a marker proves the hook ran even with stdio discarded.
    write_hook(
        release.path(),
        "hooks/post_update.sh",
        "echo noisy; touch ran.txt\n",
    );

    let runner = HookRunner::new(release.path(), hooks_in("hooks"));
    runner.run_post_update().await.unwrap();
    assert!(release.path().join("ran.txt").is_file());
}

#[tokio::test]
async fn advisory_logging_swallows_failure() {
    let release = TempDir::new().unwrap();
    write_hook(release.path(), "hooks/failure.sh", "exit 1\n");

    let runner = HookRunner::new(release.path(), hooks_in("hooks"));
    log_advisory(runner.run_failure().await);
}
