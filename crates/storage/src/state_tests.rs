// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

const COMMIT_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const COMMIT_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

#[test]
fn absent_file_loads_as_never_deployed() {
    let dir = TempDir::new().unwrap();
    let state = load(&dir.path().join("state.json"));
    assert_eq!(state, DeploymentState::default());
    assert!(state.last_commit.is_empty());
}

#[test]
fn corrupt_file_loads_as_never_deployed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, b"{not json").unwrap();
    assert_eq!(load(&path), DeploymentState::default());
}

#[test]
fn save_and_load_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");

    let mut state = DeploymentState {
        last_commit: COMMIT_A.to_string(),
        last_deploy_time: "2026-08-02 10:00:00".to_string(),
        ..Default::default()
    };
    state.projects.insert(
        "web".to_string(),
        ProjectState {
            last_commit: COMMIT_A.to_string(),
            last_deploy_time: "2026-08-02 10:00:00".to_string(),
        },
    );

    save(&path, &state).unwrap();
    let loaded = load(&path);
    assert_eq!(loaded.last_commit, COMMIT_A);
    assert_eq!(loaded.projects["web"].last_commit, COMMIT_A);
    // Version is stamped on save.
    assert_eq!(loaded.version, "0.1.0");
}

#[test]
fn save_leaves_no_temp_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");
    save(&path, &DeploymentState::default()).unwrap();
    assert!(path.is_file());
    assert!(!path.with_extension("tmp").exists());
}

#[test]
fn update_sets_global_commit_and_merges_projects() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");

    update(&path, COMMIT_A, &["api".to_string(), "web".to_string()]).unwrap();
    let state = load(&path);
    assert_eq!(state.last_commit, COMMIT_A);
    assert_eq!(state.projects.len(), 2);

    // Second update touches only one project; the other entry is retained.
    update(&path, COMMIT_B, &["web".to_string()]).unwrap();
    let state = load(&path);
    assert_eq!(state.last_commit, COMMIT_B);
    assert_eq!(state.projects["web"].last_commit, COMMIT_B);
    assert_eq!(state.projects["api"].last_commit, COMMIT_A);
}

#[test]
fn update_with_empty_project_list_still_advances_commit() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");

    update(&path, COMMIT_A, &["web".to_string()]).unwrap();
    update(&path, COMMIT_B, &[]).unwrap();

    let state = load(&path);
    assert_eq!(state.last_commit, COMMIT_B);
    assert_eq!(state.projects["web"].last_commit, COMMIT_A);
}

#[test]
fn update_creates_missing_parent_directory() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("state.json");
    update(&path, COMMIT_A, &[]).unwrap();
    assert_eq!(load(&path).last_commit, COMMIT_A);
}
