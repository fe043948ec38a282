// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

fn mkapp(root: &Path, name: &str, with_compose: bool) {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    if with_compose {
        std::fs::write(dir.join("docker-compose.yml"), "services: {}\n").unwrap();
    }
}

#[test]
fn lists_only_directories_with_compose_files_sorted() {
    let dir = TempDir::new().unwrap();
    mkapp(dir.path(), "web", true);
    mkapp(dir.path(), "api", true);
    mkapp(dir.path(), "docs", false);
    std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

    let projects = desired_projects(dir.path()).unwrap();
    assert_eq!(projects, vec!["api".to_string(), "web".to_string()]);
}

#[test]
fn empty_apps_dir_yields_empty_set() {
    let dir = TempDir::new().unwrap();
    assert!(desired_projects(dir.path()).unwrap().is_empty());
}

#[test]
fn missing_apps_dir_is_an_error() {
    let dir = TempDir::new().unwrap();
    assert!(desired_projects(&dir.path().join("missing")).is_err());
}

#[test]
fn a_compose_directory_does_not_qualify() {
    let dir = TempDir::new().unwrap();
    let odd = dir.path().join("odd").join("docker-compose.yml");
    std::fs::create_dir_all(&odd).unwrap();
    assert!(desired_projects(dir.path()).unwrap().is_empty());
}
