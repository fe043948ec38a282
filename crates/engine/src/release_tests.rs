// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::PathBuf;
use tempfile::TempDir;

const COMMIT_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const COMMIT_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

struct Layout {
    _dir: TempDir,
    releases: PathBuf,
    current: PathBuf,
}

fn layout() -> Layout {
    let dir = TempDir::new().unwrap();
    let releases = dir.path().join("releases");
    let current = dir.path().join("current");
    Layout {
        releases,
        current,
        _dir: dir,
    }
}

fn mktree(l: &Layout, name: &str) -> PathBuf {
    let source = l.releases.join(name);
    std::fs::create_dir_all(source.join("apps/web")).unwrap();
    std::fs::write(source.join("apps/web/docker-compose.yml"), "services: {}\n").unwrap();
    source
}

#[test]
fn switch_moves_tree_and_points_current() {
    let l = layout();
    let source = mktree(&l, "temp-1");

    atomic_switch(&l.releases, &l.current, COMMIT_A, &source).unwrap();

    let target = l.releases.join(COMMIT_A);
    assert!(target.join("apps/web/docker-compose.yml").is_file());
    assert!(!source.exists());
    assert_eq!(std::fs::read_link(&l.current).unwrap(), target);
}

#[test]
fn superseded_releases_are_pruned() {
    let l = layout();

    let first = mktree(&l, "temp-1");
    atomic_switch(&l.releases, &l.current, COMMIT_A, &first).unwrap();

    let second = mktree(&l, "temp-2");
    atomic_switch(&l.releases, &l.current, COMMIT_B, &second).unwrap();

    let remaining: Vec<String> = std::fs::read_dir(&l.releases)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(remaining, vec![COMMIT_B.to_string()]);
    assert_eq!(
        std::fs::read_link(&l.current).unwrap(),
        l.releases.join(COMMIT_B)
    );
}

#[test]
fn reapplying_the_same_commit_discards_the_new_tree() {
    let l = layout();

    let first = mktree(&l, "temp-1");
    atomic_switch(&l.releases, &l.current, COMMIT_A, &first).unwrap();

    let second = mktree(&l, "temp-2");
    atomic_switch(&l.releases, &l.current, COMMIT_A, &second).unwrap();

    assert!(!second.exists());
    assert_eq!(
        std::fs::read_link(&l.current).unwrap(),
        l.releases.join(COMMIT_A)
    );
}

#[test]
fn stale_temp_directories_are_pruned_on_switch() {
    let l = layout();
    // Left behind by a crashed cycle.
    mktree(&l, "temp-stale");

    let source = mktree(&l, "temp-1");
    atomic_switch(&l.releases, &l.current, COMMIT_A, &source).unwrap();

    assert!(!l.releases.join("temp-stale").exists());
}

#[test]
fn current_is_replaced_not_nested() {
    let l = layout();

    let first = mktree(&l, "temp-1");
    atomic_switch(&l.releases, &l.current, COMMIT_A, &first).unwrap();
    let second = mktree(&l, "temp-2");
    atomic_switch(&l.releases, &l.current, COMMIT_B, &second).unwrap();

    // The symlink itself was replaced; it resolves to exactly one release.
    let resolved = std::fs::canonicalize(&l.current).unwrap();
    assert_eq!(
        resolved.file_name().unwrap().to_string_lossy(),
        COMMIT_B
    );
}
