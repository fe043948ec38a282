// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Desired-state scanner.

use konta_core::labels::COMPOSE_FILE;
use std::io;
use std::path::Path;

/// Applications under the apps root: immediate subdirectories containing a
/// composition descriptor. Sorted for deterministic processing order.
pub fn desired_projects(apps_dir: &Path) -> io::Result<Vec<String>> {
    let mut projects = Vec::new();

    for entry in std::fs::read_dir(apps_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if !entry.path().join(COMPOSE_FILE).is_file() {
            continue;
        }
        projects.push(entry.file_name().to_string_lossy().into_owned());
    }

    projects.sort();
    Ok(projects)
}

#[cfg(test)]
#[path = "scanner_tests.rs"]
mod tests;
