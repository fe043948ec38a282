// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `konta status` - daemon state and last deployment.

use anyhow::Result;
use tokio::process::Command;

use konta_core::{short_commit, StatePaths};
use konta_storage::state;

pub async fn status() -> Result<()> {
    if daemon_active().await {
        println!("konta daemon is running");
    } else {
        println!("konta daemon is not running");
    }
    println!();

    let paths = StatePaths::resolve();
    let current = state::load(&paths.state_file());

    if current.last_commit.is_empty() {
        println!("Last deployment: (none yet)");
    } else {
        println!("Last deployment:");
        println!("  Commit:    {}", short_commit(&current.last_commit));
        println!("  Timestamp: {}", current.last_deploy_time);
        if !current.projects.is_empty() {
            let names: Vec<&str> = current.projects.keys().map(String::as_str).collect();
            println!("  Projects:  {}", names.join(", "));
        }
    }

    Ok(())
}

/// Boundary probe of the process supervisor; any failure reads as inactive.
async fn daemon_active() -> bool {
    let output = Command::new("systemctl")
        .args(["is-active", "konta"])
        .output()
        .await;
    match output {
        Ok(output) => {
            output.status.success()
                && String::from_utf8_lossy(&output.stdout).trim() == "active"
        }
        Err(_) => false,
    }
}
