// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic agent-update check (check-and-notify).
//!
//! Queries the latest published release and logs when a newer version
//! exists. Binary self-replacement is out of scope for the agent: `auto`
//! behaves like `notify` with a hint. Failures never affect a cycle.

use konta_core::UpdatePolicy;
use serde::Deserialize;
use tracing::{debug, info};

const LATEST_RELEASE_URL: &str =
    "https://api.github.com/repos/talyguryn/konta/releases/latest";

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
}

/// Compare the latest published release against this build and log the
/// outcome according to the configured policy.
pub async fn check_for_updates(policy: UpdatePolicy) {
    if policy.is_disabled() {
        return;
    }

    let release = match fetch_latest_release().await {
        Ok(release) => release,
        Err(err) => {
            debug!("update check failed: {err}");
            return;
        }
    };

    let latest = normalize_tag(&release.tag_name);
    let current = env!("CARGO_PKG_VERSION");
    if latest == current {
        return;
    }

    info!("new konta version available: v{latest} (current: v{current})");
    if policy == UpdatePolicy::Auto {
        info!("automatic binary updates are not performed by the agent; install v{latest} via your deployment workflow");
    }
}

async fn fetch_latest_release() -> Result<Release, reqwest::Error> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("konta/", env!("CARGO_PKG_VERSION")))
        .build()?;
    client
        .get(LATEST_RELEASE_URL)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
}

fn normalize_tag(tag: &str) -> &str {
    tag.trim().trim_start_matches('v')
}

#[cfg(test)]
#[path = "updates_tests.rs"]
mod tests;
