// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded execution of konta's external tools.
//!
//! Each reconciliation pass blocks on its child processes: a clone occupies
//! the cycle until git returns, a compose up until the runtime returns. The
//! helpers here put a ceiling on those waits so a wedged remote or an
//! unresponsive runtime cannot stall the agent forever.

use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Ceiling for `git clone` (slow networks, large trees).
pub const GIT_CLONE_TIMEOUT: Duration = Duration::from_secs(300);

/// Ceiling for local git queries (rev-parse, diff, log).
pub const GIT_QUERY_TIMEOUT: Duration = Duration::from_secs(60);

/// Ceiling for container-runtime queries (ps).
pub const DOCKER_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Ceiling for `docker compose up`/`down` (image pulls included).
pub const COMPOSE_TIMEOUT: Duration = Duration::from_secs(600);

/// Run an external tool with captured output, bounded by `timeout`.
///
/// Expiry kills the child (its handle is dropped) and reports the tool and
/// the ceiling that was hit. A non-zero exit status is NOT an error here:
/// callers inspect `Output::status` themselves, since several git and
/// docker invocations fail in ways the cycle must react to individually.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<Output, String> {
    let Ok(result) = tokio::time::timeout(timeout, cmd.output()).await else {
        return Err(format!(
            "{description} did not finish within {}s and was killed",
            timeout.as_secs()
        ));
    };
    result.map_err(|err| format!("could not run {description}: {err}"))
}

/// Trimmed, lossily-decoded views of a child's captured streams.
///
/// Git and docker both terminate diagnostic lines with a newline and the
/// parsers upstream want neither it nor invalid-UTF-8 surprises.
pub trait OutputExt {
    fn stdout_trimmed(&self) -> String;
    fn stderr_trimmed(&self) -> String;
}

impl OutputExt for Output {
    fn stdout_trimmed(&self) -> String {
        String::from_utf8_lossy(&self.stdout).trim().to_string()
    }

    fn stderr_trimmed(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
