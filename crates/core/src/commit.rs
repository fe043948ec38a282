// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Revision-identifier helpers.

/// True if `s` is a full 40-hex git commit hash.
pub fn is_commit_hash(s: &str) -> bool {
    s.len() == 40 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Abbreviate a commit hash for log output.
///
/// Returns the first 8 characters, the whole string when shorter, or
/// `"none"` when empty.
pub fn short_commit(commit: &str) -> &str {
    if commit.is_empty() {
        return "none";
    }
    commit.get(..8).unwrap_or(commit)
}

#[cfg(test)]
#[path = "commit_tests.rs"]
mod tests;
