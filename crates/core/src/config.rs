// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration document: load, default, normalise, snapshot.
//!
//! The configuration is a YAML file found at the first existing candidate
//! path (system, user, working directory). Loading applies defaults, overlays
//! the `KONTA_TOKEN` credential from the environment, resolves the apps/hooks
//! subtree once so downstream code never re-derives it, and writes a sibling
//! `.lock` snapshot used to detect operator edits between cycles.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::paths::config_candidates;

/// Environment variable overriding `repository.token`.
pub const TOKEN_ENV: &str = "KONTA_TOKEN";

/// Errors from loading the configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no configuration file found (checked: {checked:?})")]
    NotFound { checked: Vec<PathBuf> },

    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("repository.url is required")]
    MissingUrl,

    #[error("repository.interval must be greater than 0")]
    InvalidInterval,
}

/// Top-level configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: String,
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub deploy: DeployConfig,
    #[serde(default)]
    pub hooks: HooksConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub konta_updates: UpdatePolicy,

    /// Derived apps/hooks locations, filled by the loader. Not part of the
    /// on-disk document.
    #[serde(skip)]
    pub resolved: ResolvedPaths,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default)]
    pub token: String,
    /// Subtree within the working tree containing `apps/` and `hooks/`.
    #[serde(default = "default_path")]
    pub path: String,
    /// Polling interval in seconds.
    #[serde(default = "default_interval")]
    pub interval: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployConfig {
    #[serde(default = "default_true")]
    pub atomic: bool,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self { atomic: true }
    }
}

/// Hook filenames, resolved against `<subtree>/hooks/` by the loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HooksConfig {
    #[serde(default = "default_started_hook")]
    pub started: String,
    #[serde(default = "default_pre_hook")]
    pub pre: String,
    #[serde(default = "default_success_hook")]
    pub success: String,
    #[serde(default = "default_failure_hook")]
    pub failure: String,
    #[serde(default = "default_post_update_hook")]
    pub post_update: String,
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            started: default_started_hook(),
            pre: default_pre_hook(),
            success: default_success_hook(),
            failure: default_failure_hook(),
            post_update: default_post_update_hook(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// One of `debug`, `info`, `warn`, `error`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Behaviour of the periodic agent-update check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpdatePolicy {
    /// Check and apply updates automatically.
    Auto,
    /// Check and log when a newer version exists.
    #[default]
    Notify,
    /// Never check.
    Disabled,
}

impl UpdatePolicy {
    pub fn is_disabled(&self) -> bool {
        matches!(self, UpdatePolicy::Disabled)
    }
}

impl Serialize for UpdatePolicy {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let s = match self {
            UpdatePolicy::Auto => "auto",
            UpdatePolicy::Notify => "notify",
            UpdatePolicy::Disabled => "false",
        };
        serializer.serialize_str(s)
    }
}

impl<'de> Deserialize<'de> for UpdatePolicy {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // YAML treats a bare `false` as a boolean, so accept both spellings.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bool(bool),
            Str(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Bool(false) => Ok(UpdatePolicy::Disabled),
            Raw::Bool(true) => Err(serde::de::Error::custom(
                "konta_updates must be one of auto, notify, false",
            )),
            Raw::Str(s) => match s.as_str() {
                "auto" => Ok(UpdatePolicy::Auto),
                "notify" | "" => Ok(UpdatePolicy::Notify),
                "false" => Ok(UpdatePolicy::Disabled),
                other => Err(serde::de::Error::custom(format!(
                    "konta_updates must be one of auto, notify, false (got {other:?})"
                ))),
            },
        }
    }
}

/// Apps/hooks locations derived from `repository.path`.
///
/// `apps_path` is a forward-slash path relative to the working tree; the
/// scanner joins it onto the release directory and the git client uses it as
/// the diff prefix. Hook paths are relative to the release directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedPaths {
    pub apps_path: String,
    pub hooks: ResolvedHooks,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedHooks {
    pub started: PathBuf,
    pub pre: PathBuf,
    pub success: PathBuf,
    pub failure: PathBuf,
    pub post_update: PathBuf,
}

impl Config {
    /// Load the first configuration file found among the candidate paths.
    pub fn load() -> Result<Self, ConfigError> {
        let path = find_config_path()?;
        Self::load_from(&path)
    }

    /// Load the configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "loading config");

        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut cfg: Config = serde_yaml::from_str(&data)?;
        if cfg.repository.url.is_empty() {
            return Err(ConfigError::MissingUrl);
        }
        if cfg.repository.interval == 0 {
            return Err(ConfigError::InvalidInterval);
        }

        // Environment credential supersedes the file token.
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.is_empty() {
                cfg.repository.token = token;
            }
        }

        cfg.resolved = resolve_paths(&cfg);
        write_lock_snapshot(&cfg, path);
        Ok(cfg)
    }

    /// True if this configuration differs from the `.lock` snapshot written
    /// when it was last loaded (or if the snapshot is missing or unreadable).
    pub fn has_changed(&self, config_path: &Path) -> bool {
        let lock_path = lock_snapshot_path(config_path);
        let data = match std::fs::read_to_string(&lock_path) {
            Ok(d) => d,
            Err(_) => return true,
        };
        let snapshot: LockSnapshot = match serde_yaml::from_str(&data) {
            Ok(s) => s,
            Err(err) => {
                debug!("failed to parse config lock file: {err}");
                return true;
            }
        };

        // Compare by re-serialising; derived fields are skipped either way.
        let current = serde_yaml::to_string(self).unwrap_or_default();
        let locked = serde_yaml::to_string(&snapshot.config).unwrap_or_default();
        let changed = current != locked;
        if changed {
            info!("config file has been modified since last load");
        }
        changed
    }
}

/// Snapshot document written beside the configuration file.
#[derive(Serialize, Deserialize)]
struct LockSnapshot {
    timestamp: String,
    config: Config,
}

fn lock_snapshot_path(config_path: &Path) -> PathBuf {
    let mut os = config_path.as_os_str().to_os_string();
    os.push(".lock");
    PathBuf::from(os)
}

/// Write the `.lock` snapshot. Failure is a warning, never an error.
fn write_lock_snapshot(cfg: &Config, config_path: &Path) {
    let snapshot = LockSnapshot {
        timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        config: cfg.clone(),
    };
    let data = match serde_yaml::to_string(&snapshot) {
        Ok(d) => d,
        Err(err) => {
            warn!("failed to serialise config lock file: {err}");
            return;
        }
    };
    if let Err(err) = std::fs::write(lock_snapshot_path(config_path), data) {
        warn!("failed to write config lock file: {err}");
    }
}

fn find_config_path() -> Result<PathBuf, ConfigError> {
    let candidates = config_candidates();
    for path in &candidates {
        if path.is_file() {
            return Ok(path.clone());
        }
    }
    Err(ConfigError::NotFound {
        checked: candidates,
    })
}

/// Derive the apps scan root and hook paths from `repository.path`.
///
/// `""`/`"."` scan `apps/` with hooks under `hooks/`; a path already ending
/// in `apps` is kept with hooks beside it; anything else gets `/apps` and
/// `/hooks` appended.
fn resolve_paths(cfg: &Config) -> ResolvedPaths {
    let (apps_path, hooks_base) = normalized_subtree(&cfg.repository.path);
    let base = PathBuf::from(hooks_base);
    ResolvedPaths {
        apps_path,
        hooks: ResolvedHooks {
            started: base.join(&cfg.hooks.started),
            pre: base.join(&cfg.hooks.pre),
            success: base.join(&cfg.hooks.success),
            failure: base.join(&cfg.hooks.failure),
            post_update: base.join(&cfg.hooks.post_update),
        },
    }
}

fn normalized_subtree(path: &str) -> (String, String) {
    let p = path.trim().replace('\\', "/");
    let p = p.trim_matches('/');
    if p.is_empty() || p == "." {
        return ("apps".to_string(), "hooks".to_string());
    }
    if p == "apps" {
        return ("apps".to_string(), "hooks".to_string());
    }
    if let Some(base) = p.strip_suffix("/apps") {
        return (p.to_string(), format!("{base}/hooks"));
    }
    (format!("{p}/apps"), format!("{p}/hooks"))
}

fn default_version() -> String {
    "v1".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_path() -> String {
    ".".to_string()
}

fn default_interval() -> u64 {
    120
}

fn default_true() -> bool {
    true
}

fn default_started_hook() -> String {
    "started.sh".to_string()
}

fn default_pre_hook() -> String {
    "pre.sh".to_string()
}

fn default_success_hook() -> String {
    "success.sh".to_string()
}

fn default_failure_hook() -> String {
    "failure.sh".to_string()
}

fn default_post_update_hook() -> String {
    "post_update.sh".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
