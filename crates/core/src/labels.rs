// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container-label contract with the container runtime.
//!
//! The ownership model reduces to a single rule: Konta mutates only
//! containers carrying [`MANAGED_LABEL`]. Filters on these values belong in
//! the runtime adapter, not scattered across call sites.

/// Label applied to every container Konta creates.
pub const MANAGED_LABEL: &str = "konta.managed=true";

/// Opt-out label set by users in composition files: the container is defined
/// but must never be left running.
pub const STOPPED_LABEL: &str = "konta.stopped=true";

/// Key half of [`STOPPED_LABEL`], for label-value queries.
pub const STOPPED_LABEL_KEY: &str = "konta.stopped";

/// Compose-assigned grouping label carrying the application name.
pub const COMPOSE_PROJECT_LABEL: &str = "com.docker.compose.project";

/// Composition descriptor that marks a directory as an application.
pub const COMPOSE_FILE: &str = "docker-compose.yml";

/// Environment variable instructing `docker compose` to apply extra labels
/// to every container it creates.
pub const COMPOSE_PROJECT_LABELS_ENV: &str = "COMPOSE_PROJECT_LABELS";
