// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing setup: stdout (captured by the journal under systemd) plus a
//! non-blocking file appender at the konta log path.

use konta_core::Config;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable overriding the log filter (standard directive
/// syntax, e.g. `KONTA_LOG=debug` or `KONTA_LOG=konta_engine=debug`).
pub const LOG_ENV: &str = "KONTA_LOG";

/// Initialise logging. The returned guard must be held for the process
/// lifetime so buffered file output is flushed on exit.
pub fn init() -> Option<WorkerGuard> {
    // The configured level seeds the filter; `KONTA_LOG` wins when set.
    // Config errors fall back to `info`; commands report them properly.
    let level = Config::load()
        .map(|cfg| cfg.logging.level)
        .unwrap_or_else(|_| "info".to_string());
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = fmt::layer().with_target(false);

    let log_path = konta_core::paths::log_path();
    let file_layer = log_path.parent().and_then(|dir| {
        std::fs::create_dir_all(dir).ok()?;
        let appender = tracing_appender::rolling::never(dir, log_path.file_name()?);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        Some((fmt::layer().with_ansi(false).with_writer(writer), guard))
    });

    match file_layer {
        Some((layer, guard)) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stdout_layer)
                .with(layer)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stdout_layer)
                .init();
            None
        }
    }
}
