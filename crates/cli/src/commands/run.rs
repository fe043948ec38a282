// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `konta run` - single reconciliation pass or polling watch loop.

use anyhow::Result;
use clap::Args;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use crate::updates;
use konta_core::{Config, StatePaths};
use konta_engine::{cycle, log_advisory, HookRunner};

/// Check for agent updates every Nth tick.
const UPDATE_CHECK_EVERY: u32 = 10;

#[derive(Args)]
pub struct RunArgs {
    /// Show what would change without mutating the container runtime
    #[arg(long)]
    pub dry_run: bool,

    /// Keep polling the repository at the configured interval
    #[arg(long)]
    pub watch: bool,
}

pub async fn run(args: RunArgs) -> Result<()> {
    match cycle::reconcile_once(args.dry_run).await {
        Ok(_) => {}
        // In watch mode a failed pass is logged and the loop carries on.
        Err(err) if args.watch => error!("deployment error: {err}"),
        Err(err) => return Err(err.into()),
    }

    if !args.watch {
        return Ok(());
    }
    watch_loop().await
}

async fn watch_loop() -> Result<()> {
    let mut cfg = Config::load()?;
    info!(
        "watch mode enabled, polling every {} seconds",
        cfg.repository.interval
    );

    run_started_hook(&cfg).await;
    updates::check_for_updates(cfg.konta_updates).await;

    let mut ticker = new_ticker(cfg.repository.interval);
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut ticks_since_check: u32 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // Reload config each tick to pick up live edits; a reload
                // failure keeps the previous configuration.
                match Config::load() {
                    Ok(new_cfg) => {
                        if new_cfg.repository.interval != cfg.repository.interval {
                            info!(
                                "config updated: polling interval changed from {} to {} seconds",
                                cfg.repository.interval, new_cfg.repository.interval
                            );
                            ticker = new_ticker(new_cfg.repository.interval);
                        }
                        cfg = new_cfg;
                    }
                    Err(err) => error!("failed to reload config: {err}"),
                }

                ticks_since_check += 1;
                if ticks_since_check >= UPDATE_CHECK_EVERY {
                    ticks_since_check = 0;
                    updates::check_for_updates(cfg.konta_updates).await;
                }

                if let Err(err) = cycle::reconcile_once(false).await {
                    error!("deployment error: {err}");
                }
            }

            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                break;
            }

            _ = sigint.recv() => {
                info!("received SIGINT, shutting down");
                break;
            }
        }
    }

    Ok(())
}

/// First tick fires after one full period; the initial pass already ran.
fn new_ticker(interval_secs: u64) -> tokio::time::Interval {
    let period = Duration::from_secs(interval_secs.max(1));
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker
}

/// Run the `started` hook against the current release, if one exists.
async fn run_started_hook(cfg: &Config) {
    let current = StatePaths::resolve().current_link();
    if !current.exists() {
        return;
    }
    let runner = HookRunner::new(current, cfg.resolved.hooks.clone());
    log_advisory(runner.run_started().await);
}
