// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! konta - GitOps for Docker Compose
//!
//! A single-node agent that polls a Git repository and drives the host's
//! container runtime to match it. `konta run --watch` is the long-lived
//! daemon entry point (typically supervised by systemd); `run` alone
//! performs a single reconciliation pass.

mod commands;
mod logging;
mod updates;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{config, run, status};

#[derive(Parser)]
#[command(name = "konta", version, about = "GitOps for Docker Compose")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the repository against the container runtime
    Run(run::RunArgs),
    /// Show daemon state and the last deployment
    Status,
    /// Print or edit the active configuration file
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let _log_guard = logging::init();

    if let Err(err) = dispatch(cli).await {
        tracing::error!("{err:#}");
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run(args) => run::run(args).await,
        Commands::Status => status::status().await,
        Commands::Config(args) => config::config(args).await,
    }
}
