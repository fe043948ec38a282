// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `konta config` - print or edit the active configuration file.

use anyhow::{bail, Result};
use clap::Args;
use tokio::process::Command;

use konta_core::paths::config_candidates;

#[derive(Args)]
pub struct ConfigArgs {
    /// Open the configuration file in $EDITOR
    #[arg(short = 'e', long)]
    pub edit: bool,
}

pub async fn config(args: ConfigArgs) -> Result<()> {
    let candidates = config_candidates();
    let Some(path) = candidates.iter().find(|p| p.is_file()) else {
        bail!("no configuration file found (checked: {candidates:?})");
    };

    if args.edit {
        let editor = std::env::var("EDITOR").unwrap_or_else(|_| "nano".to_string());
        let status = Command::new(&editor).arg(path).status().await?;
        if !status.success() {
            bail!("{editor} exited with {:?}", status.code());
        }
        return Ok(());
    }

    let contents = std::fs::read_to_string(path)?;
    println!("{}", path.display());
    print!("{contents}");
    if !contents.ends_with('\n') {
        println!();
    }

    Ok(())
}
