// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Export command - write the network snapshot to a file or stdout

use super::Workspace;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// Run the export command
pub fn run(ws: &Workspace, output: Option<PathBuf>) -> Result<()> {
    let network = ws.open()?;

    if network.is_empty() {
        eprintln!("Warning: Network is empty. Use 'aquanet house add' or 'aquanet import' first.");
    }

    let snapshot = network.to_snapshot();
    match output {
        Some(path) => {
            snapshot.write(&path)?;
            info!("Exported {} nodes", network.node_count());
            println!("Exported to {}", path.display());
        }
        None => {
            let content = serde_json::to_string_pretty(&snapshot).context("Failed to serialize network")?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }

    Ok(())
}
