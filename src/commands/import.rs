// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Import command - replace the network with a snapshot file

use super::Workspace;
use crate::network::Network;
use crate::snapshot::Snapshot;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Load `file`, validate it by building the network, then make it current
pub fn run(ws: &Workspace, file: &Path) -> Result<()> {
    let snapshot = Snapshot::read(file)?;
    let (network, report) = Network::from_snapshot(&snapshot)
        .with_context(|| format!("Failed to import {}", file.display()))?;
    info!("Imported {} into {}", file.display(), ws.data_file.display());

    ws.commit(
        &network,
        &format!(
            "Imported {} houses, {} tanks and {} pipes from {}",
            network.houses().len(),
            network.tanks().len(),
            network.pipe_count(),
            file.display()
        ),
        &report,
    )
}
