// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Diagnose command - report structural problems

use super::Workspace;
use anyhow::Result;
use tracing::info;

/// Run every structural check
pub fn run(ws: &Workspace) -> Result<()> {
    let network = ws.open()?;
    let report = network.diagnose();
    info!("Diagnostics produced {} findings", report.findings.len());

    ws.print_report(&report, "No problems found.")
}
