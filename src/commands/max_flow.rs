// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Maximum flow between two nodes

use super::Workspace;
use anyhow::Result;

/// Compute the maximum flow between two nodes
pub fn run(ws: &Workspace, source: &str, sink: &str) -> Result<()> {
    let network = ws.open()?;
    let result = network.compute_max_flow(source, sink)?;

    if ws.json {
        return ws.print_json(&result);
    }

    println!("Max flow {source} -> {sink}: {} L/s", result.value);
    for path in &result.augmenting_paths {
        println!("  {} ({} L/s)", path.path.join(" -> "), path.flow);
    }
    Ok(())
}
