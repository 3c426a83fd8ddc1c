// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Flow command - show the current propagation result

use super::Workspace;
use anyhow::Result;

/// Print per-node flow bookkeeping
pub fn run(ws: &Workspace) -> Result<()> {
    let network = ws.open()?;
    let allocation = network.allocation();

    if ws.json {
        return ws.print_json(allocation);
    }
    if allocation.nodes.is_empty() {
        println!("Network is empty.");
        return Ok(());
    }

    println!("Flow ({} steps):", allocation.steps);
    for (name, flow) in &allocation.nodes {
        println!(
            "  {name}: received {}, consumed {}, forwarded {}, left {}",
            flow.received, flow.consumed, flow.forwarded, flow.remaining
        );
    }
    if allocation.truncated {
        println!("  {}", ws.bad("propagation stopped at its step budget"));
    }
    Ok(())
}
