// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Supply command - check whether houses receive their demand

use super::Workspace;
use crate::flow::SupplyState;
use anyhow::Result;

/// Run supply command for one house or the whole network
pub fn run(ws: &Workspace, house: Option<String>) -> Result<()> {
    let network = ws.open()?;

    if let Some(house) = house {
        let supplied = network.verify_house_supply(&house)?;
        if ws.json {
            return ws.print_json(&serde_json::json!({ "house": house, "supplied": supplied }));
        }
        println!("{house}: {}", ws.status(supplied, "supplied", "under-supplied"));
        return Ok(());
    }

    let statuses = network.verify_network_supply();
    if ws.json {
        return ws.print_json(&statuses);
    }
    if statuses.is_empty() {
        println!("No houses defined.");
        return Ok(());
    }

    let short = statuses.iter().filter(|s| s.state != SupplyState::Satisfied).count();
    println!("Supply ({} houses, {} short):", statuses.len(), short);
    for status in &statuses {
        let label = match status.state {
            SupplyState::Satisfied => ws.good("satisfied"),
            SupplyState::Insufficient => ws.bad("insufficient"),
            SupplyState::Disconnected => ws.bad("disconnected"),
        };
        println!(
            "  {}: {}/{} L/s capacity, {} L/s delivered, {label}",
            status.house, status.received, status.demand, status.allocated
        );
    }
    Ok(())
}
