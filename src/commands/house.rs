// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! House commands - add, remove and list consumers

use super::{required, Workspace};
use anyhow::Result;

/// Run house command
pub fn run(ws: &Workspace, action: &str, name: Option<String>, demand: Option<f64>) -> Result<()> {
    let mut network = ws.open()?;

    match action {
        "add" | "create" => {
            let name = required(name, "name")?;
            let demand = required(demand, "demand")?;

            let report = network.add_house(&name, demand)?;
            ws.commit(&network, &format!("Added house {name} ({demand} L/s)"), &report)?;
        }

        "remove" | "delete" | "rm" => {
            let name = required(name, "name")?;

            let report = network.remove_house(&name)?;
            ws.commit(&network, &format!("Removed house {name}"), &report)?;
        }

        "list" | "ls" => {
            let houses = network.houses();
            if ws.json {
                let rows: Vec<_> = houses
                    .iter()
                    .map(|(name, house)| serde_json::json!({ "name": name, "demand": house.demand }))
                    .collect();
                return ws.print_json(&rows);
            }
            if houses.is_empty() {
                println!("No houses defined. Use 'aquanet house add' to create one.");
                return Ok(());
            }

            println!("Houses ({}):", houses.len());
            for (name, house) in houses {
                let upstream = network.predecessors(name)?.join(", ");
                println!("  {name}: {} L/s <- [{upstream}]", house.demand);
            }
        }

        other => {
            anyhow::bail!("Unknown action: {}. Valid: add, remove, list", other);
        }
    }

    Ok(())
}
