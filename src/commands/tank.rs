// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Tank commands - add, remove, list and re-level storage tanks

use super::{required, Workspace};
use crate::findings::Report;
use anyhow::Result;

/// Run tank command
pub fn run(
    ws: &Workspace,
    action: &str,
    name: Option<String>,
    capacity: Option<f64>,
    connect: &[String],
) -> Result<()> {
    let mut network = ws.open()?;

    match action {
        "add" | "create" => {
            let name = required(name, "name")?;
            let capacity = required(capacity, "capacity")?;

            let report = network.add_tank(&name, capacity, connect)?;
            let level = network.tank(&name)?.level;
            ws.commit(
                &network,
                &format!("Added tank {name} ({capacity} L, level {level} L)"),
                &report,
            )?;
        }

        "remove" | "delete" | "rm" => {
            let name = required(name, "name")?;

            let report = network.remove_tank(&name)?;
            ws.commit(&network, &format!("Removed tank {name}"), &report)?;
        }

        "level" | "recompute" => {
            let name = required(name, "name")?;

            let level = network.recompute_tank_level(&name)?;
            ws.commit(&network, &format!("Tank {name} level reset to {level} L"), &Report::new())?;
        }

        "list" | "ls" => {
            let tanks = network.tanks();
            if ws.json {
                let rows: Vec<_> = tanks
                    .iter()
                    .map(|(name, tank)| {
                        serde_json::json!({
                            "name": name,
                            "capacity": tank.capacity,
                            "level": tank.level,
                            "pressure_ok": ws.band.admits(tank),
                        })
                    })
                    .collect();
                return ws.print_json(&rows);
            }
            if tanks.is_empty() {
                println!("No tanks defined. Use 'aquanet tank add' to create one.");
                return Ok(());
            }

            println!("Tanks ({}):", tanks.len());
            for (name, tank) in tanks {
                let pressure = ws.status(ws.band.admits(tank), "pressure ok", "pressure out of band");
                println!(
                    "  {name}: {}/{} L ({:.0}%), {pressure}",
                    tank.level,
                    tank.capacity,
                    tank.fill_fraction() * 100.0
                );
            }
        }

        other => {
            anyhow::bail!("Unknown action: {}. Valid: add, remove, level, list", other);
        }
    }

    Ok(())
}
