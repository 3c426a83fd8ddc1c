// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Pipe commands - lay, remove, obstruct, reverse and list pipes

use super::{required, Workspace};
use anyhow::{Context, Result};

/// Run pipe command
pub fn run(
    ws: &Workspace,
    action: &str,
    from: Option<String>,
    to: Option<String>,
    value: Option<String>,
) -> Result<()> {
    let mut network = ws.open()?;

    if matches!(action, "list" | "ls") {
        return list(ws, &network);
    }

    let from = required(from, "from")?;
    let to = required(to, "to")?;

    match action {
        "add" | "create" => {
            let capacity: f64 = required(value, "capacity")?
                .parse()
                .context("Pipe capacity must be a number")?;

            let report = network.add_pipe(&from, &to, capacity)?;
            ws.commit(&network, &format!("Added pipe {from} -> {to} ({capacity} L/s)"), &report)?;
        }

        "remove" | "delete" | "rm" => {
            let report = network.remove_pipe(&from, &to)?;
            ws.commit(&network, &format!("Removed pipe {from} -> {to}"), &report)?;
        }

        "obstruct" | "obstruction" => {
            let percent: i32 = required(value, "percent")?
                .parse()
                .context("Obstruction must be -1 or an integer from 0 to 100")?;

            let report = network.set_obstruction(&from, &to, percent)?;
            let capacity = network.pipe(&from, &to).map_or(0.0, |p| p.flow_capacity);
            ws.commit(
                &network,
                &format!("Pipe {from} -> {to} obstructed {percent}%, now {capacity} L/s"),
                &report,
            )?;
        }

        "reverse" | "flip" => {
            let report = network.reverse_edge(&from, &to)?;
            ws.commit(&network, &format!("Reversed pipe, now {to} -> {from}"), &report)?;
        }

        other => {
            anyhow::bail!("Unknown action: {}. Valid: add, remove, obstruct, reverse, list", other);
        }
    }

    Ok(())
}

fn list(ws: &Workspace, network: &crate::network::Network) -> Result<()> {
    let pipes = network.pipes();
    if ws.json {
        let rows: Vec<_> = pipes
            .iter()
            .map(|(from, to, pipe)| {
                serde_json::json!({
                    "from": from,
                    "to": to,
                    "base_capacity": pipe.base_capacity,
                    "flow_capacity": pipe.flow_capacity,
                    "obstruction": pipe.obstruction.percent(),
                    "flow": network.allocation().pipe_flow(from, to),
                })
            })
            .collect();
        return ws.print_json(&rows);
    }
    if pipes.is_empty() {
        println!("No pipes defined. Use 'aquanet pipe add' to lay one.");
        return Ok(());
    }

    println!("Pipes ({}):", pipes.len());
    for (from, to, pipe) in pipes {
        let state = if pipe.obstruction.is_blocked() {
            ws.bad("blocked")
        } else {
            format!("{}% obstructed", pipe.obstruction.percent())
        };
        println!(
            "  {from} -> {to}: {}/{} L/s ({state}), carrying {}",
            pipe.flow_capacity,
            pipe.base_capacity,
            network.allocation().pipe_flow(from, to)
        );
    }
    Ok(())
}
