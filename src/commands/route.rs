// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Route command - find alternative supply paths

use super::Workspace;
use crate::route::Route;
use anyhow::Result;

/// Find a route for one house, or for every under-served house
pub fn run(ws: &Workspace, house: Option<String>) -> Result<()> {
    let network = ws.open()?;

    let routes = match house {
        Some(house) => {
            let route = network.find_alternative_route(&house)?;
            vec![(house, route)]
        }
        None => network.alternative_routes(),
    };

    if ws.json {
        let rows: Vec<_> = routes
            .iter()
            .map(|(house, route)| serde_json::json!({ "house": house, "route": route }))
            .collect();
        return ws.print_json(&rows);
    }
    if routes.is_empty() {
        println!("Every house is supplied.");
        return Ok(());
    }

    for (house, route) in &routes {
        print_route(ws, house, route.as_ref());
    }
    Ok(())
}

fn print_route(ws: &Workspace, house: &str, route: Option<&Route>) {
    match route {
        Some(route) => println!("{house}: {} ({} L/s)", route.path.join(" -> "), route.flow),
        None => println!("{house}: {}", ws.bad("no tank can cover the demand")),
    }
}
