// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Show the effective configuration

use super::Workspace;
use crate::config::Config;
use anyhow::Result;

/// Show the effective configuration, or a single key of it
pub fn run(ws: &Workspace, config: &Config, key: Option<&str>) -> Result<()> {
    let mut effective = config.clone();
    effective.data_file.clone_from(&ws.data_file);

    match key {
        Some(key) => {
            let value = effective.get(key).ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown key: {}. Valid: data_file, log_level, pressure_low, pressure_high",
                    key
                )
            })?;
            println!("{value}");
        }
        None if ws.json => ws.print_json(&effective)?,
        None => print!("{}", effective.to_toml()?),
    }
    Ok(())
}
