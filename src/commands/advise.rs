// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Advise command - suggest new tanks and tank links

use super::Workspace;
use anyhow::Result;

/// Print infrastructure suggestions
pub fn run(ws: &Workspace) -> Result<()> {
    let network = ws.open()?;
    let report = network.advise(ws.band);

    ws.print_report(&report, "Nothing to suggest.")
}
