// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Command implementations

pub mod advise;
pub mod completions;
pub mod config;
pub mod diagnose;
pub mod export;
pub mod flow;
pub mod house;
pub mod import;
pub mod max_flow;
pub mod pipe;
pub mod route;
pub mod supply;
pub mod tank;

use crate::config::Config;
use crate::findings::{Finding, Report, Severity};
use crate::network::Network;
use crate::types::PressureBand;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

/// Settings every command runs with
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Snapshot file holding the network
    pub data_file: PathBuf,
    /// Print machine-readable JSON instead of text
    pub json: bool,
    /// Use ANSI colors in text output
    pub color: bool,
    /// Pressure band for connection advice
    pub band: PressureBand,
}

impl Workspace {
    /// Combine configuration with command-line overrides
    #[must_use]
    pub fn new(config: &Config, data_file: Option<PathBuf>, json: bool, no_color: bool) -> Self {
        Self {
            data_file: data_file.unwrap_or_else(|| config.data_file.clone()),
            json,
            color: !no_color,
            band: config.pressure_band(),
        }
    }

    /// Load the network from the data file
    pub fn open(&self) -> Result<Network> {
        let (network, report) = Network::load_snapshot(&self.data_file)
            .with_context(|| format!("Failed to open network at {}", self.data_file.display()))?;
        for finding in &report.findings {
            debug!("While loading: {}", finding);
        }
        Ok(network)
    }

    /// Save the network and print what the mutation produced
    pub fn commit(&self, network: &Network, summary: &str, report: &Report) -> Result<()> {
        network.save_snapshot(&self.data_file)?;

        if self.json {
            return self.print_json(&serde_json::json!({
                "result": summary,
                "findings": report.findings,
            }));
        }

        if self.color {
            println!("{} {}", "✓".green(), summary);
        } else {
            println!("{summary}");
        }
        self.print_findings(report);
        Ok(())
    }

    /// Print findings one per line, marked by severity
    pub fn print_findings(&self, report: &Report) {
        for finding in &report.findings {
            println!("  {}", self.paint(finding));
        }
    }

    /// Print a report, or a placeholder line when it is empty
    pub fn print_report(&self, report: &Report, empty: &str) -> Result<()> {
        if self.json {
            return self.print_json(report);
        }
        if report.is_empty() {
            println!("{empty}");
        } else {
            self.print_findings(report);
        }
        Ok(())
    }

    /// Pretty-print any value as JSON
    pub fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
        println!("{json}");
        Ok(())
    }

    fn paint(&self, finding: &Finding) -> String {
        let (marker, text) = match finding.severity() {
            Severity::Warning => ("warning:", finding.to_string()),
            Severity::Info => ("note:", finding.to_string()),
        };
        if !self.color {
            return format!("{marker} {text}");
        }
        match finding.severity() {
            Severity::Warning => format!("{} {}", marker.yellow().bold(), text),
            Severity::Info => format!("{} {}", marker.cyan(), text),
        }
    }

    pub(crate) fn good(&self, text: &str) -> String {
        if self.color {
            text.green().to_string()
        } else {
            text.to_string()
        }
    }

    pub(crate) fn bad(&self, text: &str) -> String {
        if self.color {
            text.red().to_string()
        } else {
            text.to_string()
        }
    }

    /// `yes` in green when `ok`, otherwise `no` in red
    pub(crate) fn status(&self, ok: bool, yes: &str, no: &str) -> String {
        if ok {
            self.good(yes)
        } else {
            self.bad(no)
        }
    }
}

/// Require an optional positional argument
pub(crate) fn required<T>(value: Option<T>, what: &str) -> Result<T> {
    value.ok_or_else(|| anyhow::anyhow!("<{}> is required", what))
}
