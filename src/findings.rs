// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Advisory findings returned by mutations and diagnostics

use serde::{Deserialize, Serialize};
use std::fmt;

/// How much attention a finding deserves
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Bookkeeping note
    Info,
    /// Something the operator should look at
    Warning,
}

/// One observation about the network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "finding", rename_all = "snake_case")]
pub enum Finding {
    /// A house receives less than it needs
    InsufficientSupply {
        /// House name
        house: String,
        /// Flow reaching the house
        received: f64,
        /// Flow the house needs
        demand: f64,
    },
    /// Surplus flow moved from one node to the next
    SurplusForwarded {
        /// Upstream node
        from: String,
        /// Downstream node
        to: String,
        /// Flow moved
        amount: f64,
    },
    /// Flow credited back to (or drawn from) a tank
    FlowReturned {
        /// Tank name
        tank: String,
        /// Credited amount, negative when drawn out
        amount: f64,
        /// Level after the credit
        level: f64,
    },
    /// A tank connection names a node that does not exist
    MissingConnection {
        /// Tank name
        tank: String,
        /// Missing target
        target: String,
    },
    /// Surplus forwarding reached a node it had already passed
    ForwardingCycle {
        /// Node forwarding the surplus
        from: String,
        /// Already visited node
        to: String,
    },
    /// Flow propagation stopped at its step budget
    PropagationTruncated {
        /// Steps taken
        steps: usize,
    },
    /// Pipes exist in both directions between two nodes
    DuplicateConnection {
        /// First node (lexicographically smaller)
        a: String,
        /// Second node
        b: String,
    },
    /// A directed cycle
    Cycle {
        /// Nodes in flow order, smallest name first
        nodes: Vec<String>,
    },
    /// A pipe or connection references an undefined node
    DanglingReference {
        /// Upstream name
        from: String,
        /// Downstream name
        to: String,
    },
    /// Candidate site for a new tank
    TankSuggestion {
        /// Proposed site
        site: String,
        /// Houses it would serve
        houses: Vec<String>,
    },
    /// Candidate link between two tanks
    ConnectionSuggestion {
        /// Origin tank
        from: String,
        /// Destination tank
        to: String,
    },
}

impl Finding {
    /// Severity of this finding
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::SurplusForwarded { .. }
            | Self::FlowReturned { .. }
            | Self::TankSuggestion { .. }
            | Self::ConnectionSuggestion { .. } => Severity::Info,
            _ => Severity::Warning,
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientSupply { house, received, demand } => write!(
                f,
                "house {house} is under-supplied ({received}/{demand} L/s); consider connecting a tank to {house}"
            ),
            Self::SurplusForwarded { from, to, amount } => {
                write!(f, "forwarded {amount} L/s of surplus from {from} to {to}")
            }
            Self::FlowReturned { tank, amount, level } => {
                write!(f, "tank {tank} received {amount} L back, level now {level} L")
            }
            Self::MissingConnection { tank, target } => {
                write!(f, "tank {tank} connection skipped: node {target} does not exist")
            }
            Self::ForwardingCycle { from, to } => {
                write!(f, "surplus forwarding loops back from {from} to {to}")
            }
            Self::PropagationTruncated { steps } => {
                write!(f, "flow propagation stopped after {steps} steps")
            }
            Self::DuplicateConnection { a, b } => {
                write!(f, "duplicate connection between {a} and {b}")
            }
            Self::Cycle { nodes } => write!(f, "flow loop: {}", nodes.join(" -> ")),
            Self::DanglingReference { from, to } => {
                write!(f, "connection between undefined nodes: {from} and {to}")
            }
            Self::TankSuggestion { site, houses } => write!(
                f,
                "install a new tank at {site} to supply: {}",
                houses.join(", ")
            ),
            Self::ConnectionSuggestion { from, to } => {
                write!(f, "connect {from} to {to} to balance load")
            }
        }
    }
}

/// Findings gathered while an operation ran
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Findings in the order they were produced
    pub findings: Vec<Finding>,
}

impl Report {
    /// Empty report
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finding
    pub fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    /// Append another report
    pub fn merge(&mut self, other: Report) {
        self.findings.extend(other.findings);
    }

    /// No findings at all?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// Findings at warning severity
    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity() == Severity::Warning)
    }

    /// Under-supplied houses mentioned in this report
    #[must_use]
    pub fn under_supplied(&self) -> Vec<&str> {
        self.findings
            .iter()
            .filter_map(|f| match f {
                Finding::InsufficientSupply { house, .. } => Some(house.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Extend<Finding> for Report {
    fn extend<I: IntoIterator<Item = Finding>>(&mut self, iter: I) {
        self.findings.extend(iter);
    }
}

impl FromIterator<Finding> for Report {
    fn from_iter<I: IntoIterator<Item = Finding>>(iter: I) -> Self {
        Self { findings: iter.into_iter().collect() }
    }
}
