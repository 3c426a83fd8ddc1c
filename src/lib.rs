// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Aquanet library - water distribution networks as typed graphs
//!
//! This crate models tanks, houses and directed pipes, keeps tank levels and
//! flow allocations consistent across every mutation, and answers supply,
//! rerouting, max-flow and topology questions about the network.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod commands;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod findings;
pub mod flow;
pub mod maxflow;
pub mod network;
pub mod route;
pub mod snapshot;

/// Core value types stored in the network graph
pub mod types {
    use crate::error::{NetworkError, NetworkResult};
    use serde::{Deserialize, Serialize};

    // =========================================================================
    // Obstruction
    // =========================================================================

    /// Percentage reduction applied to a pipe's capacity.
    ///
    /// `-1` blocks the pipe completely, `0` leaves it clear and `1..=100`
    /// removes that share of the base capacity.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(try_from = "i32", into = "i32")]
    pub struct Obstruction(i32);

    impl Obstruction {
        /// Unobstructed pipe
        pub const NONE: Self = Self(0);
        /// Fully blocked pipe
        pub const BLOCKED: Self = Self(-1);

        /// Validate an obstruction percentage
        pub fn new(percent: i32) -> NetworkResult<Self> {
            if percent == -1 || (0..=100).contains(&percent) {
                Ok(Self(percent))
            } else {
                Err(NetworkError::Validation {
                    what: "obstruction",
                    reason: format!("{percent} is outside -1 or 0..=100"),
                })
            }
        }

        /// Raw percentage (`-1` when blocked)
        #[must_use]
        pub fn percent(self) -> i32 {
            self.0
        }

        /// Is the pipe fully blocked?
        #[must_use]
        pub fn is_blocked(self) -> bool {
            self.0 == -1
        }

        /// Share of the base capacity that still flows
        #[must_use]
        pub fn factor(self) -> f64 {
            if self.is_blocked() {
                0.0
            } else {
                1.0 - f64::from(self.0) / 100.0
            }
        }

        /// Effective capacity of a pipe with this obstruction
        #[must_use]
        pub fn apply(self, base_capacity: f64) -> f64 {
            base_capacity * self.factor()
        }
    }

    impl TryFrom<i32> for Obstruction {
        type Error = NetworkError;

        fn try_from(percent: i32) -> NetworkResult<Self> {
            Self::new(percent)
        }
    }

    impl From<Obstruction> for i32 {
        fn from(obstruction: Obstruction) -> Self {
            obstruction.0
        }
    }

    // =========================================================================
    // Nodes
    // =========================================================================

    /// A consumer with a fixed demand (L/s)
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct House {
        /// Flow the house needs to be considered supplied
        pub demand: f64,
    }

    /// A storage tank
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Tank {
        /// Maximum volume (L)
        pub capacity: f64,
        /// Current volume, always within `0..=capacity`
        pub level: f64,
    }

    impl Tank {
        /// A full tank
        #[must_use]
        pub fn full(capacity: f64) -> Self {
            Self { capacity, level: capacity }
        }

        /// Unused volume (`capacity - level`)
        #[must_use]
        pub fn available(&self) -> f64 {
            self.capacity - self.level
        }

        /// Level as a fraction of capacity (zero for an empty-capacity tank)
        #[must_use]
        pub fn fill_fraction(&self) -> f64 {
            if self.capacity > 0.0 {
                self.level / self.capacity
            } else {
                0.0
            }
        }

        /// Set the level, clamped into `0..=capacity`
        pub fn set_level(&mut self, level: f64) {
            self.level = level.clamp(0.0, self.capacity);
        }
    }

    /// Node variant
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "type", rename_all = "lowercase")]
    pub enum NodeKind {
        /// Consumer
        House(House),
        /// Storage
        Tank(Tank),
    }

    /// Named node in the network
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Node {
        /// Unique name
        pub name: String,
        /// House or tank attributes
        #[serde(flatten)]
        pub kind: NodeKind,
    }

    impl Node {
        /// Create a house node
        #[must_use]
        pub fn house(name: impl Into<String>, demand: f64) -> Self {
            Self { name: name.into(), kind: NodeKind::House(House { demand }) }
        }

        /// Create a full tank node
        #[must_use]
        pub fn tank(name: impl Into<String>, capacity: f64) -> Self {
            Self { name: name.into(), kind: NodeKind::Tank(Tank::full(capacity)) }
        }

        /// House attributes, if this is a house
        #[must_use]
        pub fn as_house(&self) -> Option<&House> {
            match &self.kind {
                NodeKind::House(house) => Some(house),
                NodeKind::Tank(_) => None,
            }
        }

        /// Tank attributes, if this is a tank
        #[must_use]
        pub fn as_tank(&self) -> Option<&Tank> {
            match &self.kind {
                NodeKind::Tank(tank) => Some(tank),
                NodeKind::House(_) => None,
            }
        }

        /// Mutable tank attributes, if this is a tank
        pub fn as_tank_mut(&mut self) -> Option<&mut Tank> {
            match &mut self.kind {
                NodeKind::Tank(tank) => Some(tank),
                NodeKind::House(_) => None,
            }
        }

        /// Is this a house?
        #[must_use]
        pub fn is_house(&self) -> bool {
            matches!(self.kind, NodeKind::House(_))
        }

        /// Is this a tank?
        #[must_use]
        pub fn is_tank(&self) -> bool {
            matches!(self.kind, NodeKind::Tank(_))
        }

        /// "house" or "tank"
        #[must_use]
        pub fn kind_label(&self) -> &'static str {
            match self.kind {
                NodeKind::House(_) => "house",
                NodeKind::Tank(_) => "tank",
            }
        }
    }

    // =========================================================================
    // Pipes
    // =========================================================================

    /// Directed pipe between two nodes
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Pipe {
        /// Capacity before any obstruction (L/s)
        pub base_capacity: f64,
        /// Current obstruction
        pub obstruction: Obstruction,
        /// Effective capacity, derived from base capacity and obstruction
        pub flow_capacity: f64,
    }

    impl Pipe {
        /// An unobstructed pipe
        #[must_use]
        pub fn new(base_capacity: f64) -> Self {
            Self {
                base_capacity,
                obstruction: Obstruction::NONE,
                flow_capacity: base_capacity,
            }
        }

        /// Apply an obstruction, returning the previous effective capacity
        pub fn obstruct(&mut self, obstruction: Obstruction) -> f64 {
            let previous = self.flow_capacity;
            self.obstruction = obstruction;
            self.flow_capacity = obstruction.apply(self.base_capacity);
            previous
        }

        /// Can water move through this pipe at all?
        #[must_use]
        pub fn is_open(&self) -> bool {
            !self.obstruction.is_blocked() && self.flow_capacity > 0.0
        }
    }

    // =========================================================================
    // Pressure heuristic
    // =========================================================================

    /// Fill band in which a tank's pressure is considered adequate
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct PressureBand {
        /// Lowest acceptable fill fraction
        pub low: f64,
        /// Highest acceptable fill fraction
        pub high: f64,
    }

    impl Default for PressureBand {
        fn default() -> Self {
            Self { low: 0.1, high: 0.9 }
        }
    }

    impl PressureBand {
        /// Does the tank sit inside the band?
        #[must_use]
        pub fn admits(&self, tank: &Tank) -> bool {
            tank.level >= tank.capacity * self.low && tank.level <= tank.capacity * self.high
        }
    }
}

/// Prelude for common imports
pub mod prelude {
    pub use crate::error::{ErrorKind, NetworkError, NetworkResult};
    pub use crate::findings::{Finding, Report, Severity};
    pub use crate::network::Network;
    pub use crate::types::*;
    pub use anyhow::{Context, Result};
}
