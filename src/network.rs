// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Network model and capacity bookkeeping
//!
//! Nodes and pipes live in a stable petgraph so indices survive removals.
//! Every public mutation validates first, applies the change, re-derives the
//! affected tank levels and ends with a full flow propagation, so callers
//! never observe a half-updated network.

use crate::error::{check_quantity, NetworkError, NetworkResult};
use crate::findings::{Finding, Report};
use crate::flow::{self, FlowAllocation, FLOW_EPSILON};
use crate::types::{House, Node, Obstruction, Pipe, Tank};
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// What is known about a reference to an undefined node
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Unresolved {
    /// Listed among a tank's connections
    Connection,
    /// A pipe waiting for its endpoints
    Pipe { capacity: f64, obstruction: i32 },
}

/// The water network
#[derive(Debug, Clone, Default)]
pub struct Network {
    /// Nodes and pipes
    pub(crate) graph: StableDiGraph<Node, Pipe>,
    /// Map from node name to graph index
    pub(crate) indices: HashMap<String, NodeIndex>,
    /// References to undefined nodes seen while building the network
    pub(crate) dangling: BTreeMap<(String, String), Unresolved>,
    /// Result of the last flow propagation
    allocation: FlowAllocation,
}

impl Network {
    /// Create an empty network
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub(crate) fn index_of(&self, name: &str) -> NetworkResult<NodeIndex> {
        self.indices
            .get(name)
            .copied()
            .ok_or_else(|| NetworkError::NodeNotFound(name.to_string()))
    }

    pub(crate) fn name_of(&self, idx: NodeIndex) -> &str {
        &self.graph[idx].name
    }

    pub(crate) fn edge_of(&self, from: &str, to: &str) -> NetworkResult<EdgeIndex> {
        self.indices
            .get(from)
            .zip(self.indices.get(to))
            .and_then(|(&a, &b)| self.graph.find_edge(a, b))
            .ok_or_else(|| NetworkError::PipeNotFound { from: from.to_string(), to: to.to_string() })
    }

    /// Edges around `idx` in one direction, paired with the node at the other
    /// end and ordered by that node's name
    pub(crate) fn neighbours(&self, idx: NodeIndex, dir: Direction) -> Vec<(EdgeIndex, NodeIndex)> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(idx, dir)
            .map(|e| {
                let other = if e.source() == idx { e.target() } else { e.source() };
                (e.id(), other)
            })
            .collect();
        edges.sort_by(|a, b| self.name_of(a.1).cmp(self.name_of(b.1)));
        edges
    }

    /// Get a node by name
    #[must_use]
    pub fn node(&self, name: &str) -> Option<&Node> {
        self.indices.get(name).map(|&idx| &self.graph[idx])
    }

    /// Is there a node with this name?
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.indices.contains_key(name)
    }

    /// Get a house by name
    pub fn house(&self, name: &str) -> NetworkResult<&House> {
        self.node(name)
            .and_then(Node::as_house)
            .ok_or_else(|| NetworkError::NodeNotFound(format!("house {name}")))
    }

    /// Get a tank by name
    pub fn tank(&self, name: &str) -> NetworkResult<&Tank> {
        self.node(name)
            .and_then(Node::as_tank)
            .ok_or_else(|| NetworkError::NodeNotFound(format!("tank {name}")))
    }

    /// Get the pipe running `from -> to`
    #[must_use]
    pub fn pipe(&self, from: &str, to: &str) -> Option<&Pipe> {
        self.edge_of(from, to).ok().map(|edge| &self.graph[edge])
    }

    /// All node names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.indices.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// All houses, sorted by name
    #[must_use]
    pub fn houses(&self) -> Vec<(&str, &House)> {
        self.names()
            .into_iter()
            .filter_map(|name| self.node(name).and_then(Node::as_house).map(|h| (name, h)))
            .collect()
    }

    /// All tanks, sorted by name
    #[must_use]
    pub fn tanks(&self) -> Vec<(&str, &Tank)> {
        self.names()
            .into_iter()
            .filter_map(|name| self.node(name).and_then(Node::as_tank).map(|t| (name, t)))
            .collect()
    }

    /// All pipes as `(from, to, pipe)`, sorted by endpoints
    #[must_use]
    pub fn pipes(&self) -> Vec<(&str, &str, &Pipe)> {
        let mut pipes: Vec<_> = self
            .graph
            .edge_references()
            .map(|e| (self.name_of(e.source()), self.name_of(e.target()), e.weight()))
            .collect();
        pipes.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        pipes
    }

    /// Downstream neighbours of a node, sorted
    pub fn successors(&self, name: &str) -> NetworkResult<Vec<&str>> {
        let idx = self.index_of(name)?;
        Ok(self
            .neighbours(idx, Direction::Outgoing)
            .into_iter()
            .map(|(_, n)| self.name_of(n))
            .collect())
    }

    /// Upstream neighbours of a node, sorted
    pub fn predecessors(&self, name: &str) -> NetworkResult<Vec<&str>> {
        let idx = self.index_of(name)?;
        Ok(self
            .neighbours(idx, Direction::Incoming)
            .into_iter()
            .map(|(_, n)| self.name_of(n))
            .collect())
    }

    /// Number of nodes
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of pipes
    #[must_use]
    pub fn pipe_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Check if the network has no nodes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Flow allocation from the last propagation
    #[must_use]
    pub fn allocation(&self) -> &FlowAllocation {
        &self.allocation
    }

    // =========================================================================
    // Node mutations
    // =========================================================================

    fn ensure_vacant(&self, name: &str) -> NetworkResult<()> {
        if name.trim().is_empty() {
            return Err(NetworkError::Validation {
                what: "name",
                reason: "node names cannot be empty".into(),
            });
        }
        if self.contains(name) {
            return Err(NetworkError::Conflict(format!("node {name}")));
        }
        Ok(())
    }

    fn insert_node(&mut self, node: Node) -> NodeIndex {
        let name = node.name.clone();
        let idx = self.graph.add_node(node);
        self.indices.insert(name, idx);
        // A reference is no longer dangling once both of its ends exist
        self.dangling
            .retain(|(from, to), _| !(self.indices.contains_key(from) && self.indices.contains_key(to)));
        idx
    }

    /// Add a house with the given demand
    pub fn add_house(&mut self, name: &str, demand: f64) -> NetworkResult<Report> {
        check_quantity("demand", demand)?;
        self.ensure_vacant(name)?;

        self.insert_node(Node::house(name, demand));
        info!("Added house {} (demand {} L/s)", name, demand);

        let mut report = Report::new();
        self.propagate(&mut report);
        Ok(report)
    }

    /// Add a full tank, connecting it to existing nodes with zero-capacity
    /// pipes. Unknown connection targets are reported and skipped.
    pub fn add_tank<S: AsRef<str>>(
        &mut self,
        name: &str,
        capacity: f64,
        connections: &[S],
    ) -> NetworkResult<Report> {
        check_quantity("capacity", capacity)?;
        self.ensure_vacant(name)?;
        if connections.iter().any(|c| c.as_ref() == name) {
            return Err(NetworkError::Validation {
                what: "connection",
                reason: format!("tank {name} cannot connect to itself"),
            });
        }

        let idx = self.insert_node(Node::tank(name, capacity));
        let mut report = Report::new();

        for target in connections {
            let target = target.as_ref();
            if let Some(&to) = self.indices.get(target) {
                self.connect(idx, to, 0.0, &mut report);
            } else {
                warn!("Tank {} connection skipped: {} does not exist", name, target);
                self.dangling
                    .insert((name.to_string(), target.to_string()), Unresolved::Connection);
                report.push(Finding::MissingConnection {
                    tank: name.to_string(),
                    target: target.to_string(),
                });
            }
        }

        info!("Added tank {} (capacity {} L)", name, capacity);
        self.propagate(&mut report);
        Ok(report)
    }

    /// Remove a house and its pipes
    pub fn remove_house(&mut self, name: &str) -> NetworkResult<Report> {
        self.house(name)?;
        self.remove_node(name)
    }

    /// Remove a tank and its pipes
    pub fn remove_tank(&mut self, name: &str) -> NetworkResult<Report> {
        self.tank(name)?;
        self.remove_node(name)
    }

    /// Remove any node and its pipes, then re-derive every tank level
    pub fn remove_node(&mut self, name: &str) -> NetworkResult<Report> {
        let idx = self.index_of(name)?;
        self.graph.remove_node(idx);
        self.indices.remove(name);
        self.dangling.retain(|(from, _), _| from != name);
        info!("Removed node {}", name);

        Ok(self.settle())
    }

    // =========================================================================
    // Pipe mutations
    // =========================================================================

    /// Add (or replace) the pipe `from -> to`
    pub fn add_pipe(&mut self, from: &str, to: &str, capacity: f64) -> NetworkResult<Report> {
        check_quantity("pipe capacity", capacity)?;
        if from == to {
            return Err(NetworkError::Validation {
                what: "pipe",
                reason: format!("{from} cannot feed itself"),
            });
        }
        let a = self.index_of(from)?;
        let b = self.index_of(to)?;

        let mut report = Report::new();
        self.connect(a, b, capacity, &mut report);
        info!("Added pipe {} -> {} ({} L/s)", from, to, capacity);

        self.propagate(&mut report);
        Ok(report)
    }

    /// Lay a pipe and apply its immediate effects on both ends
    fn connect(&mut self, from: NodeIndex, to: NodeIndex, capacity: f64, report: &mut Report) {
        if self.graph.find_edge(from, to).is_some() {
            debug!("Replacing pipe {} -> {}", self.name_of(from), self.name_of(to));
        }
        self.graph.update_edge(from, to, Pipe::new(capacity));

        if self.graph[from].is_tank() {
            self.recompute_level(from);
        }

        if self.graph[to].is_house() {
            self.forward_surplus(to, report);
        } else {
            self.credit_returning_flow(to, capacity, report);
        }
    }

    /// Flow entering a tank after the houses feeding it took their share
    fn credit_returning_flow(&mut self, tank: NodeIndex, capacity: f64, report: &mut Report) {
        let mut returning = capacity;
        for (_, upstream) in self.neighbours(tank, Direction::Incoming) {
            if let Some(house) = self.graph[upstream].as_house() {
                returning -= house.demand.min(returning);
            }
        }
        if returning > FLOW_EPSILON {
            self.credit_tank(tank, returning, report);
        }
    }

    /// Remove the pipe `from -> to`, then re-derive every tank level
    pub fn remove_pipe(&mut self, from: &str, to: &str) -> NetworkResult<Report> {
        let edge = self.edge_of(from, to)?;
        self.graph.remove_edge(edge);
        info!("Removed pipe {} -> {}", from, to);

        Ok(self.settle())
    }

    /// Apply an obstruction percentage (`-1` blocks the pipe). Flow the
    /// pipe no longer carries goes back to an upstream tank.
    pub fn set_obstruction(&mut self, from: &str, to: &str, percent: i32) -> NetworkResult<Report> {
        let obstruction = Obstruction::new(percent)?;
        let edge = self.edge_of(from, to)?;
        let source = self.index_of(from)?;

        let pipe = &mut self.graph[edge];
        let previous = pipe.obstruct(obstruction);
        let freed = previous - pipe.flow_capacity;
        info!(
            "Pipe {} -> {} obstructed {}%, capacity now {} L/s",
            from, to, percent, pipe.flow_capacity
        );

        let mut report = Report::new();
        if freed.abs() > FLOW_EPSILON && self.graph[source].is_tank() {
            self.credit_tank(source, freed, &mut report);
        }

        self.propagate(&mut report);
        Ok(report)
    }

    /// Swap a pipe's direction, keeping its capacity and obstruction
    pub fn reverse_edge(&mut self, from: &str, to: &str) -> NetworkResult<Report> {
        let edge = self.edge_of(from, to)?;
        let a = self.index_of(from)?;
        let b = self.index_of(to)?;
        if self.graph.find_edge(b, a).is_some() {
            return Err(NetworkError::Conflict(format!("pipe {to} -> {from}")));
        }

        let pipe = self
            .graph
            .remove_edge(edge)
            .ok_or_else(|| NetworkError::PipeNotFound { from: from.to_string(), to: to.to_string() })?;
        self.graph.add_edge(b, a, pipe);
        info!("Reversed pipe {} -> {}, now {} -> {}", from, to, to, from);

        for idx in [a, b] {
            if self.graph[idx].is_tank() {
                self.recompute_level(idx);
            }
        }

        let mut report = Report::new();
        self.propagate(&mut report);
        Ok(report)
    }

    // =========================================================================
    // Tank levels
    // =========================================================================

    /// Reset a tank's level to its capacity minus committed outgoing flow
    pub fn recompute_tank_level(&mut self, name: &str) -> NetworkResult<f64> {
        self.tank(name)?;
        let idx = self.index_of(name)?;
        Ok(self.recompute_level(idx))
    }

    pub(crate) fn recompute_level(&mut self, idx: NodeIndex) -> f64 {
        let committed: f64 = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| e.weight().flow_capacity)
            .sum();

        let node = &mut self.graph[idx];
        let Some(tank) = node.as_tank_mut() else {
            return 0.0;
        };
        tank.set_level(tank.capacity - committed);
        let level = tank.level;
        debug!("Tank {} level recomputed to {} L", node.name, level);
        level
    }

    fn recompute_all_levels(&mut self) {
        let tanks: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|&idx| self.graph[idx].is_tank())
            .collect();
        for idx in tanks {
            self.recompute_level(idx);
        }
    }

    /// Add (or with a negative amount, draw) flow to a tank, clamped into
    /// `0..=capacity`
    pub(crate) fn credit_tank(&mut self, idx: NodeIndex, amount: f64, report: &mut Report) {
        let node = &mut self.graph[idx];
        let Some(tank) = node.as_tank_mut() else {
            return;
        };
        tank.set_level(tank.level + amount);
        let level = tank.level;
        debug!("Tank {} credited {} L, level {} L", node.name, amount, level);
        report.push(Finding::FlowReturned { tank: node.name.clone(), amount, level });
    }

    /// Overwrite a tank level, clamped into `0..=capacity`
    pub(crate) fn restore_level(&mut self, idx: NodeIndex, level: f64) {
        if let Some(tank) = self.graph[idx].as_tank_mut() {
            tank.set_level(level);
        }
    }

    // =========================================================================
    // Consistency passes
    // =========================================================================

    /// Re-run flow propagation over the whole network
    pub(crate) fn propagate(&mut self, report: &mut Report) {
        let allocation = flow::propagate(self);
        if allocation.truncated {
            warn!("Flow propagation truncated after {} steps", allocation.steps);
            report.push(Finding::PropagationTruncated { steps: allocation.steps });
        }
        self.allocation = allocation;
    }

    /// Full re-derivation after a structural removal
    fn settle(&mut self) -> Report {
        self.recompute_all_levels();
        let mut report = Report::new();
        self.propagate(&mut report);
        report.extend(self.supply_shortfalls());
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn tank_with_house() -> Network {
        let mut net = Network::new();
        net.add_tank("T", 100.0, &[] as &[&str]).unwrap();
        net.add_house("H1", 40.0).unwrap();
        net.add_pipe("T", "H1", 40.0).unwrap();
        net
    }

    #[test]
    fn test_add_house() {
        let mut net = Network::new();
        net.add_house("H1", 10.0).unwrap();

        assert_eq!(net.node_count(), 1);
        assert_eq!(net.house("H1").unwrap().demand, 10.0);
    }

    #[test]
    fn test_duplicate_add_conflicts() {
        let mut net = Network::new();
        net.add_house("H1", 10.0).unwrap();

        let err = net.add_tank("H1", 10.0, &[] as &[&str]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(net.node_count(), 1);
    }

    #[test]
    fn test_negative_demand_rejected() {
        let mut net = Network::new();
        let err = net.add_house("H1", -5.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(net.is_empty());
    }

    #[test]
    fn test_add_pipe_missing_endpoint() {
        let mut net = Network::new();
        net.add_house("H1", 10.0).unwrap();

        let err = net.add_pipe("T", "H1", 5.0).unwrap_err();
        assert_eq!(err, NetworkError::NodeNotFound("T".into()));
        assert_eq!(net.pipe_count(), 0);
    }

    #[test]
    fn test_tank_level_tracks_outgoing_pipes() {
        let net = tank_with_house();
        assert_eq!(net.tank("T").unwrap().level, 60.0);
    }

    #[test]
    fn test_add_pipe_replaces_existing() {
        let mut net = tank_with_house();
        net.add_pipe("T", "H1", 25.0).unwrap();

        assert_eq!(net.pipe_count(), 1);
        assert_eq!(net.pipe("T", "H1").unwrap().flow_capacity, 25.0);
        assert_eq!(net.tank("T").unwrap().level, 75.0);
    }

    #[test]
    fn test_add_tank_with_connections() {
        let mut net = Network::new();
        net.add_house("H1", 10.0).unwrap();
        let report = net.add_tank("T", 50.0, &["H1", "ghost"]).unwrap();

        assert_eq!(net.pipe("T", "H1").unwrap().flow_capacity, 0.0);
        assert_eq!(net.tank("T").unwrap().level, 50.0);
        assert!(report.findings.contains(&Finding::MissingConnection {
            tank: "T".into(),
            target: "ghost".into(),
        }));
        assert_eq!(
            net.dangling.get(&("T".to_string(), "ghost".to_string())),
            Some(&Unresolved::Connection)
        );
    }

    #[test]
    fn test_self_connection_rejected() {
        let mut net = Network::new();
        let err = net.add_tank("T", 50.0, &["T"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!net.contains("T"));
    }

    #[test]
    fn test_pipe_into_tank_credits_returning_flow() {
        let mut net = Network::new();
        net.add_tank("T1", 100.0, &[] as &[&str]).unwrap();
        net.add_tank("T2", 100.0, &[] as &[&str]).unwrap();
        net.add_house("H", 10.0).unwrap();
        net.add_pipe("T1", "H", 30.0).unwrap();
        net.add_pipe("T2", "H", 0.0).unwrap();
        // Drain T2 so the credit is visible
        net.add_pipe("T2", "T1", 50.0).unwrap();

        let before = net.tank("T2").unwrap().level;
        let report = net.add_pipe("H", "T2", 30.0).unwrap();

        // 30 L/s leaves H, the only house feeding T2 keeps 10 of it
        assert_eq!(net.tank("T2").unwrap().level, before + 20.0);
        assert!(report
            .findings
            .iter()
            .any(|f| matches!(f, Finding::FlowReturned { tank, .. } if tank == "T2")));
    }

    #[test]
    fn test_set_obstruction_credits_tank() {
        let mut net = tank_with_house();
        net.set_obstruction("T", "H1", 50).unwrap();

        let pipe = net.pipe("T", "H1").unwrap();
        assert_eq!(pipe.flow_capacity, 20.0);
        assert_eq!(pipe.base_capacity, 40.0);
        assert_eq!(net.tank("T").unwrap().level, 80.0);

        net.set_obstruction("T", "H1", -1).unwrap();
        assert_eq!(net.pipe("T", "H1").unwrap().flow_capacity, 0.0);
        assert_eq!(net.tank("T").unwrap().level, 100.0);
    }

    #[test]
    fn test_set_obstruction_validation() {
        let mut net = tank_with_house();
        let err = net.set_obstruction("T", "H1", 101).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(net.pipe("T", "H1").unwrap().flow_capacity, 40.0);

        let err = net.set_obstruction("H1", "T", 10).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_remove_node_cascades() {
        let mut net = tank_with_house();
        let report = net.remove_house("H1").unwrap();

        assert_eq!(net.pipe_count(), 0);
        assert_eq!(net.tank("T").unwrap().level, 100.0);
        assert!(report.is_empty());
    }

    #[test]
    fn test_remove_kind_checked() {
        let mut net = tank_with_house();
        assert_eq!(net.remove_tank("H1").unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(net.remove_house("T").unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(net.node_count(), 2);
    }

    #[test]
    fn test_remove_pipe_reports_shortfall() {
        let mut net = tank_with_house();
        let report = net.remove_pipe("T", "H1").unwrap();

        assert_eq!(report.under_supplied(), vec!["H1"]);
        assert_eq!(net.tank("T").unwrap().level, 100.0);
    }

    #[test]
    fn test_reverse_edge() {
        let mut net = tank_with_house();
        net.reverse_edge("T", "H1").unwrap();

        assert!(net.pipe("T", "H1").is_none());
        assert_eq!(net.pipe("H1", "T").unwrap().flow_capacity, 40.0);
        assert_eq!(net.tank("T").unwrap().level, 100.0);

        let err = net.reverse_edge("T", "H1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_reverse_edge_conflict() {
        let mut net = tank_with_house();
        net.add_pipe("H1", "T", 5.0).unwrap();

        let err = net.reverse_edge("T", "H1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(net.pipe_count(), 2);
    }

    #[test]
    fn test_dangling_resolved_by_later_add() {
        let mut net = Network::new();
        net.add_tank("T", 10.0, &["H9"]).unwrap();
        assert_eq!(net.dangling.len(), 1);

        net.add_house("H9", 1.0).unwrap();
        assert!(net.dangling.is_empty());
    }

    #[test]
    fn test_sorted_accessors() {
        let mut net = Network::new();
        net.add_house("b", 1.0).unwrap();
        net.add_house("a", 1.0).unwrap();
        net.add_tank("T", 10.0, &["b", "a"]).unwrap();

        assert_eq!(net.names(), vec!["T", "a", "b"]);
        assert_eq!(net.successors("T").unwrap(), vec!["a", "b"]);
        assert_eq!(net.predecessors("a").unwrap(), vec!["T"]);
        let pipes: Vec<_> = net.pipes().into_iter().map(|(f, t, _)| (f, t)).collect();
        assert_eq!(pipes, vec![("T", "a"), ("T", "b")]);
    }
}
