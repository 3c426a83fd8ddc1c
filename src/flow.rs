// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Flow distribution and supply verification
//!
//! Propagation is a priority-free breadth-first walk seeded from every tank
//! with its current level. Houses consume what they still need and pass the
//! rest on; every pipe carries at most its effective capacity over the whole
//! walk. This is a conservative gravity-style approximation, not an optimal
//! allocation (see [`crate::maxflow`] for that).

use crate::error::NetworkResult;
use crate::findings::{Finding, Report};
use crate::network::Network;
use petgraph::algo::has_path_connecting;
use petgraph::stable_graph::{EdgeIndex, NodeIndex};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use tracing::{debug, trace, warn};

/// Amounts below this are treated as zero
pub const FLOW_EPSILON: f64 = 1e-9;

/// Processing steps allowed per node and pipe before propagation gives up
const STEPS_PER_ELEMENT: usize = 4;

/// Flow bookkeeping for one node after propagation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeFlow {
    /// Flow that reached the node (a tank counts its own level)
    pub received: f64,
    /// Flow a house used to cover its demand
    pub consumed: f64,
    /// Flow sent on through outgoing pipes
    pub forwarded: f64,
    /// Flow left at the node with nowhere to go
    pub remaining: f64,
}

/// Flow carried by one pipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipeFlow {
    /// Upstream node
    pub from: String,
    /// Downstream node
    pub to: String,
    /// Flow carried
    pub flow: f64,
}

/// Result of a full propagation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowAllocation {
    /// Per-node bookkeeping, keyed by name
    pub nodes: BTreeMap<String, NodeFlow>,
    /// Pipes that carried flow, sorted by endpoints
    pub pipes: Vec<PipeFlow>,
    /// Processing steps taken
    pub steps: usize,
    /// Did the pass stop at its step budget?
    pub truncated: bool,
}

impl FlowAllocation {
    /// Bookkeeping for one node
    #[must_use]
    pub fn node(&self, name: &str) -> Option<&NodeFlow> {
        self.nodes.get(name)
    }

    /// Flow carried by the pipe `from -> to` (zero when it carried none)
    #[must_use]
    pub fn pipe_flow(&self, from: &str, to: &str) -> f64 {
        self.pipes
            .iter()
            .find(|p| p.from == from && p.to == to)
            .map_or(0.0, |p| p.flow)
    }
}

/// Propagate tank levels through the network
pub(crate) fn propagate(network: &Network) -> FlowAllocation {
    let graph = &network.graph;
    let budget = STEPS_PER_ELEMENT * (graph.node_count() + graph.edge_count()) + 1;

    let mut flows: HashMap<NodeIndex, NodeFlow> = HashMap::new();
    let mut pending: HashMap<NodeIndex, f64> = HashMap::new();
    let mut still_needed: HashMap<NodeIndex, f64> = HashMap::new();
    let mut residual: HashMap<EdgeIndex, f64> = graph
        .edge_references()
        .map(|e| (e.id(), e.weight().flow_capacity))
        .collect();
    let mut carried: HashMap<EdgeIndex, f64> = HashMap::new();

    let mut queue = VecDeque::new();
    let mut queued = HashSet::new();

    for name in network.names() {
        let Some(&idx) = network.indices.get(name) else {
            continue;
        };
        let node = &graph[idx];
        flows.insert(idx, NodeFlow::default());
        if let Some(house) = node.as_house() {
            still_needed.insert(idx, house.demand);
        }
        if let Some(tank) = node.as_tank() {
            pending.insert(idx, tank.level);
            if let Some(flow) = flows.get_mut(&idx) {
                flow.received = tank.level;
            }
            queued.insert(idx);
            queue.push_back(idx);
        }
    }

    let mut steps = 0;
    let mut truncated = false;

    while let Some(idx) = queue.pop_front() {
        if steps >= budget {
            truncated = true;
            queue.push_front(idx);
            break;
        }
        steps += 1;
        queued.remove(&idx);

        let mut surplus = pending.remove(&idx).unwrap_or(0.0);

        if let Some(needed) = still_needed.get_mut(&idx) {
            let used = surplus.min(*needed);
            *needed -= used;
            surplus -= used;
            flows.entry(idx).or_default().consumed += used;
        }

        for (edge, next) in network.neighbours(idx, Direction::Outgoing) {
            if surplus <= FLOW_EPSILON {
                break;
            }
            let room = residual.get(&edge).copied().unwrap_or(0.0);
            let sent = surplus.min(room);
            if sent <= FLOW_EPSILON {
                continue;
            }

            surplus -= sent;
            residual.insert(edge, room - sent);
            *carried.entry(edge).or_default() += sent;
            flows.entry(idx).or_default().forwarded += sent;
            flows.entry(next).or_default().received += sent;
            *pending.entry(next).or_default() += sent;
            trace!("Sent {} from {} to {}", sent, network.name_of(idx), network.name_of(next));

            if queued.insert(next) {
                queue.push_back(next);
            }
        }

        if surplus > FLOW_EPSILON {
            flows.entry(idx).or_default().remaining += surplus;
        }
    }

    if truncated {
        warn!("Propagation hit its budget of {} steps; a loop is recirculating flow", budget);
        for idx in queue {
            if let Some(left) = pending.remove(&idx) {
                flows.entry(idx).or_default().remaining += left;
            }
        }
    }

    let mut pipes: Vec<PipeFlow> = carried
        .into_iter()
        .filter_map(|(edge, flow)| {
            graph.edge_endpoints(edge).map(|(a, b)| PipeFlow {
                from: network.name_of(a).to_string(),
                to: network.name_of(b).to_string(),
                flow,
            })
        })
        .collect();
    pipes.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));

    debug!("Propagation finished in {} steps", steps);

    FlowAllocation {
        nodes: flows
            .into_iter()
            .map(|(idx, flow)| (network.name_of(idx).to_string(), flow))
            .collect(),
        pipes,
        steps,
        truncated,
    }
}

/// Supply classification for one house
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupplyState {
    /// Incoming capacity covers demand
    Satisfied,
    /// Connected to a tank but short of demand
    Insufficient,
    /// No tank reaches the house
    Disconnected,
}

/// Supply summary for one house
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplyStatus {
    /// House name
    pub house: String,
    /// Required flow
    pub demand: f64,
    /// Sum of incoming effective capacity
    pub received: f64,
    /// Flow the last propagation actually delivered
    pub allocated: f64,
    /// Classification
    pub state: SupplyState,
}

impl Network {
    /// Sum of effective capacity on pipes entering a node
    fn incoming_capacity(&self, idx: NodeIndex) -> f64 {
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| e.weight().flow_capacity)
            .sum()
    }

    /// Does incoming pipe capacity cover the house's demand?
    pub fn verify_house_supply(&self, house: &str) -> NetworkResult<bool> {
        let demand = self.house(house)?.demand;
        let idx = self.index_of(house)?;
        Ok(self.incoming_capacity(idx) >= demand)
    }

    /// Supply status of every house, sorted by name
    #[must_use]
    pub fn verify_network_supply(&self) -> Vec<SupplyStatus> {
        let tanks: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|&idx| self.graph[idx].is_tank())
            .collect();

        self.houses()
            .into_iter()
            .filter_map(|(name, house)| {
                let idx = *self.indices.get(name)?;
                let received = self.incoming_capacity(idx);
                let connected = tanks
                    .iter()
                    .any(|&tank| has_path_connecting(&self.graph, tank, idx, None));
                let state = if !connected {
                    SupplyState::Disconnected
                } else if received >= house.demand {
                    SupplyState::Satisfied
                } else {
                    SupplyState::Insufficient
                };
                Some(SupplyStatus {
                    house: name.to_string(),
                    demand: house.demand,
                    received,
                    allocated: self.allocation().node(name).map_or(0.0, |f| f.consumed),
                    state,
                })
            })
            .collect()
    }

    /// Houses whose incoming capacity falls short of demand, sorted
    #[must_use]
    pub fn underserved_houses(&self) -> Vec<String> {
        self.houses()
            .into_iter()
            .filter(|(name, _)| matches!(self.verify_house_supply(name), Ok(false)))
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Findings for every under-supplied house
    pub(crate) fn supply_shortfalls(&self) -> Vec<Finding> {
        self.houses()
            .into_iter()
            .filter_map(|(name, house)| {
                let idx = *self.indices.get(name)?;
                let received = self.incoming_capacity(idx);
                (received < house.demand).then(|| Finding::InsufficientSupply {
                    house: name.to_string(),
                    received,
                    demand: house.demand,
                })
            })
            .collect()
    }

    /// Check a house that just gained a pipe and pass its surplus on.
    ///
    /// Walks downstream iteratively: each house keeps what it needs, a tank
    /// absorbs what reaches it and ends that branch. A node is entered at
    /// most once; meeting it again is reported as a loop.
    pub(crate) fn forward_surplus(&mut self, house: NodeIndex, report: &mut Report) {
        let Some(demand) = self.graph[house].as_house().map(|h| h.demand) else {
            return;
        };
        let received = self.incoming_capacity(house);
        if received < demand {
            debug!("House {} short: {}/{} L/s", self.name_of(house), received, demand);
            report.push(Finding::InsufficientSupply {
                house: self.name_of(house).to_string(),
                received,
                demand,
            });
            return;
        }

        let mut visited = HashSet::from([house]);
        let mut stack = vec![(house, received - demand)];

        while let Some((idx, mut surplus)) = stack.pop() {
            for (edge, next) in self.neighbours(idx, Direction::Outgoing) {
                if surplus <= FLOW_EPSILON {
                    break;
                }
                let capacity = self.graph[edge].flow_capacity;
                if capacity <= FLOW_EPSILON {
                    continue;
                }
                if !visited.insert(next) {
                    warn!("Surplus from {} loops back to {}", self.name_of(idx), self.name_of(next));
                    report.push(Finding::ForwardingCycle {
                        from: self.name_of(idx).to_string(),
                        to: self.name_of(next).to_string(),
                    });
                    continue;
                }

                let passed = surplus.min(capacity);
                surplus -= passed;

                if self.graph[next].is_tank() {
                    self.credit_tank(next, passed, report);
                    break;
                }

                report.push(Finding::SurplusForwarded {
                    from: self.name_of(idx).to_string(),
                    to: self.name_of(next).to_string(),
                    amount: passed,
                });
                let needed = self.graph[next].as_house().map_or(0.0, |h| h.demand);
                let left = passed - passed.min(needed);
                if left > FLOW_EPSILON {
                    stack.push((next, left));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Network {
        // T -> H1 -> H2
        let mut net = Network::new();
        net.add_tank("T", 100.0, &[] as &[&str]).unwrap();
        net.add_house("H1", 10.0).unwrap();
        net.add_house("H2", 15.0).unwrap();
        net.add_pipe("T", "H1", 40.0).unwrap();
        net.add_pipe("H1", "H2", 20.0).unwrap();
        net
    }

    #[test]
    fn test_propagation_consumes_and_forwards() {
        let net = chain();
        let alloc = net.allocation();

        // T holds 60 after committing 40 to its pipe
        let t = alloc.node("T").unwrap();
        assert_eq!(t.received, 60.0);
        assert_eq!(t.forwarded, 40.0);
        assert_eq!(t.remaining, 20.0);

        let h1 = alloc.node("H1").unwrap();
        assert_eq!(h1.consumed, 10.0);
        assert_eq!(h1.forwarded, 20.0);
        assert_eq!(h1.remaining, 10.0);

        let h2 = alloc.node("H2").unwrap();
        assert_eq!(h2.consumed, 15.0);
        assert_eq!(h2.remaining, 5.0);

        assert_eq!(alloc.pipe_flow("H1", "H2"), 20.0);
        assert!(!alloc.truncated);
    }

    #[test]
    fn test_propagation_terminates_on_cycles() {
        let mut net = Network::new();
        net.add_tank("T", 1000.0, &[] as &[&str]).unwrap();
        net.add_house("A", 0.0).unwrap();
        net.add_house("B", 0.0).unwrap();
        net.add_pipe("T", "A", 10.0).unwrap();
        net.add_pipe("A", "B", 1000.0).unwrap();
        net.add_pipe("B", "A", 1000.0).unwrap();

        let alloc = net.allocation();
        // Each pipe carries at most its capacity
        assert!(alloc.pipe_flow("A", "B") <= 1000.0 + FLOW_EPSILON);
        assert!(alloc.pipe_flow("T", "A") <= 10.0 + FLOW_EPSILON);
    }

    #[test]
    fn test_verify_house_supply() {
        let net = chain();
        assert!(net.verify_house_supply("H1").unwrap());
        assert!(net.verify_house_supply("H2").unwrap());
        assert!(net.verify_house_supply("T").is_err());
        assert!(net.verify_house_supply("nope").is_err());
    }

    #[test]
    fn test_verify_network_supply_states() {
        let mut net = chain();
        net.add_house("H3", 5.0).unwrap();
        net.add_house("H4", 50.0).unwrap();
        net.add_pipe("H2", "H4", 5.0).unwrap();

        let statuses = net.verify_network_supply();
        let state = |name: &str| statuses.iter().find(|s| s.house == name).unwrap().state;

        assert_eq!(state("H1"), SupplyState::Satisfied);
        assert_eq!(state("H3"), SupplyState::Disconnected);
        assert_eq!(state("H4"), SupplyState::Insufficient);
        assert_eq!(net.underserved_houses(), vec!["H3".to_string(), "H4".to_string()]);
    }

    #[test]
    fn test_add_pipe_reports_insufficient_house() {
        let mut net = Network::new();
        net.add_tank("T", 100.0, &[] as &[&str]).unwrap();
        net.add_house("H", 50.0).unwrap();
        let report = net.add_pipe("T", "H", 20.0).unwrap();

        assert_eq!(report.under_supplied(), vec!["H"]);
    }

    #[test]
    fn test_surplus_forwarded_downstream() {
        let mut net = Network::new();
        net.add_tank("T", 100.0, &[] as &[&str]).unwrap();
        net.add_house("H1", 10.0).unwrap();
        net.add_house("H2", 5.0).unwrap();
        net.add_pipe("H1", "H2", 30.0).unwrap();

        let report = net.add_pipe("T", "H1", 40.0).unwrap();
        assert!(report.findings.contains(&Finding::SurplusForwarded {
            from: "H1".into(),
            to: "H2".into(),
            amount: 30.0,
        }));
    }

    #[test]
    fn test_surplus_returns_to_tank() {
        let mut net = Network::new();
        net.add_tank("T", 100.0, &[] as &[&str]).unwrap();
        net.add_house("H", 10.0).unwrap();
        net.add_pipe("H", "T", 50.0).unwrap();

        // H -> T carries 50 but H needs 10 of it: T is credited 40, full already
        assert_eq!(net.tank("T").unwrap().level, 100.0);

        let report = net.add_pipe("T", "H", 30.0).unwrap();
        // T level drops to 70, then H returns its 20 L/s surplus
        assert_eq!(net.tank("T").unwrap().level, 90.0);
        assert!(report
            .findings
            .iter()
            .any(|f| matches!(f, Finding::FlowReturned { tank, amount, .. } if tank == "T" && *amount == 20.0)));
    }

    #[test]
    fn test_forwarding_cycle_reported() {
        let mut net = Network::new();
        net.add_tank("T", 100.0, &[] as &[&str]).unwrap();
        net.add_house("A", 1.0).unwrap();
        net.add_house("B", 1.0).unwrap();
        net.add_pipe("A", "B", 50.0).unwrap();
        net.add_pipe("B", "A", 50.0).unwrap();

        let report = net.add_pipe("T", "A", 60.0).unwrap();
        assert!(report
            .findings
            .iter()
            .any(|f| matches!(f, Finding::ForwardingCycle { from, to } if from == "B" && to == "A")));
    }
}
