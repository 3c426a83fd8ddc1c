// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Widest-path rerouting for under-served houses

use crate::error::NetworkResult;
use crate::flow::FLOW_EPSILON;
use crate::network::Network;
use petgraph::stable_graph::NodeIndex;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use tracing::debug;

/// A supply path from a tank to a house
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Node names from the tank to the house
    pub path: Vec<String>,
    /// Bottleneck flow along the path
    pub flow: f64,
}

impl Route {
    /// Tank at the head of the route
    #[must_use]
    pub fn tank(&self) -> Option<&str> {
        self.path.first().map(String::as_str)
    }
}

/// Queue entry: widest flow first, then smallest name
struct Candidate<'a> {
    flow: f64,
    name: &'a str,
    idx: NodeIndex,
}

impl PartialEq for Candidate<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate<'_> {}

impl PartialOrd for Candidate<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.flow
            .total_cmp(&other.flow)
            .then_with(|| other.name.cmp(self.name))
    }
}

impl Network {
    /// Search upstream from `house` for the tank that can push the most flow
    /// to it along a single path.
    ///
    /// Blocked and zero-capacity pipes are skipped and a tank can never
    /// deliver more than its current level. Returns `None` when no tank
    /// covers the house's demand.
    pub fn find_alternative_route(&self, house: &str) -> NetworkResult<Option<Route>> {
        let demand = self.house(house)?.demand;
        let start = self.index_of(house)?;

        let mut widest: HashMap<NodeIndex, f64> = HashMap::from([(start, f64::INFINITY)]);
        let mut toward: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut heap = BinaryHeap::from([Candidate {
            flow: f64::INFINITY,
            name: self.name_of(start),
            idx: start,
        }]);

        while let Some(Candidate { flow, idx, .. }) = heap.pop() {
            if widest.get(&idx).is_some_and(|&best| flow < best) {
                continue;
            }

            if let Some(tank) = self.graph[idx].as_tank() {
                let deliverable = flow.min(tank.level);
                if deliverable + FLOW_EPSILON >= demand {
                    let route = self.trace_route(idx, start, &toward, deliverable);
                    debug!("Route for {}: {:?} ({} L/s)", house, route.path, route.flow);
                    return Ok(Some(route));
                }
            }

            for (edge, upstream) in self.neighbours(idx, Direction::Incoming) {
                let pipe = &self.graph[edge];
                if !pipe.is_open() || pipe.base_capacity <= 0.0 {
                    continue;
                }
                let through = flow.min(pipe.obstruction.apply(pipe.base_capacity));
                if through > widest.get(&upstream).copied().unwrap_or(0.0) {
                    widest.insert(upstream, through);
                    toward.insert(upstream, idx);
                    heap.push(Candidate { flow: through, name: self.name_of(upstream), idx: upstream });
                }
            }
        }

        debug!("No tank can cover {} L/s for {}", demand, house);
        Ok(None)
    }

    fn trace_route(
        &self,
        tank: NodeIndex,
        house: NodeIndex,
        toward: &HashMap<NodeIndex, NodeIndex>,
        flow: f64,
    ) -> Route {
        let mut path = vec![self.name_of(tank).to_string()];
        let mut current = tank;
        while current != house {
            let Some(&next) = toward.get(&current) else {
                break;
            };
            path.push(self.name_of(next).to_string());
            current = next;
        }
        Route { path, flow }
    }

    /// Best route for every under-served house, `None` where no tank can help
    #[must_use]
    pub fn alternative_routes(&self) -> Vec<(String, Option<Route>)> {
        self.underserved_houses()
            .into_iter()
            .map(|house| {
                let route = self.find_alternative_route(&house).ok().flatten();
                (house, route)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    /// H (demand 50) fed by a blocked pipe from T1 and a clear one from T2
    fn two_tanks(t2_capacity: f64) -> Network {
        let mut net = Network::new();
        net.add_tank("T1", 100.0, &[] as &[&str]).unwrap();
        net.add_tank("T2", t2_capacity, &[] as &[&str]).unwrap();
        net.add_house("H", 50.0).unwrap();
        net.add_pipe("T1", "H", 80.0).unwrap();
        net.add_pipe("T2", "H", 70.0).unwrap();
        net.set_obstruction("T1", "H", -1).unwrap();
        net
    }

    #[test]
    fn test_route_skips_blocked_pipe() {
        let net = two_tanks(130.0);
        assert_eq!(net.tank("T2").unwrap().level, 60.0);

        let route = net.find_alternative_route("H").unwrap().unwrap();
        assert_eq!(route.path, vec!["T2", "H"]);
        assert_eq!(route.flow, 60.0);
        assert_eq!(route.tank(), Some("T2"));
    }

    #[test]
    fn test_no_route_when_level_too_low() {
        let net = two_tanks(100.0);
        // T2 holds 30 after its 70 L/s pipe
        assert!(net.find_alternative_route("H").unwrap().is_none());
    }

    #[test]
    fn test_route_through_intermediate_house() {
        let mut net = Network::new();
        net.add_tank("T", 200.0, &[] as &[&str]).unwrap();
        net.add_house("A", 5.0).unwrap();
        net.add_house("H", 20.0).unwrap();
        net.add_pipe("T", "A", 30.0).unwrap();
        net.add_pipe("A", "H", 25.0).unwrap();

        let route = net.find_alternative_route("H").unwrap().unwrap();
        assert_eq!(route.path, vec!["T", "A", "H"]);
        assert_eq!(route.flow, 25.0);
    }

    #[test]
    fn test_widest_path_wins() {
        let mut net = Network::new();
        net.add_tank("T", 500.0, &[] as &[&str]).unwrap();
        net.add_house("A", 0.0).unwrap();
        net.add_house("B", 0.0).unwrap();
        net.add_house("H", 10.0).unwrap();
        net.add_pipe("T", "A", 15.0).unwrap();
        net.add_pipe("A", "H", 15.0).unwrap();
        net.add_pipe("T", "B", 40.0).unwrap();
        net.add_pipe("B", "H", 35.0).unwrap();

        let route = net.find_alternative_route("H").unwrap().unwrap();
        assert_eq!(route.path, vec!["T", "B", "H"]);
        assert_eq!(route.flow, 35.0);
    }

    #[test]
    fn test_route_requires_house() {
        let net = two_tanks(130.0);
        assert_eq!(net.find_alternative_route("T1").unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(net.find_alternative_route("zz").unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_alternative_routes_for_underserved() {
        let mut net = Network::new();
        net.add_tank("T", 100.0, &[] as &[&str]).unwrap();
        net.add_house("H", 50.0).unwrap();
        net.add_pipe("T", "H", 20.0).unwrap();

        let routes = net.alternative_routes();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].0, "H");
        assert!(routes[0].1.is_none());
    }
}
