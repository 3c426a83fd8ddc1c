// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Maximum flow between two nodes (Edmonds-Karp)
//!
//! Runs on a private residual copy of the pipe capacities. The live network
//! is never touched.

use crate::error::NetworkResult;
use crate::flow::FLOW_EPSILON;
use crate::network::Network;
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use tracing::{debug, trace};

/// One augmenting path and the flow it added
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AugmentingPath {
    /// Node names from source to sink
    pub path: Vec<String>,
    /// Bottleneck pushed along the path
    pub flow: f64,
}

/// Result of a max-flow computation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaxFlow {
    /// Total flow from source to sink
    pub value: f64,
    /// Augmenting paths in the order they were found
    pub augmenting_paths: Vec<AugmentingPath>,
}

type Residual<'a> = BTreeMap<&'a str, BTreeMap<&'a str, f64>>;

fn adjust_capacity<'a>(residual: &mut Residual<'a>, from: &'a str, to: &'a str, delta: f64) {
    *residual.entry(from).or_default().entry(to).or_default() += delta;
}

/// Shortest path with spare residual capacity, with its bottleneck
fn augmenting_path<'a>(
    residual: &Residual<'a>,
    source: &'a str,
    sink: &'a str,
) -> Option<(f64, Vec<&'a str>)> {
    let mut parent: HashMap<&str, &str> = HashMap::new();
    let mut queue = VecDeque::from([(source, f64::INFINITY)]);

    while let Some((node, flow)) = queue.pop_front() {
        let Some(edges) = residual.get(node) else {
            continue;
        };
        for (&target, &capacity) in edges {
            if target == source || parent.contains_key(target) || capacity <= FLOW_EPSILON {
                continue;
            }
            parent.insert(target, node);
            let bottleneck = flow.min(capacity);
            if target == sink {
                return Some((bottleneck, trace(&parent, source, sink)));
            }
            queue.push_back((target, bottleneck));
        }
    }
    None
}

fn trace<'a>(parent: &HashMap<&'a str, &'a str>, source: &'a str, sink: &'a str) -> Vec<&'a str> {
    let mut path = vec![sink];
    let mut node = sink;
    while node != source {
        match parent.get(node) {
            Some(&previous) => {
                path.push(previous);
                node = previous;
            }
            None => break,
        }
    }
    path.reverse();
    path
}

impl Network {
    /// Maximum flow the pipes can carry from `source` to `sink`, using each
    /// pipe's effective capacity
    pub fn compute_max_flow(&self, source: &str, sink: &str) -> NetworkResult<MaxFlow> {
        let source = self.name_of(self.index_of(source)?);
        let sink = self.name_of(self.index_of(sink)?);
        if source == sink {
            return Ok(MaxFlow::default());
        }

        let mut residual: Residual = BTreeMap::new();
        for edge in self.graph.edge_references() {
            let from = self.name_of(edge.source());
            let to = self.name_of(edge.target());
            adjust_capacity(&mut residual, from, to, edge.weight().flow_capacity);
        }

        let mut result = MaxFlow::default();
        while let Some((flow, path)) = augmenting_path(&residual, source, sink) {
            trace!("Augmenting {:?} by {}", path, flow);
            for pair in path.windows(2) {
                adjust_capacity(&mut residual, pair[0], pair[1], -flow);
                adjust_capacity(&mut residual, pair[1], pair[0], flow);
            }
            result.value += flow;
            result.augmenting_paths.push(AugmentingPath {
                path: path.into_iter().map(str::to_string).collect(),
                flow,
            });
        }

        debug!(
            "Max flow {} -> {}: {} over {} paths",
            source,
            sink,
            result.value,
            result.augmenting_paths.len()
        );
        Ok(result)
    }
}
