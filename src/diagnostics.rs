// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Topology checks and infrastructure suggestions
//!
//! Nothing here mutates the network. Inconsistencies come back as
//! [`Finding`]s, never as errors.

use crate::findings::{Finding, Report};
use crate::network::Network;
use crate::types::PressureBand;
use petgraph::algo::tarjan_scc;
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

impl Network {
    /// One finding per pair of nodes joined by pipes in both directions
    #[must_use]
    pub fn detect_duplicate_connections(&self) -> Vec<Finding> {
        self.pipes()
            .into_iter()
            .filter(|(from, to, _)| from < to && self.pipe(to, from).is_some())
            .map(|(from, to, _)| Finding::DuplicateConnection { a: from.to_string(), b: to.to_string() })
            .collect()
    }

    /// Every simple directed cycle, each starting at its smallest node name
    #[must_use]
    pub fn detect_cycles(&self) -> Vec<Vec<String>> {
        let mut cycles = Vec::new();

        for component in tarjan_scc(&self.graph) {
            if component.len() < 2 {
                continue;
            }
            let members: BTreeSet<&str> = component.iter().map(|&idx| self.name_of(idx)).collect();
            let adjacency: BTreeMap<&str, Vec<&str>> = component
                .iter()
                .map(|&idx| {
                    let next = self
                        .neighbours(idx, Direction::Outgoing)
                        .into_iter()
                        .map(|(_, n)| self.name_of(n))
                        .filter(|n| members.contains(n))
                        .collect();
                    (self.name_of(idx), next)
                })
                .collect();

            for &start in &members {
                let mut path = vec![start];
                collect_cycles(&adjacency, start, start, &mut path, &mut cycles);
            }
        }

        cycles.sort();
        debug!("Found {} cycles", cycles.len());
        cycles
    }

    /// Connections recorded against nodes that were never defined
    #[must_use]
    pub fn detect_dangling_references(&self) -> Vec<Finding> {
        self.dangling
            .keys()
            .map(|(from, to)| Finding::DanglingReference { from: from.clone(), to: to.clone() })
            .collect()
    }

    /// Group houses that touch each other through pipes, ignoring direction.
    ///
    /// Only the given houses take part; unknown names and tanks are skipped.
    #[must_use]
    pub fn cluster_underserved_houses(&self, houses: &[String]) -> Vec<Vec<String>> {
        let eligible: HashSet<&str> = houses
            .iter()
            .map(String::as_str)
            .filter(|name| self.house(name).is_ok())
            .collect();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut clusters = Vec::new();

        for house in houses {
            let house = house.as_str();
            if !eligible.contains(house) || visited.contains(house) {
                continue;
            }

            let mut cluster = Vec::new();
            let mut stack = vec![house];
            while let Some(current) = stack.pop() {
                if !visited.insert(current) {
                    continue;
                }
                cluster.push(current.to_string());

                let Some(&idx) = self.indices.get(current) else {
                    continue;
                };
                let mut adjacent: Vec<&str> = self
                    .graph
                    .neighbors_undirected(idx)
                    .map(|n| self.name_of(n))
                    .filter(|n| eligible.contains(n) && !visited.contains(n))
                    .collect();
                adjacent.sort_unstable_by(|a, b| b.cmp(a));
                adjacent.dedup();
                stack.extend(adjacent);
            }
            clusters.push(cluster);
        }

        clusters.sort_by(|a, b| a.first().cmp(&b.first()));
        clusters
    }

    /// Propose a tank at the first house of a cluster
    #[must_use]
    pub fn suggest_new_tank(&self, cluster: &[String]) -> Option<Finding> {
        let site = cluster.first()?;
        Some(Finding::TankSuggestion { site: site.clone(), houses: cluster.to_vec() })
    }

    /// Propose tank-to-tank links where both tanks sit inside the pressure
    /// band and the origin has no more spare room than the destination
    #[must_use]
    pub fn suggest_new_connections(&self, band: PressureBand) -> Vec<Finding> {
        let tanks: Vec<_> = self
            .tanks()
            .into_iter()
            .filter(|(_, tank)| band.admits(tank))
            .collect();

        let mut suggestions = Vec::new();
        for (origin, from) in &tanks {
            for (destination, to) in &tanks {
                if origin == destination || self.pipe(origin, destination).is_some() {
                    continue;
                }
                if from.available() <= to.available() {
                    suggestions.push(Finding::ConnectionSuggestion {
                        from: (*origin).to_string(),
                        to: (*destination).to_string(),
                    });
                }
            }
        }
        suggestions
    }

    /// Duplicates, cycles, dangling references and supply shortfalls
    #[must_use]
    pub fn diagnose(&self) -> Report {
        let mut report = Report::new();
        report.extend(self.detect_duplicate_connections());
        report.extend(self.detect_cycles().into_iter().map(|nodes| Finding::Cycle { nodes }));
        report.extend(self.detect_dangling_references());
        report.extend(self.supply_shortfalls());
        report
    }

    /// Tank siting for clusters of under-served houses plus tank links
    #[must_use]
    pub fn advise(&self, band: PressureBand) -> Report {
        let underserved = self.underserved_houses();
        let mut report: Report = self
            .cluster_underserved_houses(&underserved)
            .iter()
            .filter_map(|cluster| self.suggest_new_tank(cluster))
            .collect();
        report.extend(self.suggest_new_connections(band));
        report
    }
}

/// Extend `path` through nodes named after `start`, recording every way
/// back to `start`
fn collect_cycles<'a>(
    adjacency: &BTreeMap<&'a str, Vec<&'a str>>,
    start: &'a str,
    current: &'a str,
    path: &mut Vec<&'a str>,
    cycles: &mut Vec<Vec<String>>,
) {
    let Some(next) = adjacency.get(current) else {
        return;
    };
    for &node in next {
        if node == start {
            cycles.push(path.iter().map(|s| (*s).to_string()).collect());
        } else if node > start && !path.contains(&node) {
            path.push(node);
            collect_cycles(adjacency, start, node, path, cycles);
            path.pop();
        }
    }
}
