// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! JSON snapshot persistence
//!
//! The on-disk layout keeps the field names of the historical network files
//! (`casas`, `tanques`, `tuberias`) so existing snapshots load unchanged.

use crate::findings::{Finding, Report};
use crate::network::{Network, Unresolved};
use crate::types::Obstruction;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A house as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseRecord {
    /// Demand (L/s)
    #[serde(rename = "demanda")]
    pub demand: f64,
}

/// A tank as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TankRecord {
    /// Capacity (L)
    #[serde(rename = "capacidad")]
    pub capacity: f64,
    /// Level at save time, recomputed when absent
    #[serde(rename = "nivel", default, skip_serializing_if = "Option::is_none")]
    pub level: Option<f64>,
    /// Nodes this tank feeds
    #[serde(rename = "conexiones", default)]
    pub connections: Vec<String>,
}

/// A pipe as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipeRecord {
    /// Upstream node
    #[serde(rename = "nodo1")]
    pub from: String,
    /// Downstream node
    #[serde(rename = "nodo2")]
    pub to: String,
    /// Capacity before obstruction (L/s)
    #[serde(rename = "capacidad_flujo")]
    pub capacity: f64,
    /// Obstruction percentage, `-1` when blocked
    #[serde(rename = "obstruccion", default, skip_serializing_if = "is_clear")]
    pub obstruction: i32,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_clear(obstruction: &i32) -> bool {
    *obstruction == 0
}

/// Serialized form of a whole network
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Houses by name
    #[serde(rename = "casas", default)]
    pub houses: BTreeMap<String, HouseRecord>,
    /// Tanks by name
    #[serde(rename = "tanques", default)]
    pub tanks: BTreeMap<String, TankRecord>,
    /// Pipes, sorted by endpoints
    #[serde(rename = "tuberias", default)]
    pub pipes: Vec<PipeRecord>,
}

impl Snapshot {
    /// Read a snapshot file
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Write a snapshot file through a sibling temporary file
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }

        let json = serde_json::to_string_pretty(self).context("Failed to serialize network")?;
        let staging = staging_path(path);
        fs::write(&staging, json)
            .with_context(|| format!("Failed to write {}", staging.display()))?;
        fs::rename(&staging, path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        debug!("Wrote snapshot to {}", path.display());
        Ok(())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "network".into(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!(".{name}.tmp"))
}

impl Network {
    /// Build a network from a snapshot.
    ///
    /// Houses go in first, then tanks with their connections, then pipes.
    /// Connections between tanks wait until every tank exists. Pipes naming
    /// undefined nodes are recorded as dangling references and skipped.
    /// Saved tank levels are restored last.
    pub fn from_snapshot(snapshot: &Snapshot) -> Result<(Self, Report)> {
        let mut network = Self::new();
        let mut report = Report::new();

        for (name, house) in &snapshot.houses {
            report.merge(
                network
                    .add_house(name, house.demand)
                    .with_context(|| format!("Failed to load house {name}"))?,
            );
        }

        let mut deferred = Vec::new();
        for (name, tank) in &snapshot.tanks {
            let (later, now): (Vec<&String>, Vec<&String>) = tank
                .connections
                .iter()
                .partition(|target| *target != name && snapshot.tanks.contains_key(*target));
            report.merge(
                network
                    .add_tank(name, tank.capacity, now.as_slice())
                    .with_context(|| format!("Failed to load tank {name}"))?,
            );
            deferred.extend(later.into_iter().map(|target| (name, target)));
        }

        for (from, to) in deferred {
            report.merge(
                network
                    .add_pipe(from, to, 0.0)
                    .with_context(|| format!("Failed to connect tank {from} to {to}"))?,
            );
        }

        for pipe in &snapshot.pipes {
            if !(network.contains(&pipe.from) && network.contains(&pipe.to)) {
                warn!("Pipe {} -> {} references an undefined node", pipe.from, pipe.to);
                network.dangling.insert(
                    (pipe.from.clone(), pipe.to.clone()),
                    Unresolved::Pipe { capacity: pipe.capacity, obstruction: pipe.obstruction },
                );
                report.push(Finding::DanglingReference { from: pipe.from.clone(), to: pipe.to.clone() });
                continue;
            }

            report.merge(
                network
                    .add_pipe(&pipe.from, &pipe.to, pipe.capacity)
                    .with_context(|| format!("Failed to load pipe {} -> {}", pipe.from, pipe.to))?,
            );
            if pipe.obstruction != Obstruction::NONE.percent() {
                report.merge(
                    network
                        .set_obstruction(&pipe.from, &pipe.to, pipe.obstruction)
                        .with_context(|| format!("Failed to load pipe {} -> {}", pipe.from, pipe.to))?,
                );
            }
        }

        let mut restored = false;
        for (name, tank) in &snapshot.tanks {
            if let (Some(level), Some(&idx)) = (tank.level, network.indices.get(name)) {
                network.restore_level(idx, level);
                restored = true;
            }
        }
        if restored {
            network.propagate(&mut report);
        }

        info!(
            "Loaded {} nodes and {} pipes",
            network.node_count(),
            network.pipe_count()
        );
        Ok((network, report))
    }

    /// Serialize the network, unresolved references included
    #[must_use]
    pub fn to_snapshot(&self) -> Snapshot {
        let houses = self
            .houses()
            .into_iter()
            .map(|(name, house)| (name.to_string(), HouseRecord { demand: house.demand }))
            .collect();

        let tanks = self
            .tanks()
            .into_iter()
            .map(|(name, tank)| {
                let mut connections: Vec<String> = self
                    .successors(name)
                    .unwrap_or_default()
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                connections.extend(self.dangling.iter().filter_map(|((from, to), kind)| {
                    (from == name && *kind == Unresolved::Connection).then(|| to.clone())
                }));
                connections.sort();
                let record = TankRecord {
                    capacity: tank.capacity,
                    level: Some(tank.level),
                    connections,
                };
                (name.to_string(), record)
            })
            .collect();

        let mut pipes: Vec<PipeRecord> = self
            .pipes()
            .into_iter()
            .map(|(from, to, pipe)| PipeRecord {
                from: from.to_string(),
                to: to.to_string(),
                capacity: pipe.base_capacity,
                obstruction: pipe.obstruction.percent(),
            })
            .collect();
        pipes.extend(self.dangling.iter().filter_map(|((from, to), kind)| match *kind {
            Unresolved::Pipe { capacity, obstruction } => Some(PipeRecord {
                from: from.clone(),
                to: to.clone(),
                capacity,
                obstruction,
            }),
            Unresolved::Connection => None,
        }));
        pipes.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));

        Snapshot { houses, tanks, pipes }
    }

    /// Load a network from a snapshot file; a missing file is an empty network
    pub fn load_snapshot(path: &Path) -> Result<(Self, Report)> {
        if !path.exists() {
            debug!("No snapshot at {}, starting empty", path.display());
            return Ok((Self::new(), Report::new()));
        }
        let snapshot = Snapshot::read(path)?;
        Self::from_snapshot(&snapshot)
            .with_context(|| format!("Failed to load network from {}", path.display()))
    }

    /// Save the network to a snapshot file
    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        self.to_snapshot().write(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"{
        "casas": { "H1": { "demanda": 40 }, "H2": { "demanda": 10 } },
        "tanques": { "T": { "capacidad": 100, "conexiones": ["H1"] } },
        "tuberias": [
            { "nodo1": "T", "nodo2": "H1", "capacidad_flujo": 40 },
            { "nodo1": "H1", "nodo2": "H2", "capacidad_flujo": 20, "obstruccion": 50 },
            { "nodo1": "H2", "nodo2": "X", "capacidad_flujo": 5 }
        ]
    }"#;

    fn sample() -> (Network, Report) {
        let snapshot: Snapshot = serde_json::from_str(SAMPLE).unwrap();
        Network::from_snapshot(&snapshot).unwrap()
    }

    #[test]
    fn test_load_sample() {
        let (net, report) = sample();

        assert_eq!(net.node_count(), 3);
        assert_eq!(net.pipe_count(), 2);
        assert_eq!(net.tank("T").unwrap().level, 60.0);
        assert_eq!(net.pipe("T", "H1").unwrap().flow_capacity, 40.0);

        let pipe = net.pipe("H1", "H2").unwrap();
        assert_eq!(pipe.base_capacity, 20.0);
        assert_eq!(pipe.flow_capacity, 10.0);

        assert!(report.findings.contains(&Finding::DanglingReference { from: "H2".into(), to: "X".into() }));
        assert_eq!(net.detect_dangling_references().len(), 1);
    }

    #[test]
    fn test_save_shape() {
        let (net, _) = sample();
        let json = serde_json::to_value(net.to_snapshot()).unwrap();

        assert_eq!(json["casas"]["H1"]["demanda"], 40.0);
        assert_eq!(json["tanques"]["T"]["capacidad"], 100.0);
        assert_eq!(json["tanques"]["T"]["nivel"], 60.0);
        assert_eq!(json["tanques"]["T"]["conexiones"][0], "H1");
        assert_eq!(json["tuberias"][0]["nodo1"], "H1");
        assert_eq!(json["tuberias"][0]["obstruccion"], 50);
        assert!(json["tuberias"][1].get("obstruccion").is_none());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("network.json");

        let (net, _) = sample();
        net.save_snapshot(&path).unwrap();
        let (loaded, _) = Network::load_snapshot(&path).unwrap();

        assert_eq!(loaded.to_snapshot(), net.to_snapshot());
        assert!(!dir.path().join("nested").join(".network.json.tmp").exists());
    }

    #[test]
    fn test_saved_level_restored() {
        let snapshot: Snapshot = serde_json::from_str(
            r#"{ "tanques": { "T": { "capacidad": 100, "nivel": 35, "conexiones": [] } } }"#,
        )
        .unwrap();
        let (net, _) = Network::from_snapshot(&snapshot).unwrap();
        assert_eq!(net.tank("T").unwrap().level, 35.0);

        let snapshot: Snapshot = serde_json::from_str(
            r#"{ "tanques": { "T": { "capacidad": 100, "nivel": 250 } } }"#,
        )
        .unwrap();
        let (net, _) = Network::from_snapshot(&snapshot).unwrap();
        assert_eq!(net.tank("T").unwrap().level, 100.0);
    }

    #[test]
    fn test_capacity_survives_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("network.json");

        let capacity = 14.273_760_271_021_377;
        let mut net = Network::new();
        net.add_house("B", 0.0).unwrap();
        net.add_tank("C", 0.0, &[] as &[&str]).unwrap();
        net.add_pipe("C", "B", capacity).unwrap();

        net.save_snapshot(&path).unwrap();
        let (loaded, _) = Network::load_snapshot(&path).unwrap();

        assert_eq!(loaded.pipe("C", "B").unwrap().base_capacity, capacity);
        assert_eq!(loaded.to_snapshot(), net.to_snapshot());
    }

    #[test]
    fn test_dangling_references_survive_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("network.json");

        let (mut net, _) = sample();
        net.add_tank("T2", 10.0, &["ghost"]).unwrap();
        let before = net.detect_dangling_references();
        assert_eq!(before.len(), 2);

        net.save_snapshot(&path).unwrap();
        let (loaded, report) = Network::load_snapshot(&path).unwrap();

        assert_eq!(loaded.detect_dangling_references(), before);
        assert!(report.findings.contains(&Finding::DanglingReference { from: "H2".into(), to: "X".into() }));

        let snapshot = loaded.to_snapshot();
        assert_eq!(snapshot.tanks["T2"].connections, vec!["ghost".to_string()]);
        let kept = snapshot.pipes.iter().find(|p| p.to == "X").unwrap();
        assert_eq!(kept.capacity, 5.0);
        assert_eq!(snapshot, net.to_snapshot());
    }

    #[test]
    fn test_tank_to_tank_link_reloads_cleanly() {
        let mut net = Network::new();
        net.add_tank("A", 100.0, &[] as &[&str]).unwrap();
        net.add_tank("B", 100.0, &[] as &[&str]).unwrap();
        net.add_pipe("A", "B", 30.0).unwrap();
        assert_eq!(net.to_snapshot().tanks["A"].connections, vec!["B".to_string()]);

        let (loaded, report) = Network::from_snapshot(&net.to_snapshot()).unwrap();

        assert!(!report
            .findings
            .iter()
            .any(|f| matches!(f, Finding::MissingConnection { .. })));
        assert!(loaded.detect_dangling_references().is_empty());
        assert_eq!(loaded.pipe("A", "B").unwrap().flow_capacity, 30.0);
        assert_eq!(loaded.tank("A").unwrap().level, net.tank("A").unwrap().level);
        assert_eq!(loaded.to_snapshot(), net.to_snapshot());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let (net, report) = Network::load_snapshot(&dir.path().join("absent.json")).unwrap();
        assert!(net.is_empty());
        assert!(report.is_empty());
    }

    #[test]
    fn test_name_collision_fails() {
        let snapshot: Snapshot = serde_json::from_str(
            r#"{ "casas": { "N": { "demanda": 1 } }, "tanques": { "N": { "capacidad": 5 } } }"#,
        )
        .unwrap();
        let err = Network::from_snapshot(&snapshot).unwrap_err();
        assert!(format!("{err:#}").contains("already exists"));
    }

    #[test]
    fn test_corrupt_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();

        let err = Network::load_snapshot(&path).unwrap_err();
        assert!(err.to_string().contains("bad.json"));
    }
}
