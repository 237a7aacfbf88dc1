//! # Blast-Radius Engine
//!
//! All-pairs simple-path analysis over the inventory's interface-peer
//! graph (§4.G, §9). Unlike the walker, this module does hold a graph: an
//! undirected `petgraph` graph keyed by device name, built once from the
//! Inventory's IP-index the same way [`crate::inventory::Inventory::peer_edges`]
//! derives adjacency.

use std::collections::{HashMap, VecDeque};

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::error::BlastRadiusError;
use crate::inventory::Inventory;

const SIMPLE_PATH_HOP_CUTOFF: usize = 15;
const MAX_RETAINED_PATHS: usize = 51;
const DENSE_PAIR_THRESHOLD: usize = 50;

/// Whether a source/destination pair survives a node failure with an
/// alternate path, or loses connectivity entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairStatus {
    /// A shortest path excluding the failed node still exists.
    Rerouted,
    /// No path excluding the failed node exists.
    Isolated,
}

/// One source/destination pair whose forwarding transits the failed node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffectedPair {
    /// Source device.
    pub source: String,
    /// Destination device.
    pub destination: String,
    /// Rerouted or isolated.
    pub status: PairStatus,
    /// The first simple path (in enumeration order) that traversed the
    /// failed node.
    pub original_path: Vec<String>,
    /// The shortest path excluding the failed node, if one exists.
    pub alternate_path: Vec<String>,
}

/// Output of [`calculate`] (§4.G).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlastRadiusResult {
    /// The device whose failure was simulated.
    pub failed_node: String,
    /// Pairs that lose all connectivity.
    pub isolated: Vec<AffectedPair>,
    /// Pairs that reroute onto an alternate path.
    pub rerouted: Vec<AffectedPair>,
    /// Devices untouched by the failure (neither a source nor destination
    /// of an affected pair, and not the failed node itself).
    pub unaffected_node_count: usize,
    /// Pairs skipped because they had more than 50 simple paths (§4.G).
    pub skipped_pairs: usize,
    /// Human-readable summary.
    pub summary: String,
}

/// The interface-peer graph the Blast-Radius engine analyzes, built once
/// from the Inventory and reused across calculations.
pub struct InventoryGraph {
    graph: UnGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
}

impl InventoryGraph {
    /// Build the graph from an inventory's device set and peer edges.
    pub fn from_inventory(inventory: &Inventory) -> Self {
        let mut graph = UnGraph::new_undirected();
        let mut index = HashMap::new();

        for hostname in inventory.hostnames() {
            let idx = graph.add_node(hostname.to_string());
            index.insert(hostname.to_string(), idx);
        }
        for (a, b) in inventory.peer_edges() {
            if let (Some(&ia), Some(&ib)) = (index.get(&a), index.get(&b)) {
                graph.update_edge(ia, ib, ());
            }
        }

        Self { graph, index }
    }

    /// Number of devices (nodes) in the graph.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }
}

/// `Calculate(failed_node) → Blast-Radius-Result` (§4.G).
pub fn calculate(topology: &InventoryGraph, failed_node: &str) -> Result<BlastRadiusResult, BlastRadiusError> {
    let failed_idx = *topology
        .index
        .get(failed_node)
        .ok_or_else(|| BlastRadiusError::InvalidNode(failed_node.to_string()))?;

    let nodes: Vec<(&String, NodeIndex)> =
        topology.index.iter().filter(|(_, &idx)| idx != failed_idx).map(|(name, idx)| (name, *idx)).collect();

    let mut isolated = Vec::new();
    let mut rerouted = Vec::new();
    let mut skipped_pairs = 0usize;
    let mut touched: std::collections::HashSet<String> = std::collections::HashSet::new();

    for &(src_name, src_idx) in &nodes {
        for &(dst_name, dst_idx) in &nodes {
            if src_idx == dst_idx {
                continue;
            }

            let paths: Vec<Vec<NodeIndex>> = petgraph::algo::all_simple_paths::<Vec<_>, _>(
                &topology.graph,
                src_idx,
                dst_idx,
                0,
                Some(SIMPLE_PATH_HOP_CUTOFF - 1),
            )
            .take(MAX_RETAINED_PATHS)
            .collect();

            if paths.len() > DENSE_PAIR_THRESHOLD {
                skipped_pairs += 1;
                continue;
            }

            let Some(original) = paths.iter().find(|p| p.contains(&failed_idx)) else {
                continue;
            };

            let original_path = resolve_path(&topology.graph, original);
            let alternate = shortest_path_excluding(&topology.graph, src_idx, dst_idx, failed_idx);

            touched.insert(src_name.clone());
            touched.insert(dst_name.clone());

            match alternate {
                Some(alt) => rerouted.push(AffectedPair {
                    source: src_name.clone(),
                    destination: dst_name.clone(),
                    status: PairStatus::Rerouted,
                    original_path,
                    alternate_path: resolve_path(&topology.graph, &alt),
                }),
                None => isolated.push(AffectedPair {
                    source: src_name.clone(),
                    destination: dst_name.clone(),
                    status: PairStatus::Isolated,
                    original_path,
                    alternate_path: vec![],
                }),
            }
        }
    }

    let unaffected_node_count = nodes.len().saturating_sub(touched.len());

    let mut summary = format!(
        "Failing {} breaks {} path(s) with no alternate and reroutes {} path(s).",
        failed_node,
        isolated.len(),
        rerouted.len()
    );
    if skipped_pairs > 0 {
        summary.push_str(&format!(" Skipped {skipped_pairs} dense pair(s) with >50 simple paths."));
    }

    Ok(BlastRadiusResult { failed_node: failed_node.to_string(), isolated, rerouted, unaffected_node_count, skipped_pairs, summary })
}

fn resolve_path(graph: &UnGraph<String, ()>, path: &[NodeIndex]) -> Vec<String> {
    path.iter().map(|&idx| graph[idx].clone()).collect()
}

/// BFS shortest path from `from` to `to`, never visiting `excluded`.
fn shortest_path_excluding(
    graph: &UnGraph<String, ()>,
    from: NodeIndex,
    to: NodeIndex,
    excluded: NodeIndex,
) -> Option<Vec<NodeIndex>> {
    if from == excluded || to == excluded {
        return None;
    }

    let mut parents: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut visited = std::collections::HashSet::new();
    let mut queue = VecDeque::new();
    visited.insert(from);
    queue.push_back(from);

    while let Some(current) = queue.pop_front() {
        if current == to {
            let mut path = vec![to];
            let mut cursor = to;
            while let Some(&parent) = parents.get(&cursor) {
                path.push(parent);
                cursor = parent;
            }
            path.reverse();
            return Some(path);
        }
        for edge in graph.edges(current) {
            let neighbor = if edge.source() == current { edge.target() } else { edge.source() };
            if neighbor == excluded || visited.contains(&neighbor) {
                continue;
            }
            visited.insert(neighbor);
            parents.insert(neighbor, current);
            queue.push_back(neighbor);
        }
    }

    None
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::inventory::Device;
    use std::collections::HashMap as Map;

    fn device_with_peers(hostname: &str, ip: &str, peer_ips: &[&str]) -> Device {
        let mut interfaces = Map::new();
        for (i, peer_ip) in peer_ips.iter().enumerate() {
            interfaces.insert(format!("eth{i}"), peer_ip.parse().unwrap());
        }
        Device {
            hostname: hostname.to_string(),
            role: "pe".to_string(),
            domain: "dc".to_string(),
            management_ip: Some(ip.parse().unwrap()),
            loopbacks: vec![],
            interfaces,
            mpls: Map::new(),
        }
    }

    /// Builds the bridge graph from §8 scenario 5: A-B, B-C, C-D, A-E, E-D, B-F (leaf).
    fn bridge_inventory() -> Inventory {
        let a = device_with_peers("A", "10.0.0.1", &["10.0.0.2", "10.0.0.5"]);
        let b = device_with_peers("B", "10.0.0.2", &["10.0.0.1", "10.0.0.3", "10.0.0.6"]);
        let c = device_with_peers("C", "10.0.0.3", &["10.0.0.2", "10.0.0.4"]);
        let d = device_with_peers("D", "10.0.0.4", &["10.0.0.3", "10.0.0.5"]);
        let e = device_with_peers("E", "10.0.0.5", &["10.0.0.1", "10.0.0.4"]);
        let f = device_with_peers("F", "10.0.0.6", &["10.0.0.2"]);
        Inventory::new(vec![a, b, c, d, e, f], vec![]).unwrap()
    }

    #[test]
    fn failing_bridge_node_reroutes_and_isolates() {
        let inventory = bridge_inventory();
        let topology = InventoryGraph::from_inventory(&inventory);
        let result = calculate(&topology, "B").unwrap();

        assert!(result.rerouted.iter().any(|p| p.source == "A" && p.destination == "D"));
        assert!(result.isolated.iter().any(|p| p.source == "A" && p.destination == "F"));
    }

    #[test]
    fn failing_leaf_node_affects_nothing() {
        let inventory = bridge_inventory();
        let topology = InventoryGraph::from_inventory(&inventory);
        let result = calculate(&topology, "F").unwrap();

        assert!(result.isolated.is_empty());
        assert!(result.rerouted.is_empty());
    }

    #[test]
    fn invalid_node_is_rejected() {
        let inventory = bridge_inventory();
        let topology = InventoryGraph::from_inventory(&inventory);
        let err = calculate(&topology, "not-a-device").unwrap_err();
        assert!(matches!(err, BlastRadiusError::InvalidNode(_)));
    }
}
