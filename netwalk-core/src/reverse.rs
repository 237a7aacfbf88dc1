//! # Reverse and Asymmetry
//!
//! Runs a trace in both directions and reports where the device sequences
//! diverge (§4.E). Built entirely on top of [`Walker::trace`]; holds no
//! state of its own.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::WalkerError;
use crate::inventory::Inventory;
use crate::walker::{TraceBudget, TraceResult, Walker};

/// Result of comparing a forward and reverse trace for the same
/// source/destination pair (§4.E).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsymmetryResult {
    /// The forward trace, destination-bound from the source.
    pub forward: TraceResult,
    /// The reverse trace, source-bound from the destination.
    pub reverse: TraceResult,
    /// Hop indices (aligned after reversing the reverse path) where the two
    /// device sequences disagree.
    pub divergence_points: Vec<usize>,
    /// True iff `divergence_points` is empty.
    pub symmetric: bool,
}

/// `TraceReverse(destination, source, vrf) → Asymmetry-Result` (§4.E).
///
/// Runs `Trace(destination, source)` as forward and `Trace(source,
/// destination)` as reverse, taking each trace's first published path,
/// reversing the reverse path's device sequence, and diffing index by
/// index.
pub async fn trace_reverse(
    walker: &Walker,
    inventory: Arc<Inventory>,
    destination: &str,
    source: &str,
    vrf: &str,
    budget: TraceBudget,
) -> Result<AsymmetryResult, WalkerError> {
    let forward = walker
        .trace(inventory.clone(), destination, source, vrf, HashSet::new(), budget)
        .await?;
    let reverse = walker
        .trace(inventory, source, destination, vrf, HashSet::new(), budget)
        .await?;

    let forward_devices: Vec<&str> =
        forward.paths.first().map(|p| p.hops.iter().map(|h| h.device.as_str()).collect()).unwrap_or_default();
    let mut reverse_devices: Vec<&str> =
        reverse.paths.first().map(|p| p.hops.iter().map(|h| h.device.as_str()).collect()).unwrap_or_default();
    reverse_devices.reverse();

    let mut divergence_points = Vec::new();
    let common_len = forward_devices.len().min(reverse_devices.len());
    for i in 0..common_len {
        if forward_devices[i] != reverse_devices[i] {
            divergence_points.push(i);
        }
    }
    if forward_devices.len() != reverse_devices.len() {
        divergence_points.push(common_len.min(forward_devices.len().min(reverse_devices.len())));
    }

    let symmetric = divergence_points.is_empty();

    Ok(AsymmetryResult { forward, reverse, divergence_points, symmetric })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::collector::test_support::MapCollector;
    use crate::inventory::Device;
    use crate::route::{Protocol, RouteEntry};
    use std::collections::HashMap;
    use std::time::Duration;

    fn entry(protocol: Protocol, next_hop: Option<&str>) -> RouteEntry {
        RouteEntry {
            prefix: "10.0.0.0/24".parse().unwrap(),
            protocol,
            next_hop: next_hop.map(|s| s.parse().unwrap()),
            interface: String::new(),
            vrf: String::new(),
            communities: vec![],
            local_pref: None,
            metric: None,
            as_path: vec![],
            peer_as: None,
            active: true,
            paths: vec![],
            source: String::new(),
            inactive_reason: String::new(),
        }
    }

    fn device(hostname: &str, ip: &str) -> Device {
        Device {
            hostname: hostname.to_string(),
            role: "pe".to_string(),
            domain: "dc".to_string(),
            management_ip: Some(ip.parse().unwrap()),
            loopbacks: vec![],
            interfaces: HashMap::new(),
            mpls: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn symmetric_network_has_no_divergence() {
        let collector = Arc::new(MapCollector::new());
        // Forward: trace(prefix="B", start="A") -> A points at B, B is the origin.
        collector.insert("A", "B", "", vec![entry(Protocol::Bgp, Some("10.2.0.1"))]);
        collector.insert("B", "B", "", vec![entry(Protocol::Connected, None)]);
        // Reverse: trace(prefix="A", start="B") -> B points at A, A is the origin.
        collector.insert("B", "A", "", vec![entry(Protocol::Bgp, Some("10.1.0.1"))]);
        collector.insert("A", "A", "", vec![entry(Protocol::Connected, None)]);

        let inventory = Arc::new(Inventory::new(vec![device("A", "10.1.0.1"), device("B", "10.2.0.1")], vec![]).unwrap());
        let walker = Walker::new(collector, vec![]);

        let result = trace_reverse(
            &walker,
            inventory,
            "B",
            "A",
            "",
            TraceBudget::with_timeout(Duration::from_secs(5)),
        )
        .await
        .unwrap();

        assert!(result.symmetric);
        assert!(result.divergence_points.is_empty());
    }
}
