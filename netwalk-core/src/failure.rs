//! # Failure Simulator
//!
//! Runs a baseline trace and a trace with one node excluded, then diffs
//! the two to describe how (or whether) the path fails over (§4.F).

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::WalkerError;
use crate::inventory::Inventory;
use crate::walker::{TraceBudget, TraceResult, Walker};

/// Result of simulating the failure of one device on a traced path (§4.F).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureSimResult {
    /// Trace with no exclusions.
    pub baseline: TraceResult,
    /// Trace with `failed_node` excluded.
    pub failover: TraceResult,
    /// Devices present in the baseline's first path but absent from the
    /// failover's first path.
    pub affected_hops: Vec<String>,
    /// Human-readable impact summary.
    pub impact_summary: String,
}

/// `SimulateFailure(source, destination, failed_node, vrf) → Failure-Sim-Result` (§4.F).
pub async fn simulate_failure(
    walker: &Walker,
    inventory: Arc<Inventory>,
    source: &str,
    destination: &str,
    failed_node: &str,
    vrf: &str,
    budget: TraceBudget,
) -> Result<FailureSimResult, WalkerError> {
    let baseline = walker
        .trace(inventory.clone(), destination, source, vrf, HashSet::new(), budget)
        .await?;

    let mut excluded = HashSet::new();
    excluded.insert(failed_node.to_string());
    let failover = walker.trace(inventory, destination, source, vrf, excluded, budget).await?;

    let baseline_devices: HashSet<&str> = baseline
        .paths
        .first()
        .map(|p| p.hops.iter().map(|h| h.device.as_str()).collect())
        .unwrap_or_default();
    let failover_devices: HashSet<&str> = failover
        .paths
        .first()
        .map(|p| p.hops.iter().map(|h| h.device.as_str()).collect())
        .unwrap_or_default();

    let mut affected_hops: Vec<String> =
        baseline_devices.difference(&failover_devices).map(|s| s.to_string()).collect();
    affected_hops.sort();

    let failover_completed = failover.paths.first().map(|p| p.complete).unwrap_or(false);

    let impact_summary = if failover_completed {
        format!("failover succeeded around {failed_node}")
    } else if affected_hops.is_empty() {
        "no failover path".to_string()
    } else {
        format!("failover degraded after removing {failed_node}")
    };

    Ok(FailureSimResult { baseline, failover, affected_hops, impact_summary })
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
    async fn failure_of_node_not_on_path_produces_identical_failover() {
        let collector = Arc::new(MapCollector::new());
        collector.insert("A", "X", "", vec![entry(Protocol::Bgp, Some("10.2.0.1"))]);
        collector.insert("B", "X", "", vec![entry(Protocol::Connected, None)]);

        let inventory = Arc::new(
            Inventory::new(vec![device("A", "10.1.0.1"), device("B", "10.2.0.1"), device("C", "10.3.0.1")], vec![])
                .unwrap(),
        );
        let walker = Walker::new(collector, vec![]);

        let result = simulate_failure(
            &walker,
            inventory,
            "A",
            "X",
            "C",
            "",
            TraceBudget::with_timeout(Duration::from_secs(5)),
        )
        .await
        .unwrap();

        assert!(result.affected_hops.is_empty());
        assert_eq!(result.baseline.paths[0].hops.len(), result.failover.paths[0].hops.len());
    }
}
