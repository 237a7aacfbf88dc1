//! # Path Walker
//!
//! The recursive next-hop follower (§4.D): given a prefix and a starting
//! device, it asks the [`Collector`] for routes, applies the §4.A
//! selection rules, annotates the hop with MPLS label operations and
//! domain crossings from the [`Inventory`], and recurses on the resolved
//! next-hop(s) — branching into concurrent siblings on ECMP.

use std::collections::HashSet;
use std::future::Future;
use std::net::IpAddr;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::collector::Collector;
use crate::error::WalkerError;
use crate::inventory::{DomainCrossing, Inventory, LabelOp};
use crate::plugin::CommunityDecoderPlugin;
use crate::route::{self, Protocol, RouteEntry, RouteEntrySummary};

/// Default recursion depth cap (§4.D).
pub const DEFAULT_MAX_HOPS: usize = 20;
/// Default cap on concurrently explored ECMP siblings per branch depth (§4.D).
pub const DEFAULT_MAX_ECMP_BRANCHES: usize = 8;

/// Why a [`TracePath`] stopped extending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Reached a connected/direct/local entry — the true origin.
    Origin,
    /// A device returned no entries for the prefix.
    Blackhole,
    /// The Collector failed to reach the device.
    Unreachable,
    /// A next-hop IP does not resolve to any known device.
    NotInInventory,
    /// The walk revisited a device already on this path.
    Loop,
    /// The path hit [`DEFAULT_MAX_HOPS`] (or the configured cap).
    MaxHops,
    /// ECMP branch-depth cap was reached before this branch point.
    EcmpDepthExceeded,
    /// The device was in the trace's excluded-node set.
    FailedNode,
}

/// Classification of where a traced prefix actually originates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginType {
    /// Terminated at a connected/direct/local entry.
    Connected,
    /// Terminated at a statically injected route.
    Static,
    /// Terminated at an eBGP edge.
    Ebgp,
    /// The terminal hop's origin could not be classified.
    Unknown,
}

/// One step in a trace: a real hop at a device, or a terminal stub
/// ("excluded", "loop", "no route", "unreachable: …", "unknown (<ip>)").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HopResult {
    /// Device this hop represents (or a synthetic name for stub hops).
    pub device: String,
    /// The device's role, echoed from the Inventory.
    pub role: String,
    /// Next-hop chosen at this device, if any.
    pub next_hop: Option<IpAddr>,
    /// Protocol of the selected entry, if this is a real hop.
    pub protocol: Option<Protocol>,
    /// Communities of the selected entry.
    #[serde(default)]
    pub communities: Vec<String>,
    /// Local preference of the selected entry.
    #[serde(default)]
    pub local_pref: Option<i64>,
    /// AS path of the selected entry.
    #[serde(default)]
    pub as_path: Vec<String>,
    /// Metric of the selected entry.
    #[serde(default)]
    pub metric: Option<i64>,
    /// Outgoing interface of the selected entry.
    #[serde(default)]
    pub interface: String,
    /// VRF the selected entry was resolved in.
    #[serde(default)]
    pub vrf: String,
    /// Per-plugin annotation maps, keyed by plugin name.
    #[serde(default)]
    pub plugin_labels: std::collections::HashMap<String, std::collections::HashMap<String, String>>,
    /// MPLS label operations applied at this device toward the next-hop.
    #[serde(default)]
    pub label_ops: Vec<LabelOp>,
    /// Role of the LSP carrying this hop's traffic, read off the first
    /// label op that carries one.
    #[serde(default)]
    pub lsp_role: Option<crate::inventory::LspRole>,
    /// Domain crossing observed at this hop, if any.
    #[serde(default)]
    pub domain_crossing: Option<DomainCrossing>,
    /// Wall-clock time the Collector call for this hop took.
    pub query_time_ms: u64,
    /// Every entry the device returned, condensed.
    #[serde(default)]
    pub all_entries: Vec<RouteEntrySummary>,
    /// Explanatory text for stub hops ("loop", "excluded", …). `None` for
    /// ordinary hops.
    #[serde(default)]
    pub note: Option<String>,
}

impl HopResult {
    fn stub(device: impl Into<String>, note: &str) -> Self {
        Self {
            device: device.into(),
            role: String::new(),
            next_hop: None,
            protocol: None,
            communities: vec![],
            local_pref: None,
            as_path: vec![],
            metric: None,
            interface: String::new(),
            vrf: String::new(),
            plugin_labels: Default::default(),
            label_ops: vec![],
            lsp_role: None,
            domain_crossing: None,
            query_time_ms: 0,
            all_entries: vec![],
            note: Some(note.to_string()),
        }
    }
}

/// One fully-formed path from the trace's start device to a terminus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracePath {
    /// Hops in visit order.
    pub hops: Vec<HopResult>,
    /// True only when `end_reason == Origin`.
    pub complete: bool,
    /// Why this path stopped.
    pub end_reason: EndReason,
}

impl TracePath {
    fn terminal(hops: Vec<HopResult>, end_reason: EndReason) -> Self {
        Self { hops, complete: false, end_reason }
    }

    fn complete(hops: Vec<HopResult>) -> Self {
        Self { hops, complete: true, end_reason: EndReason::Origin }
    }
}

/// An ECMP branch point: the parent hop's device, every next-hop observed
/// there, and the subset actually explored (capped at
/// [`DEFAULT_MAX_ECMP_BRANCHES`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcmpBranch {
    /// Device at which the branch occurred.
    pub device: String,
    /// Every next-hop observed at this device, sorted.
    pub next_hops: Vec<IpAddr>,
    /// The subset actually followed.
    pub selected: Vec<IpAddr>,
}

/// Output of [`Walker::trace`] (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceResult {
    /// The prefix that was traced.
    pub prefix: String,
    /// The device the trace started at.
    pub start_device: String,
    /// Every published path, flattened across ECMP branches.
    pub paths: Vec<TracePath>,
    /// Total wall-clock time the trace took.
    pub total_time_ms: u64,
    /// Every ECMP branch point encountered, in discovery order.
    pub ecmp_branches: Vec<EcmpBranch>,
    /// Every domain crossing observed across all paths.
    pub domain_crossings: Vec<DomainCrossing>,
    /// Classification of the traced prefix's origin.
    pub origin_type: OriginType,
    /// Device at which the origin was found, if classified.
    pub origin_router: Option<String>,
}

/// A trace's deadline. The one piece of mutable-by-time state threaded
/// through the recursion; checked at the top of every frame (§5).
#[derive(Debug, Clone, Copy)]
pub struct TraceBudget {
    deadline: Instant,
}

impl TraceBudget {
    /// Build a budget that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { deadline: Instant::now() + timeout }
    }

    fn check(&self) -> Result<(), WalkerError> {
        if Instant::now() >= self.deadline {
            Err(WalkerError::DeadlineExceeded)
        } else {
            Ok(())
        }
    }
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// The Path Walker (§4.D). Owns nothing per-trace; `trace` takes the
/// inventory snapshot and budget fresh each call so the same Walker can
/// serve concurrent traces against different inventory generations.
pub struct Walker {
    collector: Arc<dyn Collector>,
    plugins: Vec<Arc<dyn CommunityDecoderPlugin>>,
    max_hops: usize,
    max_ecmp_branches: usize,
}

impl Walker {
    /// Build a walker with the default hop and ECMP caps.
    pub fn new(collector: Arc<dyn Collector>, plugins: Vec<Arc<dyn CommunityDecoderPlugin>>) -> Self {
        Self { collector, plugins, max_hops: DEFAULT_MAX_HOPS, max_ecmp_branches: DEFAULT_MAX_ECMP_BRANCHES }
    }

    /// Override the default hop and ECMP branch caps.
    pub fn with_limits(mut self, max_hops: usize, max_ecmp_branches: usize) -> Self {
        self.max_hops = max_hops;
        self.max_ecmp_branches = max_ecmp_branches;
        self
    }

    /// Trace `prefix` starting at `start_device` in `vrf`, excluding
    /// `excluded_nodes` (used by the failure simulator), subject to
    /// `budget`.
    pub async fn trace(
        &self,
        inventory: Arc<Inventory>,
        prefix: &str,
        start_device: &str,
        vrf: &str,
        excluded_nodes: HashSet<String>,
        budget: TraceBudget,
    ) -> Result<TraceResult, WalkerError> {
        let start = Instant::now();
        let ecmp_branches = Arc::new(Mutex::new(Vec::new()));
        let domain_crossings = Arc::new(Mutex::new(Vec::new()));

        let paths = walk_hop(
            self.collector.clone(),
            self.plugins.clone(),
            inventory,
            prefix.to_string(),
            vrf.to_string(),
            Arc::new(excluded_nodes),
            start_device.to_string(),
            Arc::new(HashSet::new()),
            Vec::new(),
            0,
            self.max_hops,
            self.max_ecmp_branches,
            ecmp_branches.clone(),
            domain_crossings.clone(),
            budget,
        )
        .await?;

        let (origin_type, origin_router) = classify_origin(&paths);

        Ok(TraceResult {
            prefix: prefix.to_string(),
            start_device: start_device.to_string(),
            paths,
            total_time_ms: start.elapsed().as_millis() as u64,
            ecmp_branches: Arc::try_unwrap(ecmp_branches).map(|m| m.into_inner().unwrap()).unwrap_or_default(),
            domain_crossings: Arc::try_unwrap(domain_crossings).map(|m| m.into_inner().unwrap()).unwrap_or_default(),
            origin_type,
            origin_router,
        })
    }
}

/// Origin classification over every published path's terminal hop (§4.D).
/// Multiple paths may in principle disagree; the walker reports the first
/// published path's classification, since that is the path the caller
/// reads first and the common case (a single terminus) makes the choice
/// moot.
fn classify_origin(paths: &[TracePath]) -> (OriginType, Option<String>) {
    let Some(first) = paths.first() else {
        return (OriginType::Unknown, None);
    };
    let Some(terminal) = first.hops.last() else {
        return (OriginType::Unknown, None);
    };

    if first.end_reason == EndReason::Origin {
        return (OriginType::Connected, Some(terminal.device.clone()));
    }
    match terminal.protocol {
        Some(Protocol::Static) => (OriginType::Static, Some(terminal.device.clone())),
        Some(Protocol::Bgp) => (OriginType::Ebgp, Some(terminal.device.clone())),
        _ => (OriginType::Unknown, None),
    }
}

fn decode_plugins(
    plugins: &[Arc<dyn CommunityDecoderPlugin>],
    entry: &RouteEntry,
) -> std::collections::HashMap<String, std::collections::HashMap<String, String>> {
    let mut labels = std::collections::HashMap::new();
    for plugin in plugins {
        let decoded = plugin.decode(&entry.communities, entry.local_pref);
        if !decoded.is_empty() {
            labels.insert(plugin.name().to_string(), decoded);
        }
    }
    labels
}

#[allow(clippy::too_many_arguments)]
fn walk_hop(
    collector: Arc<dyn Collector>,
    plugins: Vec<Arc<dyn CommunityDecoderPlugin>>,
    inventory: Arc<Inventory>,
    prefix: String,
    vrf: String,
    excluded_nodes: Arc<HashSet<String>>,
    device: String,
    visited: Arc<HashSet<String>>,
    mut hops: Vec<HopResult>,
    branch_depth: usize,
    max_hops: usize,
    max_ecmp_branches: usize,
    ecmp_branches: Arc<Mutex<Vec<EcmpBranch>>>,
    domain_crossings: Arc<Mutex<Vec<DomainCrossing>>>,
    budget: TraceBudget,
) -> BoxFuture<Result<Vec<TracePath>, WalkerError>> {
    Box::pin(async move {
        budget.check()?;

        // Step 1: excluded node.
        if excluded_nodes.contains(&device) {
            hops.push(HopResult::stub(device.clone(), "excluded"));
            return Ok(vec![TracePath::terminal(hops, EndReason::FailedNode)]);
        }

        // Step 2: loop.
        if visited.contains(&device) {
            hops.push(HopResult::stub(device.clone(), "loop"));
            return Ok(vec![TracePath::terminal(hops, EndReason::Loop)]);
        }

        // Step 3: hop cap.
        if hops.len() >= max_hops {
            return Ok(vec![TracePath::terminal(hops, EndReason::MaxHops)]);
        }

        // Step 4: extend the visited set for this branch only.
        let mut next_visited = (*visited).clone();
        next_visited.insert(device.clone());
        let next_visited = Arc::new(next_visited);

        // Step 5: collect.
        let query_start = Instant::now();
        let entries = match collector.collect(&device, &prefix, &vrf).await {
            Ok(entries) => entries,
            Err(err) => {
                hops.push(HopResult::stub(device.clone(), &format!("unreachable: {err}")));
                return Ok(vec![TracePath::terminal(hops, EndReason::Unreachable)]);
            }
        };
        let query_time_ms = query_start.elapsed().as_millis() as u64;

        // Step 6: blackhole.
        if entries.is_empty() {
            hops.push(HopResult::stub(device.clone(), "no route"));
            return Ok(vec![TracePath::terminal(hops, EndReason::Blackhole)]);
        }

        // Step 7: selection.
        let is_firewall = inventory.is_firewall(&device);
        let selection = match route::select(&entries, is_firewall) {
            Some(s) => s,
            None => {
                hops.push(HopResult::stub(device.clone(), "no route"));
                return Ok(vec![TracePath::terminal(hops, EndReason::Blackhole)]);
            }
        };

        let role = inventory.get_device(&device).map(|d| d.role.clone()).unwrap_or_default();
        let all_entries: Vec<RouteEntrySummary> = entries.iter().map(RouteEntry::summary).collect();
        let plugin_labels = decode_plugins(&plugins, selection.best);

        if selection.best.protocol.is_origin() {
            if selection.best.next_hop.is_some() {
                return Err(WalkerError::MalformedOriginEntry { device, prefix });
            }
            let hop = HopResult {
                device: device.clone(),
                role,
                next_hop: None,
                protocol: Some(selection.best.protocol),
                communities: selection.best.communities.clone(),
                local_pref: selection.best.local_pref,
                as_path: selection.best.as_path.clone(),
                metric: selection.best.metric,
                interface: selection.best.interface.clone(),
                vrf: selection.best.vrf.clone(),
                plugin_labels,
                label_ops: vec![],
                lsp_role: None,
                domain_crossing: None,
                query_time_ms,
                all_entries,
                note: None,
            };
            hops.push(hop);
            return Ok(vec![TracePath::complete(hops)]);
        }

        // Step 8/9: build the real hop, label-ops, domain crossing.
        let route_type = if selection.best.protocol == Protocol::Policy { "policy" } else { "static" };
        let label_ops = selection
            .best
            .next_hop
            .map(|nh| inventory.get_label_ops(&device, nh))
            .unwrap_or_default();
        let crossing = selection
            .best
            .next_hop
            .and_then(|nh| inventory.get_domain_crossing(&device, nh))
            .map(|mut c| {
                c.route_type = route_type.to_string();
                c
            });
        let lsp_role = label_ops.iter().find_map(|op| op.lsp_role);

        let hop = HopResult {
            device: device.clone(),
            role,
            next_hop: selection.best.next_hop,
            protocol: Some(selection.best.protocol),
            communities: selection.best.communities.clone(),
            local_pref: selection.best.local_pref,
            as_path: selection.best.as_path.clone(),
            metric: selection.best.metric,
            interface: selection.best.interface.clone(),
            vrf: selection.best.vrf.clone(),
            plugin_labels,
            label_ops,
            lsp_role,
            domain_crossing: crossing.clone(),
            query_time_ms,
            all_entries,
            note: None,
        };
        hops.push(hop);

        if let Some(c) = crossing {
            domain_crossings.lock().unwrap().push(c);
        }

        // Step 10/11: ECMP next-hop set.
        let next_hops = route::ecmp_next_hops(&selection);
        if next_hops.is_empty() {
            return Ok(vec![TracePath::terminal(hops, EndReason::Blackhole)]);
        }

        // Step 12: single next-hop, recurse serially.
        if next_hops.len() == 1 {
            let nh = next_hops[0];
            return match inventory.resolve_ip(nh) {
                Some(next_device) => {
                    walk_hop(
                        collector,
                        plugins,
                        inventory,
                        prefix,
                        vrf,
                        excluded_nodes,
                        next_device.to_string(),
                        next_visited,
                        hops,
                        branch_depth,
                        max_hops,
                        max_ecmp_branches,
                        ecmp_branches,
                        domain_crossings,
                        budget,
                    )
                    .await
                }
                None => {
                    hops.push(HopResult::stub(format!("unknown ({nh})"), "unknown"));
                    Ok(vec![TracePath::terminal(hops, EndReason::NotInInventory)])
                }
            };
        }

        // Step 13: ECMP branch.
        if branch_depth >= max_ecmp_branches {
            return Ok(vec![TracePath::terminal(hops, EndReason::EcmpDepthExceeded)]);
        }

        let selected: Vec<IpAddr> = next_hops.iter().take(max_ecmp_branches).copied().collect();
        ecmp_branches.lock().unwrap().push(EcmpBranch {
            device: device.clone(),
            next_hops: next_hops.clone(),
            selected: selected.clone(),
        });

        let mut join_set: JoinSet<Result<Vec<TracePath>, WalkerError>> = JoinSet::new();
        for nh in selected {
            match inventory.resolve_ip(nh) {
                Some(next_device) => {
                    let fut = walk_hop(
                        collector.clone(),
                        plugins.clone(),
                        inventory.clone(),
                        prefix.clone(),
                        vrf.clone(),
                        excluded_nodes.clone(),
                        next_device.to_string(),
                        next_visited.clone(),
                        hops.clone(),
                        branch_depth + 1,
                        max_hops,
                        max_ecmp_branches,
                        ecmp_branches.clone(),
                        domain_crossings.clone(),
                        budget,
                    );
                    join_set.spawn(fut);
                }
                None => {
                    let mut branch_hops = hops.clone();
                    branch_hops.push(HopResult::stub(format!("unknown ({nh})"), "unknown"));
                    join_set.spawn(async move { Ok(vec![TracePath::terminal(branch_hops, EndReason::NotInInventory)]) });
                }
            }
        }

        let mut results = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            let branch_paths = joined.map_err(|_| WalkerError::DeadlineExceeded)??;
            results.extend(branch_paths);
        }
        Ok(results)
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::collector::test_support::MapCollector;
    use crate::inventory::{Device, Inventory};
    use crate::route::{Protocol, RouteEntry};
    use std::collections::HashMap as Map;

    fn entry(protocol: Protocol, next_hop: Option<&str>, active: bool) -> RouteEntry {
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
            active,
            paths: vec![],
            source: String::new(),
            inactive_reason: String::new(),
        }
    }

    fn device(hostname: &str, role: &str, ip: &str) -> Device {
        Device {
            hostname: hostname.to_string(),
            role: role.to_string(),
            domain: "dc".to_string(),
            management_ip: Some(ip.parse().unwrap()),
            loopbacks: vec![],
            interfaces: Map::new(),
            mpls: Map::new(),
        }
    }

    #[tokio::test]
    async fn linear_four_hop_trace_terminates_at_origin() {
        let collector = Arc::new(MapCollector::new());
        collector.insert("A", "10.0.0.0/24", "", vec![entry(Protocol::Bgp, Some("10.2.0.1"), true)]);
        collector.insert("B", "10.0.0.0/24", "", vec![entry(Protocol::Bgp, Some("10.3.0.1"), true)]);
        collector.insert("C", "10.0.0.0/24", "", vec![entry(Protocol::Bgp, Some("10.4.0.1"), true)]);
        collector.insert("D", "10.0.0.0/24", "", vec![entry(Protocol::Connected, None, true)]);

        let inventory = Arc::new(
            Inventory::new(
                vec![
                    device("A", "edge", "10.1.0.1"),
                    device("B", "core", "10.2.0.1"),
                    device("C", "pe", "10.3.0.1"),
                    device("D", "pe", "10.4.0.1"),
                ],
                vec![],
            )
            .unwrap(),
        );

        let walker = Walker::new(collector, vec![]);
        let result = walker
            .trace(inventory, "10.0.0.0/24", "A", "", HashSet::new(), TraceBudget::with_timeout(Duration::from_secs(5)))
            .await
            .unwrap();

        assert_eq!(result.paths.len(), 1);
        let path = &result.paths[0];
        assert_eq!(path.hops.len(), 4);
        assert_eq!(path.end_reason, EndReason::Origin);
        assert!(path.complete);
        assert_eq!(result.origin_type, OriginType::Connected);
        assert_eq!(result.origin_router.as_deref(), Some("D"));
    }

    #[tokio::test]
    async fn ecmp_split_produces_two_paths_and_one_branch_record() {
        let collector = Arc::new(MapCollector::new());
        let mut best = entry(Protocol::Bgp, Some("10.2.0.1"), true);
        best.paths.push(entry(Protocol::Bgp, Some("10.3.0.1"), true));
        collector.insert("A", "10.0.0.0/24", "", vec![best]);
        collector.insert("B", "10.0.0.0/24", "", vec![entry(Protocol::Connected, None, true)]);
        collector.insert("C", "10.0.0.0/24", "", vec![entry(Protocol::Connected, None, true)]);

        let inventory = Arc::new(
            Inventory::new(
                vec![device("A", "edge", "10.1.0.1"), device("B", "core", "10.2.0.1"), device("C", "core", "10.3.0.1")],
                vec![],
            )
            .unwrap(),
        );

        let walker = Walker::new(collector, vec![]);
        let result = walker
            .trace(inventory, "10.0.0.0/24", "A", "", HashSet::new(), TraceBudget::with_timeout(Duration::from_secs(5)))
            .await
            .unwrap();

        assert_eq!(result.paths.len(), 2);
        assert!(result.paths.iter().all(|p| p.end_reason == EndReason::Origin));
        assert_eq!(result.ecmp_branches.len(), 1);
        let branch = &result.ecmp_branches[0];
        assert_eq!(
            branch.next_hops,
            vec!["10.2.0.1".parse::<IpAddr>().unwrap(), "10.3.0.1".parse().unwrap()]
        );
    }

    #[tokio::test]
    async fn loop_is_detected_and_stubbed() {
        let collector = Arc::new(MapCollector::new());
        collector.insert("A", "10.0.0.0/24", "", vec![entry(Protocol::Bgp, Some("10.2.0.1"), true)]);
        collector.insert("B", "10.0.0.0/24", "", vec![entry(Protocol::Bgp, Some("10.1.0.1"), true)]);

        let inventory = Arc::new(
            Inventory::new(vec![device("A", "edge", "10.1.0.1"), device("B", "core", "10.2.0.1")], vec![]).unwrap(),
        );

        let walker = Walker::new(collector, vec![]);
        let result = walker
            .trace(inventory, "10.0.0.0/24", "A", "", HashSet::new(), TraceBudget::with_timeout(Duration::from_secs(5)))
            .await
            .unwrap();

        assert_eq!(result.paths.len(), 1);
        let path = &result.paths[0];
        assert_eq!(path.end_reason, EndReason::Loop);
        assert_eq!(path.hops.len(), 3);
        assert_eq!(path.hops.last().unwrap().note.as_deref(), Some("loop"));
    }

    #[tokio::test]
    async fn no_routes_at_start_is_a_single_blackhole_hop() {
        let collector = Arc::new(MapCollector::new());
        let inventory = Arc::new(Inventory::new(vec![device("A", "edge", "10.1.0.1")], vec![]).unwrap());

        let walker = Walker::new(collector, vec![]);
        let result = walker
            .trace(inventory, "10.0.0.0/24", "A", "", HashSet::new(), TraceBudget::with_timeout(Duration::from_secs(5)))
            .await
            .unwrap();

        assert_eq!(result.paths.len(), 1);
        let path = &result.paths[0];
        assert_eq!(path.end_reason, EndReason::Blackhole);
        assert_eq!(path.hops.len(), 1);
        assert!(!path.complete);
    }

    #[tokio::test]
    async fn unknown_next_hop_yields_not_in_inventory_stub() {
        let collector = Arc::new(MapCollector::new());
        collector.insert("A", "10.0.0.0/24", "", vec![entry(Protocol::Bgp, Some("99.99.99.99"), true)]);
        let inventory = Arc::new(Inventory::new(vec![device("A", "edge", "10.1.0.1")], vec![]).unwrap());

        let walker = Walker::new(collector, vec![]);
        let result = walker
            .trace(inventory, "10.0.0.0/24", "A", "", HashSet::new(), TraceBudget::with_timeout(Duration::from_secs(5)))
            .await
            .unwrap();

        assert_eq!(result.paths.len(), 1);
        let path = &result.paths[0];
        assert_eq!(path.end_reason, EndReason::NotInInventory);
        assert_eq!(path.hops.len(), 2);
        assert_eq!(path.hops[1].device, "unknown (99.99.99.99)");
    }

    #[tokio::test]
    async fn unreachable_collector_call_is_recorded_as_a_stub() {
        let collector = Arc::new(MapCollector::new());
        collector.mark_unreachable("A");
        let inventory = Arc::new(Inventory::new(vec![device("A", "edge", "10.1.0.1")], vec![]).unwrap());

        let walker = Walker::new(collector, vec![]);
        let result = walker
            .trace(inventory, "10.0.0.0/24", "A", "", HashSet::new(), TraceBudget::with_timeout(Duration::from_secs(5)))
            .await
            .unwrap();

        assert_eq!(result.paths[0].end_reason, EndReason::Unreachable);
    }

    #[tokio::test]
    async fn firewall_restricts_to_static_and_policy_and_tags_crossing() {
        let collector = Arc::new(MapCollector::new());
        collector.insert(
            "FW1",
            "10.0.0.0/24",
            "",
            vec![entry(Protocol::Bgp, Some("10.9.9.9"), true), entry(Protocol::Static, Some("10.2.0.1"), true)],
        );
        collector.insert("B", "10.0.0.0/24", "", vec![entry(Protocol::Connected, None, true)]);

        let mut fw = device("FW1", "t2-firewall", "10.1.0.1");
        fw.domain = "backbone".to_string();
        let mut b = device("B", "pe", "10.2.0.1");
        b.domain = "dc".to_string();

        let inventory = Arc::new(Inventory::new(vec![fw, b], vec![]).unwrap());

        let walker = Walker::new(collector, vec![]);
        let result = walker
            .trace(inventory, "10.0.0.0/24", "FW1", "", HashSet::new(), TraceBudget::with_timeout(Duration::from_secs(5)))
            .await
            .unwrap();

        let path = &result.paths[0];
        assert_eq!(path.hops[0].protocol, Some(Protocol::Static));
        assert!(path.hops[0].domain_crossing.is_some());
        assert_eq!(result.domain_crossings.len(), 1);
    }
}
