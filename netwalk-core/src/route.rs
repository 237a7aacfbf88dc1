//! # Route-Entry Model
//!
//! A [`RouteEntry`] is the normalized, per-device, per-query view of a single
//! routing-table entry that a [`crate::collector::Collector`] hands back to
//! the walker. This module also holds the selection rules of §4.A: which
//! entries the walker trusts at a firewall, which one is "best", and how the
//! ECMP next-hop set is assembled.

use std::net::IpAddr;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

/// The protocol that installed a [`RouteEntry`].
///
/// Closed on purpose: §3 enumerates exactly these eight values, and an
/// adapter that reports something else has a bug worth surfacing rather than
/// hiding behind a catch-all variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// BGP-learned route.
    Bgp,
    /// Statically configured route.
    Static,
    /// Directly connected subnet.
    Connected,
    /// Vendor-specific alias for a directly attached route.
    Direct,
    /// Locally originated (loopback, etc).
    Local,
    /// Installed by policy-based routing (firewalls, PBR).
    Policy,
    /// OSPF-learned route.
    Ospf,
    /// IS-IS-learned route.
    Isis,
}

impl Protocol {
    /// True for the three protocols that mean "originates here" per §3's
    /// Route-Entry invariant.
    pub fn is_origin(self) -> bool {
        matches!(self, Protocol::Connected | Protocol::Direct | Protocol::Local)
    }
}

/// A single entry a device returns for a prefix (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEntry {
    /// The prefix this entry was returned for, as the device reported it.
    pub prefix: IpNet,
    /// Protocol that installed the route.
    pub protocol: Protocol,
    /// Next-hop IP. `None` for connected/direct/local routes, which
    /// originate at this device.
    pub next_hop: Option<IpAddr>,
    /// Outgoing interface.
    #[serde(default)]
    pub interface: String,
    /// Routing-instance/VRF this entry belongs to. Opaque to the walker.
    #[serde(default)]
    pub vrf: String,
    /// BGP communities, order preserved.
    #[serde(default)]
    pub communities: Vec<String>,
    /// BGP local-preference, if applicable.
    #[serde(default)]
    pub local_pref: Option<i64>,
    /// Route metric/MED.
    #[serde(default)]
    pub metric: Option<i64>,
    /// AS path, as an ordered list of (possibly set/confed) tokens.
    #[serde(default)]
    pub as_path: Vec<String>,
    /// Peer AS, if learned via eBGP.
    #[serde(default)]
    pub peer_as: Option<i64>,
    /// Whether this is the device's selected ("active" / "best in the RIB") entry.
    #[serde(default)]
    pub active: bool,
    /// Additional ECMP sibling paths sharing this entry's protocol and cost.
    /// Each carries its own non-empty `next_hop`.
    #[serde(default)]
    pub paths: Vec<RouteEntry>,
    /// The peer IP this entry was learned from.
    #[serde(default)]
    pub source: String,
    /// Human-readable reason the device marked this entry inactive.
    #[serde(default)]
    pub inactive_reason: String,
}

impl RouteEntry {
    /// A compact summary of this entry for the `all_entries` snapshot
    /// attached to a [`crate::walker::HopResult`].
    pub fn summary(&self) -> RouteEntrySummary {
        RouteEntrySummary {
            protocol: self.protocol,
            next_hop: self.next_hop,
            active: self.active,
            local_pref: self.local_pref,
            metric: self.metric,
            inactive_reason: self.inactive_reason.clone(),
        }
    }
}

/// Condensed view of a [`RouteEntry`] kept in a hop's `all_entries` list so
/// the caller can see ECMP siblings and inactive alternates without the full
/// BGP attribute set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEntrySummary {
    /// Protocol that installed the route.
    pub protocol: Protocol,
    /// Next-hop IP, if any.
    pub next_hop: Option<IpAddr>,
    /// Whether this entry was active in the RIB.
    pub active: bool,
    /// BGP local-preference, if applicable.
    pub local_pref: Option<i64>,
    /// Route metric/MED.
    pub metric: Option<i64>,
    /// Reason this entry was marked inactive, if any.
    pub inactive_reason: String,
}

/// Outcome of applying the §4.A selection rules at one device.
pub struct Selection<'a> {
    /// The entries considered at all (post firewall-protocol restriction).
    pub filtered: Vec<&'a RouteEntry>,
    /// The best entry: index 0 of `filtered` after preferring active entries.
    pub best: &'a RouteEntry,
}

/// Apply the §4.A selection rules for the entries a device returned.
///
/// `is_firewall` restricts the working set to `static`/`policy` entries
/// first (firewalls never carry a dynamic RIB along the path). Returns
/// `None` only if `entries` is empty — callers treat that as a blackhole
/// before calling this function.
pub fn select<'a>(entries: &'a [RouteEntry], is_firewall: bool) -> Option<Selection<'a>> {
    if entries.is_empty() {
        return None;
    }

    // Step 1/2: firewalls only ever forward on static or policy entries.
    let filtered: Vec<&RouteEntry> = if is_firewall {
        entries
            .iter()
            .filter(|e| matches!(e.protocol, Protocol::Static | Protocol::Policy))
            .collect()
    } else {
        entries.iter().collect()
    };

    if filtered.is_empty() {
        return None;
    }

    // Step 3: prefer active entries; if none are active, fall back to
    // entry 0 of the filtered set (the vendor's own best-path choice).
    let active: Vec<&RouteEntry> = filtered.iter().copied().filter(|e| e.active).collect();
    let working_set: Vec<&RouteEntry> =
        if active.is_empty() { vec![filtered[0]] } else { active };

    // Step 4: best is index 0 of the working set.
    let best = working_set[0];

    Some(Selection { filtered: working_set, best })
}

/// Collect the ECMP next-hop set for a selection: the union of the best
/// entry's own next-hop, every sibling in `best.paths` with a non-empty
/// next-hop, and every other active entry's next-hop — sorted and
/// deduplicated lexicographically on IP so equal inputs always produce
/// equal outputs (§4.A / §8 testable property).
pub fn ecmp_next_hops(selection: &Selection<'_>) -> Vec<IpAddr> {
    let mut hops: Vec<IpAddr> = Vec::new();

    if let Some(nh) = selection.best.next_hop {
        hops.push(nh);
    }
    for sibling in &selection.best.paths {
        if let Some(nh) = sibling.next_hop {
            hops.push(nh);
        }
    }
    for entry in &selection.filtered {
        if let Some(nh) = entry.next_hop {
            hops.push(nh);
        }
    }

    hops.sort();
    hops.dedup();
    hops
}

#[cfg(test)]
mod test {
    use super::*;

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

    #[test]
    fn firewall_restricts_to_static_and_policy() {
        let entries = vec![
            entry(Protocol::Bgp, Some("10.1.1.1"), true),
            entry(Protocol::Static, Some("10.1.1.2"), true),
        ];
        let sel = select(&entries, true).unwrap();
        assert_eq!(sel.best.protocol, Protocol::Static);
    }

    #[test]
    fn no_active_falls_back_to_entry_zero() {
        let entries = vec![
            entry(Protocol::Bgp, Some("10.1.1.1"), false),
            entry(Protocol::Bgp, Some("10.1.1.2"), false),
        ];
        let sel = select(&entries, false).unwrap();
        assert_eq!(sel.best.next_hop, Some("10.1.1.1".parse().unwrap()));
    }

    #[test]
    fn ecmp_union_is_sorted_and_deduplicated() {
        let mut best = entry(Protocol::Bgp, Some("10.1.1.2"), true);
        best.paths.push(entry(Protocol::Bgp, Some("10.1.1.2"), true));
        best.paths.push(entry(Protocol::Bgp, Some("10.1.1.1"), true));
        let entries = vec![best.clone()];
        let sel = Selection { filtered: vec![&entries[0]], best: &entries[0] };
        let hops = ecmp_next_hops(&sel);
        assert_eq!(
            hops,
            vec!["10.1.1.1".parse::<IpAddr>().unwrap(), "10.1.1.2".parse().unwrap()]
        );
    }

    #[test]
    fn empty_entries_yield_none() {
        assert!(select(&[], false).is_none());
    }
}
