//! # Inventory Model
//!
//! The Inventory is the core's read-only view of device metadata: IP
//! resolution, firewall/role detection, MPLS label operations, and
//! domain-boundary crossings. Loading it from YAML and keeping it fresh on
//! reload is `netwalk-server`'s job (§5/§6.4); this module only models the
//! data and the lookups the walker needs.

use std::collections::HashMap;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::error::InventoryError;

/// An MPLS label operation (§3). Ordered; applied at the device that owns
/// the entry (push on ingress, swap mid-LSP, pop at egress).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelOp {
    /// The label action.
    pub action: LabelAction,
    /// The MPLS label value.
    pub label: u32,
    /// The LSP this operation belongs to, if named.
    #[serde(default)]
    pub lsp_name: Option<String>,
    /// The LSP's role (primary/secondary/ECMP/FRR-bypass), recovered from
    /// `original_source/backend/models.py`'s `LSPInfo.role` and carried
    /// alongside the label op rather than as a separate model, since the
    /// inventory is the only place that knows it.
    #[serde(default)]
    pub lsp_role: Option<LspRole>,
}

/// MPLS label action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelAction {
    /// Push a new label onto the stack.
    Push,
    /// Swap the top label.
    Swap,
    /// Pop the top label.
    Pop,
}

/// The role an LSP plays for a given prefix, ported from the original
/// Python `LSPInfo.role` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LspRole {
    /// The primary, preferred LSP.
    Primary,
    /// A backup LSP.
    Secondary,
    /// One of several ECMP LSPs.
    Ecmp,
    /// A fast-reroute bypass tunnel.
    FrrBypass,
}

/// A firewall sitting between two routing domains (§3). Directional labels,
/// but the crossing relation is symmetric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boundary {
    /// Hostname of the firewall that enforces this boundary.
    pub firewall: String,
    /// The domain upstream of the firewall.
    pub upstream_domain: String,
    /// The domain downstream of the firewall.
    pub downstream_domain: String,
}

/// The event of a packet traversing a firewall between two named domains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainCrossing {
    /// Hostname of the firewall.
    pub firewall: String,
    /// Domain the packet is leaving.
    pub from_domain: String,
    /// Domain the packet is entering.
    pub to_domain: String,
    /// `policy` if the crossing route was selected via policy routing,
    /// `static` otherwise (§4.D step 8).
    pub route_type: String,
}

/// A single managed device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Device hostname, unique within the inventory.
    pub hostname: String,
    /// Free-form role string (pe, core, agg, firewall, ...). Firewall
    /// detection is a loose substring match on this field (§9).
    #[serde(default)]
    pub role: String,
    /// Free-form routing domain name (dc, backbone, inet_edge, ...).
    #[serde(default)]
    pub domain: String,
    /// Management IP.
    #[serde(default)]
    pub management_ip: Option<IpAddr>,
    /// Loopback IPs.
    #[serde(default)]
    pub loopbacks: Vec<IpAddr>,
    /// Interface name → IP.
    #[serde(default)]
    pub interfaces: HashMap<String, IpAddr>,
    /// Next-hop IP → ordered list of label operations applied when
    /// forwarding toward that next-hop.
    #[serde(default)]
    pub mpls: HashMap<IpAddr, Vec<LabelOp>>,
}

impl Device {
    /// True iff `role` substring-contains "fw" or "firewall" (§6.2).
    pub fn is_firewall(&self) -> bool {
        let role = self.role.to_lowercase();
        role.contains("fw") || role.contains("firewall")
    }

    /// Every IP this device answers to: management, loopbacks, interfaces.
    fn all_ips(&self) -> impl Iterator<Item = IpAddr> + '_ {
        self.management_ip
            .into_iter()
            .chain(self.loopbacks.iter().copied())
            .chain(self.interfaces.values().copied())
    }
}

/// The normalized, in-memory device map and IP-index (§3).
///
/// Built once at startup (or on an explicit reload) and treated as
/// read-only by every in-flight trace; `netwalk-server` is responsible for
/// atomic swap-on-reload (§5).
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    devices: HashMap<String, Device>,
    boundaries: Vec<Boundary>,
    ip_index: HashMap<IpAddr, String>,
}

impl Inventory {
    /// Build an inventory from devices and boundaries, rebuilding the
    /// IP-index and rejecting any IP claimed by more than one device.
    pub fn new(
        devices: Vec<Device>,
        boundaries: Vec<Boundary>,
    ) -> Result<Self, InventoryError> {
        let mut ip_index: HashMap<IpAddr, String> = HashMap::new();
        let mut device_map: HashMap<String, Device> = HashMap::new();

        for dev in devices {
            for ip in dev.all_ips() {
                if let Some(existing) = ip_index.get(&ip) {
                    return Err(InventoryError::DuplicateIp {
                        ip: ip.to_string(),
                        first: existing.clone(),
                        second: dev.hostname.clone(),
                    });
                }
                ip_index.insert(ip, dev.hostname.clone());
            }
            device_map.insert(dev.hostname.clone(), dev);
        }

        Ok(Self { devices: device_map, boundaries, ip_index })
    }

    /// `ResolveIP(ip) → device|None` (§6.2): O(1) lookup.
    pub fn resolve_ip(&self, ip: IpAddr) -> Option<&str> {
        self.ip_index.get(&ip).map(|s| s.as_str())
    }

    /// `GetDevice(host) → Device|None` (§6.2).
    pub fn get_device(&self, host: &str) -> Option<&Device> {
        self.devices.get(host)
    }

    /// Every known device hostname.
    pub fn hostnames(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(|s| s.as_str())
    }

    /// Number of devices in the inventory.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// True if the inventory holds no devices.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// `IsFirewall(host) → bool` (§6.2).
    pub fn is_firewall(&self, host: &str) -> bool {
        self.devices.get(host).map(|d| d.is_firewall()).unwrap_or(false)
    }

    /// `GetLabelOps(host, next_hop) → ordered list<Label-Op>` (§6.2).
    pub fn get_label_ops(&self, host: &str, next_hop: IpAddr) -> Vec<LabelOp> {
        self.devices
            .get(host)
            .and_then(|d| d.mpls.get(&next_hop))
            .cloned()
            .unwrap_or_default()
    }

    /// `GetDomainCrossing(host, next_hop) → Domain-Crossing|None` (§6.2).
    ///
    /// Detects crossings in both directions (upstream↔downstream per an
    /// explicit [`Boundary`]) and falls back to a generic crossing whenever
    /// the host's domain differs from the resolved next-hop device's
    /// domain, even with no matching `Boundary` record.
    pub fn get_domain_crossing(&self, host: &str, next_hop: IpAddr) -> Option<DomainCrossing> {
        let current = self.devices.get(host)?;
        let next_hostname = self.resolve_ip(next_hop)?;
        let next_dev = self.devices.get(next_hostname)?;

        for b in &self.boundaries {
            if b.firewall != host {
                continue;
            }
            if current.domain == b.upstream_domain && next_dev.domain == b.downstream_domain {
                return Some(DomainCrossing {
                    firewall: host.to_string(),
                    from_domain: b.upstream_domain.clone(),
                    to_domain: b.downstream_domain.clone(),
                    route_type: "static".to_string(),
                });
            }
            if current.domain == b.downstream_domain && next_dev.domain == b.upstream_domain {
                return Some(DomainCrossing {
                    firewall: host.to_string(),
                    from_domain: b.downstream_domain.clone(),
                    to_domain: b.upstream_domain.clone(),
                    route_type: "static".to_string(),
                });
            }
        }

        if !current.domain.is_empty()
            && !next_dev.domain.is_empty()
            && current.domain != next_dev.domain
        {
            return Some(DomainCrossing {
                firewall: host.to_string(),
                from_domain: current.domain.clone(),
                to_domain: next_dev.domain.clone(),
                route_type: "static".to_string(),
            });
        }

        None
    }

    /// All boundaries in the inventory.
    pub fn boundaries(&self) -> &[Boundary] {
        &self.boundaries
    }

    /// Two devices share an interface-peer edge if an interface IP of one is
    /// a known IP of the other. Used by the Blast-Radius engine (§9) to
    /// build its undirected graph without needing a separate topology
    /// source.
    pub fn peer_edges(&self) -> Vec<(String, String)> {
        let mut edges = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for dev in self.devices.values() {
            for ip in dev.interfaces.values() {
                if let Some(neighbor) = self.resolve_ip(*ip) {
                    if neighbor == dev.hostname {
                        continue;
                    }
                    let key = if dev.hostname < *neighbor {
                        (dev.hostname.clone(), neighbor.to_string())
                    } else {
                        (neighbor.to_string(), dev.hostname.clone())
                    };
                    if seen.insert(key.clone()) {
                        edges.push(key);
                    }
                }
            }
        }
        edges
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn device(hostname: &str, role: &str, domain: &str, mgmt: &str) -> Device {
        Device {
            hostname: hostname.to_string(),
            role: role.to_string(),
            domain: domain.to_string(),
            management_ip: Some(mgmt.parse().unwrap()),
            loopbacks: vec![],
            interfaces: HashMap::new(),
            mpls: HashMap::new(),
        }
    }

    #[test]
    fn duplicate_ip_is_rejected() {
        let a = device("a", "pe", "dc", "10.0.0.1");
        let b = device("b", "pe", "dc", "10.0.0.1");
        let err = Inventory::new(vec![a, b], vec![]).unwrap_err();
        assert!(matches!(err, InventoryError::DuplicateIp { .. }));
    }

    #[test]
    fn firewall_detection_is_loose_substring() {
        let dev = device("fw1", "edge-fw", "dc", "10.0.0.1");
        assert!(dev.is_firewall());
        let dev2 = device("fw2", "t2_firewall", "dc", "10.0.0.2");
        assert!(dev2.is_firewall());
        let dev3 = device("core1", "core", "dc", "10.0.0.3");
        assert!(!dev3.is_firewall());
    }

    #[test]
    fn domain_crossing_falls_back_without_boundary() {
        let a = device("a", "pe", "dc", "10.0.0.1");
        let b = device("fw1", "firewall", "backbone", "10.0.0.2");
        let inv = Inventory::new(vec![a, b], vec![]).unwrap();
        let crossing = inv.get_domain_crossing("fw1", "10.0.0.1".parse().unwrap());
        assert!(crossing.is_some());
        assert_eq!(crossing.unwrap().to_domain, "dc");
    }

    #[test]
    fn explicit_boundary_is_detected_both_directions() {
        let a = device("a", "pe_zone", "pe_zone", "10.0.0.1");
        let fw = device("fw1", "firewall", "backbone", "10.0.0.2");
        let boundary = Boundary {
            firewall: "fw1".to_string(),
            upstream_domain: "backbone".to_string(),
            downstream_domain: "pe_zone".to_string(),
        };
        let inv = Inventory::new(vec![a, fw], vec![boundary]).unwrap();
        let crossing = inv.get_domain_crossing("fw1", "10.0.0.1".parse().unwrap()).unwrap();
        assert_eq!(crossing.from_domain, "backbone");
        assert_eq!(crossing.to_domain, "pe_zone");
    }
}
