//! Collector adapter backed by the collected-data JSON cache (§6.4),
//! ported from `original_source/backend/data_loader.py`'s
//! `CollectedDataLoader`: one JSON file per device per protocol, indexed
//! by exact prefix with a longest-prefix-match fallback.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ipnet::IpNet;
use netwalk_core::collector::Collector;
use netwalk_core::route::RouteEntry;
use netwalk_core::CollectorError;
use serde::Deserialize;

const RIB_FILES: &[&str] = &["bgp-rib.json", "mpls-rib.json", "isis-rib.json"];

#[derive(Debug, Deserialize)]
struct RibFile {
    collected_at: Option<DateTime<Utc>>,
    #[serde(default)]
    routes: Vec<RouteEntry>,
}

#[derive(Debug, Default)]
struct DeviceCache {
    by_prefix: HashMap<IpNet, Vec<RouteEntry>>,
    collected_at: Option<DateTime<Utc>>,
}

/// Read-mostly, reloadable collected-data cache. `reload` rebuilds the
/// whole index and swaps it in atomically so in-flight traces see either
/// the old or the new generation, never a mix (§5).
///
/// `locks` models the "at most one trace uses a device's session at a
/// time" rule (§5): a real Collector would serialize CLI/NETCONF sessions
/// per device here. Against a read-only in-memory cache this degenerates
/// to an uncontended lock on every call, but the seam is real — a future
/// live Collector plugs into the same per-device map.
pub struct CollectedCache {
    root: PathBuf,
    index: RwLock<HashMap<String, DeviceCache>>,
    locks: tokio::sync::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl CollectedCache {
    /// Build a cache rooted at `root`, performing an initial load.
    pub fn new(root: PathBuf) -> Self {
        let cache =
            Self { root, index: RwLock::new(HashMap::new()), locks: tokio::sync::Mutex::new(HashMap::new()) };
        cache.reload();
        cache
    }

    async fn device_lock(&self, device: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(device.to_string()).or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))).clone()
    }

    /// Re-walk `root` and atomically replace the in-memory index.
    pub fn reload(&self) {
        let mut next: HashMap<String, DeviceCache> = HashMap::new();

        let Ok(entries) = std::fs::read_dir(&self.root) else {
            *self.index.write().unwrap() = next;
            return;
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(hostname) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            let mut device_cache = DeviceCache::default();
            for rib_file in RIB_FILES {
                let file_path = path.join(rib_file);
                if let Some(parsed) = read_rib_file(&file_path) {
                    if device_cache.collected_at.is_none() {
                        device_cache.collected_at = parsed.collected_at;
                    }
                    for route in parsed.routes {
                        device_cache.by_prefix.entry(route.prefix.clone()).or_default().push(route);
                    }
                }
            }

            next.insert(hostname.to_string(), device_cache);
        }

        *self.index.write().unwrap() = next;
    }

    /// Devices whose cached data is older than `max_age`, with an ISO-8601
    /// timestamp for each (§6.4).
    pub fn stale_warnings(&self, max_age: Duration) -> Vec<String> {
        let now = Utc::now();
        self.index
            .read()
            .unwrap()
            .iter()
            .filter_map(|(host, cache)| {
                let ts = cache.collected_at?;
                let age = now.signed_duration_since(ts).to_std().ok()?;
                if age > max_age {
                    Some(format!("{host}: cached data is older than 1 hour ({ts})"))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Every device hostname the cache has data for.
    pub fn hostnames(&self) -> Vec<String> {
        self.index.read().unwrap().keys().cloned().collect()
    }
}

fn read_rib_file(path: &Path) -> Option<RibFile> {
    let text = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&text) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            log::warn!("failed to parse cached file {}: {err}", path.display());
            None
        }
    }
}

fn longest_prefix_match(by_prefix: &HashMap<IpNet, Vec<RouteEntry>>, prefix: &str) -> Vec<RouteEntry> {
    let Ok(target) = prefix.parse::<IpNet>() else {
        return vec![];
    };
    if let Some(exact) = by_prefix.get(&target) {
        return exact.clone();
    }

    let mut matches: Vec<(u8, &RouteEntry)> = by_prefix
        .iter()
        .filter(|(candidate, _)| {
            candidate.prefix_len() <= target.prefix_len()
                && (candidate.contains(&target.addr()) || **candidate == target)
        })
        .flat_map(|(candidate, entries)| entries.iter().map(move |e| (candidate.prefix_len(), e)))
        .collect();

    matches.sort_by(|a, b| b.0.cmp(&a.0));
    matches.into_iter().map(|(_, e)| e.clone()).collect()
}

#[async_trait]
impl Collector for CollectedCache {
    async fn collect(&self, device: &str, prefix: &str, _vrf: &str) -> Result<Vec<RouteEntry>, CollectorError> {
        let lock = self.device_lock(device).await;
        let _session = lock.lock().await;

        let index = self.index.read().unwrap();
        let Some(device_cache) = index.get(device) else {
            return Err(CollectorError::Unreachable(device.to_string()));
        };
        Ok(longest_prefix_match(&device_cache.by_prefix, prefix))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    fn write_rib(dir: &Path, host: &str, routes_json: &str) {
        let host_dir = dir.join(host);
        std::fs::create_dir_all(&host_dir).unwrap();
        let mut f = std::fs::File::create(host_dir.join("bgp-rib.json")).unwrap();
        write!(f, "{{\"collected_at\": \"2024-01-01T00:00:00Z\", \"routes\": {routes_json}}}").unwrap();
    }

    #[tokio::test]
    async fn exact_prefix_hit_returns_entries() {
        let dir = tempfile::tempdir().unwrap();
        write_rib(
            dir.path(),
            "A",
            r#"[{"prefix":"10.0.0.0/24","protocol":"bgp","next_hop":"10.1.0.1","active":true}]"#,
        );
        let cache = CollectedCache::new(dir.path().to_path_buf());
        let entries = cache.collect("A", "10.0.0.0/24", "").await.unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn falls_back_to_longest_covering_prefix() {
        let dir = tempfile::tempdir().unwrap();
        write_rib(
            dir.path(),
            "A",
            r#"[{"prefix":"10.0.0.0/16","protocol":"bgp","next_hop":"10.1.0.1","active":true}]"#,
        );
        let cache = CollectedCache::new(dir.path().to_path_buf());
        let entries = cache.collect("A", "10.0.5.0/24", "").await.unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn unknown_device_is_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CollectedCache::new(dir.path().to_path_buf());
        let err = cache.collect("ghost", "10.0.0.0/24", "").await.unwrap_err();
        assert!(matches!(err, CollectorError::Unreachable(_)));
    }
}
