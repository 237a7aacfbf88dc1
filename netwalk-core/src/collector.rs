//! # Collector Adapter
//!
//! The walker never speaks to a device directly; it asks a [`Collector`]
//! for the entries a device holds for a prefix. `netwalk-server` supplies
//! the concrete implementation (a JSON-cache reader, per
//! `original_source/backend/data_loader.py`); this trait is the seam that
//! lets the walker stay ignorant of vendor syntax and transport.

use async_trait::async_trait;

use crate::error::CollectorError;
use crate::route::RouteEntry;

/// Adapts a device's routing state into normalized [`RouteEntry`] values.
///
/// Implementations are expected to be cheap to clone/share (an `Arc` around
/// a cache handle, typically) since the walker calls `collect` once per hop
/// and, for ECMP branches, concurrently across siblings.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Return every route entry `device` holds for `prefix` in `vrf`.
    ///
    /// An empty `Ok(vec![])` means "no route" (a blackhole, §4.D); use
    /// `Err` only for adapter-level failures (unreachable device, parse
    /// failure, timeout) per [`CollectorError`].
    async fn collect(
        &self,
        device: &str,
        prefix: &str,
        vrf: &str,
    ) -> Result<Vec<RouteEntry>, CollectorError>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// An in-memory [`Collector`] double keyed on `(device, prefix, vrf)`,
    /// used by every module's unit tests so the walker and its callers
    /// never need a real transport to exercise the algorithm.
    #[derive(Default)]
    pub struct MapCollector {
        routes: Mutex<HashMap<(String, String, String), Vec<RouteEntry>>>,
        unreachable: Mutex<std::collections::HashSet<String>>,
    }

    impl MapCollector {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&self, device: &str, prefix: &str, vrf: &str, entries: Vec<RouteEntry>) {
            self.routes
                .lock()
                .unwrap()
                .insert((device.to_string(), prefix.to_string(), vrf.to_string()), entries);
        }

        pub fn mark_unreachable(&self, device: &str) {
            self.unreachable.lock().unwrap().insert(device.to_string());
        }
    }

    #[async_trait]
    impl Collector for MapCollector {
        async fn collect(
            &self,
            device: &str,
            prefix: &str,
            vrf: &str,
        ) -> Result<Vec<RouteEntry>, CollectorError> {
            if self.unreachable.lock().unwrap().contains(device) {
                return Err(CollectorError::Unreachable(device.to_string()));
            }
            Ok(self
                .routes
                .lock()
                .unwrap()
                .get(&(device.to_string(), prefix.to_string(), vrf.to_string()))
                .cloned()
                .unwrap_or_default())
        }
    }
}
