//! Loads the YAML inventory file into a [`netwalk_core::inventory::Inventory`].
//!
//! The on-disk shape mirrors the Device model of §3 directly; this module
//! only handles parsing and the one-time-or-on-reload construction the
//! core's `Inventory::new` needs.

use std::path::Path;

use netwalk_core::inventory::{Boundary, Device, Inventory};
use netwalk_core::InventoryError;
use serde::Deserialize;

/// Raw YAML shape for the whole inventory file: a device list plus the
/// boundaries between their domains. `Device` and `Boundary` already derive
/// `Deserialize` with the same field defaults the YAML uses, so this struct
/// exists only to give the file its two top-level keys.
#[derive(Debug, Deserialize)]
struct RawInventory {
    devices: Vec<Device>,
    #[serde(default)]
    boundaries: Vec<Boundary>,
}

/// Errors that can occur while loading the inventory file.
#[derive(Debug, thiserror::Error)]
pub enum InventoryLoadError {
    /// The file could not be read.
    #[error("failed to read inventory file {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file did not parse as the expected YAML shape.
    #[error("failed to parse inventory file {path}: {source}")]
    Parse {
        /// Path that failed to parse.
        path: std::path::PathBuf,
        /// Underlying YAML error.
        #[source]
        source: serde_yaml::Error,
    },
    /// The parsed devices violated an Inventory invariant.
    #[error(transparent)]
    Invariant(#[from] InventoryError),
}

/// Load and parse `path` into an [`Inventory`].
pub fn load(path: &Path) -> Result<Inventory, InventoryLoadError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| InventoryLoadError::Read { path: path.to_path_buf(), source })?;
    let raw: RawInventory =
        serde_yaml::from_str(&text).map_err(|source| InventoryLoadError::Parse { path: path.to_path_buf(), source })?;

    Ok(Inventory::new(raw.devices, raw.boundaries)?)
}
