//! Module containing all error types used by the core engine.

use thiserror::Error;

/// Error produced by the Collector contract (§6.1). The walker never
/// propagates this directly — every variant is turned into a terminal hop
/// with an `end_reason` before the recursion unwinds.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CollectorError {
    /// The device could not be reached (connect timeout, auth failure, transport reset).
    #[error("device unreachable: {0}")]
    Unreachable(String),
    /// The Collector's own per-device command timeout elapsed.
    #[error("device timed out")]
    Timeout,
    /// The Collector returned data that failed to parse into Route-Entries.
    #[error("failed to parse collector response: {0}")]
    ParseError(String),
}

/// Errors the Path Walker can raise. With one exception
/// (`DeadlineExceeded`), these never escape [`crate::walker::Walker::trace`] —
/// they are caught at the point they occur and folded into a terminal hop.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalkerError {
    /// The trace's deadline passed before it could complete. Per §5,
    /// cancellation discards partial paths rather than returning them.
    #[error("trace deadline exceeded")]
    DeadlineExceeded,
    /// A Collector contract violation: a connected/direct/local entry carried
    /// a non-empty next-hop. Per §9, a strict implementation rejects this as
    /// malformed rather than silently recursing on it.
    #[error("malformed route entry: connected/direct/local entry for {prefix} on {device} has a non-empty next_hop")]
    MalformedOriginEntry {
        /// Device that returned the malformed entry.
        device: String,
        /// Prefix the malformed entry was returned for.
        prefix: String,
    },
}

/// Errors surfaced by the Inventory.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Two devices in the inventory claim the same IP address. Fatal at load
    /// time per §7 — never silently swallowed.
    #[error("IP {ip} is claimed by both {first} and {second}")]
    DuplicateIp {
        /// The conflicting IP address.
        ip: String,
        /// The device that claimed it first.
        first: String,
        /// The device that claimed it second.
        second: String,
    },
}

/// Errors raised by the Blast-Radius engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlastRadiusError {
    /// `failed_node` is not a node in the inventory graph.
    #[error("node {0} is not part of the inventory graph")]
    InvalidNode(String),
}
