#![deny(missing_docs)]

//! # netwalk-core
//!
//! Core engine for tracing the operational forwarding path of a prefix
//! across a multi-vendor IP/MPLS network, without touching any device.
//!
//! ## Structure
//!
//! - **[`route`]**: the normalized [`RouteEntry`](route::RouteEntry) model
//!   and the §4.A selection rules a device's returned entries go through
//!   before the walker picks a next-hop.
//! - **[`inventory`]**: the [`Inventory`](inventory::Inventory) device map,
//!   IP-index, MPLS label-operation lookup and domain-boundary detection.
//! - **[`collector`]**: the [`Collector`](collector::Collector) contract
//!   that adapts a device's live or cached RIB into `RouteEntry`s.
//! - **[`plugin`]**: the [`CommunityDecoderPlugin`](plugin::CommunityDecoderPlugin)
//!   contract and the bundled FIS community decoder.
//! - **[`walker`]**: the recursive Path Walker itself, and its
//!   [`TraceResult`](walker::TraceResult) output.
//! - **[`reverse`]**: the reverse-trace asymmetry check built on top of the
//!   walker.
//! - **[`failure`]**: the single-node failure simulator.
//! - **[`blast_radius`]**: the all-pairs reachability engine used to size
//!   the blast radius of a device or link failure.
//!
//! Every public type here is synchronous data; the only async surface is
//! [`collector::Collector`] and [`walker::Walker::trace`], since both may
//! need to wait on I/O or sibling ECMP branches.

pub mod blast_radius;
pub mod collector;
mod error;
pub mod failure;
pub mod inventory;
pub mod plugin;
pub mod reverse;
pub mod route;
pub mod walker;

pub use error::{BlastRadiusError, CollectorError, InventoryError, WalkerError};
