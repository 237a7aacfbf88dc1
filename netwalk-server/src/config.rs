//! Process configuration: CLI flags layered over an optional TOML file,
//! following the teacher's `clap`-derive CLI pattern adapted to a service
//! rather than a one-shot synthesis run.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

/// `netwalk-server` command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "netwalk-server", about = "Operational path-trace service for IP/MPLS networks")]
pub struct Args {
    /// Path to the TOML configuration file. CLI flags below override it.
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Address to bind the HTTP surface to.
    #[arg(long)]
    pub listen: Option<SocketAddr>,

    /// Root directory of the collected-data JSON cache (§6.4).
    #[arg(long)]
    pub collected_root: Option<PathBuf>,

    /// Path to the inventory YAML file.
    #[arg(long)]
    pub inventory: Option<PathBuf>,

    /// Path to the SQLite history database.
    #[arg(long)]
    pub history_db: Option<PathBuf>,
}

/// Fully resolved server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP surface listens on.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Root of the collected-data JSON cache.
    pub collected_root: PathBuf,
    /// Path to the inventory YAML file.
    pub inventory: PathBuf,
    /// Path to the SQLite history database.
    #[serde(default = "default_history_db")]
    pub history_db: PathBuf,
    /// Hop cap per trace (§4.D).
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,
    /// ECMP branch cap per trace (§4.D).
    #[serde(default = "default_max_ecmp_branches")]
    pub max_ecmp_branches: usize,
    /// Per-trace deadline, in seconds (§5).
    #[serde(default = "default_trace_timeout_secs")]
    pub trace_timeout_secs: u64,
    /// Age, in seconds, after which a collected-data file is considered
    /// stale (§6.4).
    #[serde(default = "default_staleness_secs")]
    pub staleness_secs: u64,
}

fn default_listen() -> SocketAddr {
    "0.0.0.0:8080".parse().unwrap()
}

fn default_history_db() -> PathBuf {
    PathBuf::from("netwalk_history.db")
}

fn default_max_hops() -> usize {
    netwalk_core::walker::DEFAULT_MAX_HOPS
}

fn default_max_ecmp_branches() -> usize {
    netwalk_core::walker::DEFAULT_MAX_ECMP_BRANCHES
}

fn default_trace_timeout_secs() -> u64 {
    30
}

fn default_staleness_secs() -> u64 {
    3600
}

/// Errors produced while assembling configuration from file + CLI.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The config file did not parse as TOML.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Path that failed to parse.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
    /// Neither the file nor the CLI supplied a required field.
    #[error("missing required configuration value: {0}")]
    Missing(&'static str),
}

impl ServerConfig {
    /// Build configuration from an optional TOML file, overridden field by
    /// field by any CLI flags present in `args`.
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut partial: PartialConfig = match &args.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|source| ConfigError::Read { path: path.clone(), source })?;
                toml::from_str(&text).map_err(|source| ConfigError::Parse { path: path.clone(), source })?
            }
            None => PartialConfig::default(),
        };

        if let Some(listen) = args.listen {
            partial.listen = Some(listen);
        }
        if let Some(root) = &args.collected_root {
            partial.collected_root = Some(root.clone());
        }
        if let Some(inventory) = &args.inventory {
            partial.inventory = Some(inventory.clone());
        }
        if let Some(history_db) = &args.history_db {
            partial.history_db = Some(history_db.clone());
        }

        Ok(ServerConfig {
            listen: partial.listen.unwrap_or_else(default_listen),
            collected_root: partial.collected_root.ok_or(ConfigError::Missing("collected_root"))?,
            inventory: partial.inventory.ok_or(ConfigError::Missing("inventory"))?,
            history_db: partial.history_db.unwrap_or_else(default_history_db),
            max_hops: partial.max_hops.unwrap_or_else(default_max_hops),
            max_ecmp_branches: partial.max_ecmp_branches.unwrap_or_else(default_max_ecmp_branches),
            trace_timeout_secs: partial.trace_timeout_secs.unwrap_or_else(default_trace_timeout_secs),
            staleness_secs: partial.staleness_secs.unwrap_or_else(default_staleness_secs),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    listen: Option<SocketAddr>,
    collected_root: Option<PathBuf>,
    inventory: Option<PathBuf>,
    history_db: Option<PathBuf>,
    max_hops: Option<usize>,
    max_ecmp_branches: Option<usize>,
    trace_timeout_secs: Option<u64>,
    staleness_secs: Option<u64>,
}
