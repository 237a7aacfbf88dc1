//! Operational path-trace HTTP service: wires the collected-data cache,
//! YAML inventory, SQLite history store and plugin registry into a
//! `netwalk_core::walker::Walker` and serves it over HTTP.

mod cache;
mod config;
mod error;
mod history;
mod http;
mod inventory_yaml;

use std::sync::{Arc, RwLock};

use clap::Parser;
use netwalk_core::blast_radius::InventoryGraph;
use netwalk_core::inventory::Inventory;
use netwalk_core::plugin::{CommunityDecoderPlugin, FisCommunityDecoder};
use netwalk_core::walker::Walker;

use cache::CollectedCache;
use config::{Args, ServerConfig};
use history::HistoryStore;

/// Shared, hot-swappable process state. `inventory` and `topology` are
/// behind an `RwLock<Arc<_>>` so a reload publishes a new generation
/// atomically (§5) without blocking in-flight reads.
pub struct AppState {
    inventory: RwLock<Arc<Inventory>>,
    topology: RwLock<Arc<InventoryGraph>>,
    walker: Arc<Walker>,
    cache: Arc<CollectedCache>,
    history: Arc<HistoryStore>,
    config: ServerConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();

    let args = Args::parse();
    let config = ServerConfig::load(&args)?;

    let inventory = inventory_yaml::load(&config.inventory)?;
    log::info!("loaded {} devices from {}", inventory.len(), config.inventory.display());
    let topology = InventoryGraph::from_inventory(&inventory);

    let cache = Arc::new(CollectedCache::new(config.collected_root.clone()));
    let history = Arc::new(HistoryStore::open(&config.history_db)?);

    let plugins: Vec<Arc<dyn CommunityDecoderPlugin>> = vec![Arc::new(FisCommunityDecoder::new())];
    let walker =
        Arc::new(Walker::new(cache.clone(), plugins).with_limits(config.max_hops, config.max_ecmp_branches));

    let state = Arc::new(AppState {
        inventory: RwLock::new(Arc::new(inventory)),
        topology: RwLock::new(Arc::new(topology)),
        walker,
        cache,
        history,
        config: config.clone(),
    });

    let app = http::router(state);

    log::info!("listening on {}", config.listen);
    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
