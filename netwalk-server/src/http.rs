//! Axum HTTP/JSON surface (§6.3). Thin: every handler validates input,
//! calls into `netwalk-core`, records history, and serializes the result.
//! None of the trace/compare/simulate/blast-radius semantics live here.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Path as AxumPath, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use netwalk_core::blast_radius::{self, InventoryGraph};
use netwalk_core::failure::simulate_failure;
use netwalk_core::reverse::trace_reverse;
use netwalk_core::walker::TraceBudget;

use crate::error::ApiError;
use crate::history::{HistoryStore, TraceRecord};
use crate::AppState;

/// Build the router for the whole HTTP surface.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/trace", post(trace))
        .route("/api/trace/compare", post(compare))
        .route("/api/simulate/failure", post(simulate))
        .route("/api/blast-radius", post(blast_radius_handler))
        .route("/api/origin/:prefix", get(origin))
        .route("/api/devices", get(devices))
        .route("/api/health", get(health))
        .route("/api/collected", get(collected))
        .route("/api/history", get(history_list))
        .route("/api/history/:id", get(history_get).delete(history_delete))
        .route("/api/history/clear", post(history_clear))
        .route("/api/inventory/reload", post(inventory_reload))
        .with_state(state)
}

fn budget(state: &AppState) -> TraceBudget {
    TraceBudget::with_timeout(Duration::from_secs(state.config.trace_timeout_secs))
}

fn default_vrf(vrf: Option<String>) -> String {
    vrf.unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct TraceRequest {
    prefix: String,
    start_device: String,
    vrf: Option<String>,
}

async fn trace(State(state): State<Arc<AppState>>, Json(req): Json<TraceRequest>) -> Result<Json<serde_json::Value>, ApiError> {
    let inventory = state.inventory.read().unwrap().clone();
    if !inventory.hostnames().any(|h| h == req.start_device) {
        return Err(ApiError::DeviceNotFound(req.start_device));
    }

    let start = Instant::now();
    let result = state
        .walker
        .trace(inventory, &req.prefix, &req.start_device, &default_vrf(req.vrf), HashSet::new(), budget(&state))
        .await?;
    let elapsed = start.elapsed().as_secs_f64() * 1000.0;

    let json = serde_json::to_value(&result).map_err(|e| ApiError::InvalidInput(e.to_string()))?;
    record_history(
        &state.history,
        "trace",
        None,
        Some(&req.start_device),
        Some(&req.prefix),
        &json,
        elapsed,
    );
    Ok(Json(json))
}

#[derive(Debug, Deserialize)]
struct CompareRequest {
    source: String,
    destination: String,
    vrf: Option<String>,
}

async fn compare(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CompareRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let inventory = state.inventory.read().unwrap().clone();
    let start = Instant::now();
    let result = trace_reverse(&state.walker, inventory, &req.destination, &req.source, &default_vrf(req.vrf), budget(&state))
        .await?;
    let elapsed = start.elapsed().as_secs_f64() * 1000.0;

    let json = serde_json::to_value(&result).map_err(|e| ApiError::InvalidInput(e.to_string()))?;
    record_history(&state.history, "compare", Some(&req.source), Some(&req.destination), None, &json, elapsed);
    Ok(Json(json))
}

#[derive(Debug, Deserialize)]
struct SimulateRequest {
    source: String,
    destination: String,
    failed_node: String,
    vrf: Option<String>,
}

async fn simulate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SimulateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let inventory = state.inventory.read().unwrap().clone();
    let start = Instant::now();
    let result = simulate_failure(
        &state.walker,
        inventory,
        &req.source,
        &req.destination,
        &req.failed_node,
        &default_vrf(req.vrf),
        budget(&state),
    )
    .await?;
    let elapsed = start.elapsed().as_secs_f64() * 1000.0;

    let json = serde_json::to_value(&result).map_err(|e| ApiError::InvalidInput(e.to_string()))?;
    record_history(&state.history, "simulate", Some(&req.source), Some(&req.destination), None, &json, elapsed);
    Ok(Json(json))
}

#[derive(Debug, Deserialize)]
struct BlastRadiusRequest {
    failed_node: String,
}

async fn blast_radius_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BlastRadiusRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let topology = state.topology.read().unwrap().clone();
    let start = Instant::now();
    let result = blast_radius::calculate(&topology, &req.failed_node)?;
    let elapsed = start.elapsed().as_secs_f64() * 1000.0;

    let json = serde_json::to_value(&result).map_err(|e| ApiError::InvalidInput(e.to_string()))?;
    record_history(&state.history, "blast_radius", None, None, None, &json, elapsed);
    Ok(Json(json))
}

#[derive(Debug, Deserialize)]
struct OriginQuery {
    start_device: String,
}

#[derive(Debug, Serialize)]
struct OriginResponse {
    prefix: String,
    origin_type: netwalk_core::walker::OriginType,
    origin_router: Option<String>,
}

async fn origin(
    State(state): State<Arc<AppState>>,
    AxumPath(prefix): AxumPath<String>,
    Query(query): Query<OriginQuery>,
) -> Result<Json<OriginResponse>, ApiError> {
    let inventory = state.inventory.read().unwrap().clone();
    let result = state
        .walker
        .trace(inventory, &prefix, &query.start_device, "", HashSet::new(), budget(&state))
        .await?;
    Ok(Json(OriginResponse { prefix, origin_type: result.origin_type, origin_router: result.origin_router }))
}

async fn devices(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    let inventory = state.inventory.read().unwrap().clone();
    Json(inventory.hostnames().map(|s| s.to_string()).collect())
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let devices = state.inventory.read().unwrap().len();
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "devices": devices,
    }))
}

#[derive(Debug, Serialize)]
struct CollectedResponse {
    devices: Vec<String>,
    stale_warnings: Vec<String>,
}

async fn collected(State(state): State<Arc<AppState>>) -> Json<CollectedResponse> {
    let staleness = Duration::from_secs(state.config.staleness_secs);
    Json(CollectedResponse { devices: state.cache.hostnames(), stale_warnings: state.cache.stale_warnings(staleness) })
}

#[derive(Debug, Deserialize)]
struct HistoryListQuery {
    limit: Option<i64>,
    query_type: Option<String>,
}

async fn history_list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryListQuery>,
) -> Result<Json<Vec<crate::history::TraceRecordSummary>>, ApiError> {
    let history = state.history.clone();
    let limit = query.limit.unwrap_or(50);
    let records = tokio::task::spawn_blocking(move || history.list(limit, query.query_type.as_deref()))
        .await
        .map_err(|e| ApiError::History(e.to_string()))?
        .map_err(|e| ApiError::History(e.to_string()))?;
    Ok(Json(records))
}

async fn history_get(
    State(state): State<Arc<AppState>>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<TraceRecord>, ApiError> {
    let history = state.history.clone();
    let found = tokio::task::spawn_blocking(move || history.get(&id))
        .await
        .map_err(|e| ApiError::History(e.to_string()))?
        .map_err(|e| ApiError::History(e.to_string()))?;
    found.map(Json).ok_or_else(|| ApiError::InvalidInput("no such history record".to_string()))
}

async fn history_delete(State(state): State<Arc<AppState>>, AxumPath(id): AxumPath<String>) -> Result<Json<bool>, ApiError> {
    let history = state.history.clone();
    let deleted = tokio::task::spawn_blocking(move || history.delete(&id))
        .await
        .map_err(|e| ApiError::History(e.to_string()))?
        .map_err(|e| ApiError::History(e.to_string()))?;
    Ok(Json(deleted))
}

async fn history_clear(State(state): State<Arc<AppState>>) -> Result<Json<usize>, ApiError> {
    let history = state.history.clone();
    let cleared = tokio::task::spawn_blocking(move || history.clear())
        .await
        .map_err(|e| ApiError::History(e.to_string()))?
        .map_err(|e| ApiError::History(e.to_string()))?;
    Ok(Json(cleared))
}

async fn inventory_reload(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>, ApiError> {
    let inventory = crate::inventory_yaml::load(&state.config.inventory).map_err(|e| ApiError::InvalidInput(e.to_string()))?;
    let topology = InventoryGraph::from_inventory(&inventory);
    let device_count = inventory.len();

    *state.inventory.write().unwrap() = Arc::new(inventory);
    *state.topology.write().unwrap() = Arc::new(topology);
    state.cache.reload();

    Ok(Json(serde_json::json!({ "reloaded": true, "device_count": device_count })))
}

/// Persist a [`TraceRecord`] off the request's critical path: the write
/// itself is a blocking SQLite call, so it runs on a blocking-pool thread
/// spawned and forgotten rather than awaited by the handler (§5 — history
/// is never on the trace hot path).
#[allow(clippy::too_many_arguments)]
fn record_history(
    history: &Arc<HistoryStore>,
    query_type: &str,
    source: Option<&str>,
    destination: Option<&str>,
    prefix: Option<&str>,
    result_json: &serde_json::Value,
    query_time_ms: f64,
) {
    let record = TraceRecord {
        id: Uuid::new_v4().to_string(),
        timestamp: chrono::Utc::now(),
        query_type: query_type.to_string(),
        source: source.map(|s| s.to_string()),
        destination: destination.map(|s| s.to_string()),
        prefix: prefix.map(|s| s.to_string()),
        result_json: result_json.to_string(),
        query_time_ms: Some(query_time_ms),
    };
    let history = history.clone();
    tokio::task::spawn_blocking(move || {
        if let Err(err) = history.save(&record) {
            log::warn!("failed to save history record: {err}");
        }
    });
}
