//! API-facing error type; maps core and adapter errors onto HTTP status
//! codes per §6.3's error mapping table.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use netwalk_core::{BlastRadiusError, InventoryError, WalkerError};

/// Every error the HTTP surface can return, already tagged with the status
/// code it maps to.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Unknown device, malformed prefix, unknown failed node (400/404).
    #[error("{0}")]
    InvalidInput(String),
    /// The named device is not in the inventory (404).
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    /// The collector layer failed in a way the walker could not absorb (502).
    #[error("collector failure: {0}")]
    CollectorFailure(String),
    /// A trace's deadline elapsed (504).
    #[error("trace timed out")]
    Timeout,
    /// Inventory load or reload failed (500).
    #[error("inventory error: {0}")]
    Inventory(#[from] InventoryError),
    /// Blast-radius calculation failed: unknown node (404).
    #[error("blast radius error: {0}")]
    BlastRadius(#[from] BlastRadiusError),
    /// History store failure (500).
    #[error("history store error: {0}")]
    History(String),
}

impl From<WalkerError> for ApiError {
    fn from(err: WalkerError) -> Self {
        match err {
            WalkerError::DeadlineExceeded => ApiError::Timeout,
            other => ApiError::InvalidInput(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::DeviceNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::CollectorFailure(_) => StatusCode::BAD_GATEWAY,
            ApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Inventory(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BlastRadius(_) => StatusCode::NOT_FOUND,
            ApiError::History(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
