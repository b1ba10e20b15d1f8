//! Asset record API handlers and worker callbacks.
//!
//! The callbacks answer a missing record with 404 and
//! `{"acknowledged": false}` so remote workers can tell "give up" apart
//! from "try again later" (503).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use storyline_core::{Acknowledgement, AssetRecord, StoreError};
use tracing::{debug, warn};

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

/// Asset record as returned by the API
#[derive(Debug, Serialize)]
pub struct AssetResponse {
    pub id: String,
    pub started: bool,
    pub finished: bool,
    pub last_heartbeat_at: String,
    pub created_at: String,
}

impl From<AssetRecord> for AssetResponse {
    fn from(record: AssetRecord) -> Self {
        Self {
            id: record.id,
            started: record.started,
            finished: record.finished,
            last_heartbeat_at: record.last_heartbeat_at.to_rfc3339(),
            created_at: record.created_at.to_rfc3339(),
        }
    }
}

/// Response for listing asset records
#[derive(Debug, Serialize)]
pub struct ListAssetsResponse {
    pub assets: Vec<AssetResponse>,
    pub total: usize,
}

/// Response for the upload callback
#[derive(Debug, Serialize)]
pub struct UploadResponse {}

/// Error response
#[derive(Debug, Serialize)]
pub struct AssetErrorResponse {
    pub error: String,
}

fn error_response(e: StoreError) -> Response {
    let status = match e {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::TransientFault(_) => StatusCode::SERVICE_UNAVAILABLE,
        StoreError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(AssetErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

fn callback_response(
    asset_id: &str,
    callback: &str,
    result: Result<Acknowledgement, StoreError>,
) -> Result<Acknowledgement, Response> {
    match result {
        Ok(ack) if ack.acknowledged => {
            debug!("{} for asset {}", callback, asset_id);
            Ok(ack)
        }
        Ok(ack) => Err((StatusCode::NOT_FOUND, Json(ack)).into_response()),
        Err(e) => {
            warn!("{} for asset {} failed: {}", callback, asset_id, e);
            Err(error_response(e))
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// List asset records
pub async fn list_assets(State(state): State<Arc<AppState>>) -> Response {
    match state.assets().list() {
        Ok(records) => {
            let assets: Vec<AssetResponse> = records.into_iter().map(AssetResponse::from).collect();
            Json(ListAssetsResponse {
                total: assets.len(),
                assets,
            })
            .into_response()
        }
        Err(e) => error_response(e),
    }
}

/// Get an asset record by id
pub async fn get_asset(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.assets().get(&id) {
        Ok(Some(record)) => Json(AssetResponse::from(record)).into_response(),
        Ok(None) => error_response(StoreError::NotFound(id)),
        Err(e) => error_response(e),
    }
}

/// Worker callback: processing started
pub async fn processing_started(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Acknowledgement>, Response> {
    let result = state.reporting().processing_started(&id);
    callback_response(&id, "processing-started", result).map(Json)
}

/// Worker callback: still alive
pub async fn report_health(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Acknowledgement>, Response> {
    let result = state.reporting().report_health(&id);
    callback_response(&id, "report-health", result).map(Json)
}

/// Worker callback: asset finished
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UploadResponse>, Response> {
    let result = state.reporting().upload(&id);
    callback_response(&id, "upload", result).map(|_| Json(UploadResponse {}))
}
