//! Orchestrator API handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use storyline_core::worker::PoolStatus;
use storyline_core::OrchestratorStatus;

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

/// Orchestrator status response
#[derive(Debug, Serialize)]
pub struct OrchestratorStatusResponse {
    /// Whether an orchestrator was configured
    pub available: bool,
    #[serde(flatten)]
    pub status: OrchestratorStatus,
    /// In-process worker pool, when one is running
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_pool: Option<PoolStatus>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct OrchestratorErrorResponse {
    pub error: String,
}

/// Simple message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Get orchestrator status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<OrchestratorStatusResponse> {
    let worker_pool = state.worker_pool().map(|pool| pool.status());

    match state.orchestrator() {
        Some(orch) => Json(OrchestratorStatusResponse {
            available: true,
            status: orch.status(),
            worker_pool,
        }),
        None => Json(OrchestratorStatusResponse {
            available: false,
            status: OrchestratorStatus::default(),
            worker_pool,
        }),
    }
}

/// Start the orchestrator
pub async fn start(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MessageResponse>, impl IntoResponse> {
    match state.orchestrator() {
        Some(orch) => {
            orch.start().await;
            Ok(Json(MessageResponse {
                message: "Orchestrator started".to_string(),
            }))
        }
        None => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(OrchestratorErrorResponse {
                error: "Orchestrator not available".to_string(),
            }),
        )),
    }
}

/// Stop the orchestrator
pub async fn stop(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MessageResponse>, impl IntoResponse> {
    match state.orchestrator() {
        Some(orch) => {
            orch.stop().await;
            Ok(Json(MessageResponse {
                message: "Orchestrator stopped".to_string(),
            }))
        }
        None => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(OrchestratorErrorResponse {
                error: "Orchestrator not available".to_string(),
            }),
        )),
    }
}
