//! Story API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storyline_core::{StoreError, Story, StoryFilter, StoryStatus};
use tracing::warn;

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing stories
#[derive(Debug, Deserialize)]
pub struct ListStoriesParams {
    /// Filter by status (e.g. "downloading")
    pub status: Option<String>,
}

/// Story as returned by the API and pushed over the WebSocket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryResponse {
    pub id: String,
    pub title: String,
    pub status: StoryStatus,
    pub status_changed_at: String,
    pub required_asset_ids: Vec<String>,
}

impl From<Story> for StoryResponse {
    fn from(story: Story) -> Self {
        Self {
            id: story.id,
            title: story.title,
            status: story.status,
            status_changed_at: story.status_changed_at.to_rfc3339(),
            required_asset_ids: story.required_asset_ids,
        }
    }
}

/// Response for listing stories
#[derive(Debug, Serialize)]
pub struct ListStoriesResponse {
    pub stories: Vec<StoryResponse>,
    pub total: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct StoryErrorResponse {
    pub error: String,
}

type StoryResult<T> = Result<Json<T>, (StatusCode, Json<StoryErrorResponse>)>;

fn error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<StoryErrorResponse>) {
    (
        status,
        Json(StoryErrorResponse {
            error: message.into(),
        }),
    )
}

fn store_error(e: StoreError) -> (StatusCode, Json<StoryErrorResponse>) {
    match e {
        StoreError::NotFound(id) => error(StatusCode::NOT_FOUND, format!("Story not found: {}", id)),
        StoreError::TransientFault(_) => {
            warn!("Story command hit a transient fault: {}", e);
            error(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
        StoreError::Database(_) => error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Current snapshot of every story.
pub fn snapshot(state: &AppState) -> Result<Vec<StoryResponse>, StoreError> {
    Ok(state
        .stories()
        .list(&StoryFilter::new())?
        .into_iter()
        .map(StoryResponse::from)
        .collect())
}

// ============================================================================
// Handlers
// ============================================================================

/// List stories
pub async fn list_stories(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListStoriesParams>,
) -> StoryResult<ListStoriesResponse> {
    let mut filter = StoryFilter::new();
    if let Some(ref status) = params.status {
        let status = StoryStatus::parse(status)
            .ok_or_else(|| error(StatusCode::BAD_REQUEST, format!("Unknown status: {}", status)))?;
        filter = filter.with_statuses([status]);
    }

    let stories: Vec<StoryResponse> = state
        .stories()
        .list(&filter)
        .map_err(store_error)?
        .into_iter()
        .map(StoryResponse::from)
        .collect();

    Ok(Json(ListStoriesResponse {
        total: stories.len(),
        stories,
    }))
}

/// Get a story by id
pub async fn get_story(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> StoryResult<StoryResponse> {
    match state.stories().get(&id).map_err(store_error)? {
        Some(story) => Ok(Json(story.into())),
        None => Err(error(
            StatusCode::NOT_FOUND,
            format!("Story not found: {}", id),
        )),
    }
}

/// Schedule a story for download
pub async fn download_story(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> StoryResult<StoryResponse> {
    command_result(&id, state.commands().schedule_download(&id))
}

/// Cancel a story's download
pub async fn cancel_story(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> StoryResult<StoryResponse> {
    command_result(&id, state.commands().cancel_download(&id))
}

/// Schedule a story for cleaning
pub async fn clean_story(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> StoryResult<StoryResponse> {
    command_result(&id, state.commands().schedule_clean(&id))
}

fn command_result(
    id: &str,
    result: Result<Option<Story>, StoreError>,
) -> StoryResult<StoryResponse> {
    match result.map_err(store_error)? {
        Some(story) => Ok(Json(story.into())),
        None => Err(error(
            StatusCode::NOT_FOUND,
            format!("Story not found: {}", id),
        )),
    }
}
