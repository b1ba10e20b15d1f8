use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::{assets, handlers, middleware::metrics_middleware, orchestrator, stories, ws};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health, config and metrics
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::metrics))
        // Orchestrator
        .route("/orchestrator/status", get(orchestrator::get_status))
        .route("/orchestrator/start", post(orchestrator::start))
        .route("/orchestrator/stop", post(orchestrator::stop))
        // Stories
        .route("/stories", get(stories::list_stories))
        .route("/stories/{id}", get(stories::get_story))
        .route("/stories/{id}/download", post(stories::download_story))
        .route("/stories/{id}/cancel", post(stories::cancel_story))
        .route("/stories/{id}/clean", post(stories::clean_story))
        // Assets (worker callbacks)
        .route("/assets", get(assets::list_assets))
        .route("/assets/{id}", get(assets::get_asset))
        .route(
            "/assets/{id}/processing-started",
            post(assets::processing_started),
        )
        .route("/assets/{id}/report-health", post(assets::report_health))
        .route("/assets/{id}/upload", post(assets::upload))
        // Live story updates
        .route("/ws", get(ws::ws_handler))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
