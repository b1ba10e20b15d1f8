//! Story API tests.
//!
//! These run the full router in-process against in-memory stores. The
//! orchestrator is driven one tick at a time so every transition is
//! observable through the API.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use storyline_core::orchestrator::{CleanResult, DownloadResult};
use storyline_core::{StoryStatus, StoryStore, TickOutcome};

use common::{TestConfig, TestFixture};

// =============================================================================
// Basic API Tests
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/health").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_config_endpoint_is_sanitized() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/config").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["story_count"], 3);
    assert_eq!(response.body["database"]["backend"], "memory");
    assert_eq!(response.body["worker"]["http_callbacks"], false);
    assert!(response.body.get("stories").is_none());
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/nope").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Story Queries
// =============================================================================

#[tokio::test]
async fn test_list_stories_returns_seeded_catalog() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/stories").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["total"], 3);
    let stories = response.body["stories"].as_array().unwrap();
    assert!(stories.iter().all(|s| s["status"] == "idle"));

    let story_2 = stories.iter().find(|s| s["id"] == "story-2").unwrap();
    assert_eq!(
        story_2["required_asset_ids"],
        serde_json::json!(["asset-3", "asset-4"])
    );
}

#[tokio::test]
async fn test_list_stories_filters_by_status() {
    let fixture = TestFixture::new().await;
    fixture.post("/api/v1/stories/story-2/download").await;

    let response = fixture.get("/api/v1/stories?status=scheduled").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["total"], 1);
    assert_eq!(response.body["stories"][0]["id"], "story-2");
}

#[tokio::test]
async fn test_list_stories_rejects_unknown_status() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/stories?status=paused").await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["error"]
        .as_str()
        .unwrap()
        .contains("paused"));
}

#[tokio::test]
async fn test_get_story() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/stories/story-3").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["title"], "Story 3");
    assert_eq!(response.body["status"], "idle");
}

#[tokio::test]
async fn test_get_missing_story_returns_404() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/stories/story-404").await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Story Commands
// =============================================================================

#[tokio::test]
async fn test_download_schedules_story() {
    let fixture = TestFixture::new().await;

    let response = fixture.post("/api/v1/stories/story-1/download").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "scheduled");
    assert_eq!(fixture.status("story-1"), StoryStatus::Scheduled);
}

#[tokio::test]
async fn test_commands_on_missing_story_return_404() {
    let fixture = TestFixture::new().await;

    for command in ["download", "cancel", "clean"] {
        let response = fixture
            .post(&format!("/api/v1/stories/ghost/{}", command))
            .await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{}", command);
    }

    // Nothing was created or changed.
    let listing = fixture.get("/api/v1/stories").await;
    assert_eq!(listing.body["total"], 3);
    for story in listing.body["stories"].as_array().unwrap() {
        assert_eq!(story["status"], "idle");
    }
    let ghost = fixture.get("/api/v1/stories/ghost").await;
    assert_eq!(ghost.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancel_scheduled_story_returns_to_idle() {
    let fixture = TestFixture::new().await;
    fixture.post("/api/v1/stories/story-1/download").await;

    let response = fixture.post("/api/v1/stories/story-1/cancel").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "idle");
}

#[tokio::test]
async fn test_cancel_downloading_story_requests_cancellation() {
    let fixture = TestFixture::new().await;
    fixture
        .stories
        .update_status("story-1", StoryStatus::Downloading)
        .unwrap();

    let response = fixture.post("/api/v1/stories/story-1/cancel").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "canceling");
}

#[tokio::test]
async fn test_clean_schedules_cleaning() {
    let fixture = TestFixture::new().await;

    let response = fixture.post("/api/v1/stories/story-3/clean").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "scheduled_cleaning");
}

// =============================================================================
// Download / Clean Flow
// =============================================================================

#[tokio::test]
async fn test_download_and_clean_through_api() {
    let fixture = TestFixture::with_config(TestConfig::with_workers()).await;
    let orchestrator = fixture.orchestrator();

    fixture.post("/api/v1/stories/story-1/download").await;
    let outcome = orchestrator.tick().await.unwrap();
    assert_eq!(
        outcome,
        TickOutcome::Downloaded {
            story_id: "story-1".to_string(),
            result: DownloadResult::Downloaded,
        }
    );

    let story = fixture.get("/api/v1/stories/story-1").await;
    assert_eq!(story.body["status"], "downloaded");

    let assets = fixture.get("/api/v1/assets").await;
    assert_eq!(assets.body["total"], 3);
    assert!(assets.body["assets"]
        .as_array()
        .unwrap()
        .iter()
        .all(|a| a["started"] == true && a["finished"] == true));

    fixture.post("/api/v1/stories/story-1/clean").await;
    let outcome = orchestrator.tick().await.unwrap();
    assert_eq!(
        outcome,
        TickOutcome::Cleaned {
            story_id: "story-1".to_string(),
            result: CleanResult::Cleaned {
                released: vec![
                    "asset-1".to_string(),
                    "asset-2".to_string(),
                    "asset-3".to_string(),
                ],
            },
        }
    );

    let story = fixture.get("/api/v1/stories/story-1").await;
    assert_eq!(story.body["status"], "idle");
    let assets = fixture.get("/api/v1/assets").await;
    assert_eq!(assets.body["total"], 0);
}

#[tokio::test]
async fn test_shared_asset_survives_clean_of_one_story() {
    let fixture = TestFixture::with_config(TestConfig::with_workers()).await;
    let orchestrator = fixture.orchestrator();

    fixture.post("/api/v1/stories/story-1/download").await;
    orchestrator.tick().await.unwrap();
    fixture.post("/api/v1/stories/story-2/download").await;
    orchestrator.tick().await.unwrap();

    // asset-3 was finished by story-1's download
    assert_eq!(fixture.queue.dispatch_count("asset-3"), 1);

    fixture.post("/api/v1/stories/story-1/clean").await;
    orchestrator.tick().await.unwrap();

    let shared = fixture.get("/api/v1/assets/asset-3").await;
    assert_eq!(shared.status, StatusCode::OK);
    let released = fixture.get("/api/v1/assets/asset-1").await;
    assert_eq!(released.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Orchestrator API
// =============================================================================

#[tokio::test]
async fn test_orchestrator_status_counts_stories() {
    let fixture = TestFixture::new().await;
    fixture.post("/api/v1/stories/story-1/download").await;
    fixture.post("/api/v1/stories/story-2/clean").await;

    let response = fixture.get("/api/v1/orchestrator/status").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["available"], true);
    assert_eq!(response.body["running"], false);
    assert_eq!(response.body["scheduled_count"], 1);
    assert_eq!(response.body["scheduled_cleaning_count"], 1);
    assert!(response.body.get("worker_pool").is_none());
}

#[tokio::test]
async fn test_orchestrator_status_includes_worker_pool() {
    let fixture = TestFixture::with_config(TestConfig::with_workers()).await;

    let response = fixture.get("/api/v1/orchestrator/status").await;

    assert_eq!(response.body["worker_pool"]["running"], true);
    assert_eq!(response.body["worker_pool"]["active_jobs"], 0);
}

#[tokio::test]
async fn test_orchestrator_start_and_stop() {
    let fixture = TestFixture::new().await;

    let response = fixture.post("/api/v1/orchestrator/start").await;
    assert_eq!(response.status, StatusCode::OK);
    let status = fixture.get("/api/v1/orchestrator/status").await;
    assert_eq!(status.body["running"], true);

    let response = fixture.post("/api/v1/orchestrator/stop").await;
    assert_eq!(response.status, StatusCode::OK);
    let status = fixture.get("/api/v1/orchestrator/status").await;
    assert_eq!(status.body["running"], false);
}

#[tokio::test]
async fn test_running_orchestrator_downloads_scheduled_story() {
    let fixture = TestFixture::with_config(TestConfig::with_workers()).await;
    fixture.post("/api/v1/orchestrator/start").await;

    fixture.post("/api/v1/stories/story-3/download").await;

    let downloaded = fixture
        .wait_for(
            || fixture.status("story-3") == StoryStatus::Downloaded,
            Duration::from_secs(5),
        )
        .await;
    assert!(downloaded, "story-3 should finish downloading");

    fixture.post("/api/v1/orchestrator/stop").await;
}

#[tokio::test]
async fn test_orchestrator_unavailable() {
    let fixture = TestFixture::with_config(TestConfig::without_orchestrator()).await;

    let status = fixture.get("/api/v1/orchestrator/status").await;
    assert_eq!(status.status, StatusCode::OK);
    assert_eq!(status.body["available"], false);

    let start = fixture.post("/api/v1/orchestrator/start").await;
    assert_eq!(start.status, StatusCode::SERVICE_UNAVAILABLE);
    let stop = fixture.post("/api/v1/orchestrator/stop").await;
    assert_eq!(stop.status, StatusCode::SERVICE_UNAVAILABLE);
}

// =============================================================================
// Metrics
// =============================================================================

#[tokio::test]
async fn test_metrics_endpoint_reports_story_gauges() {
    let fixture = TestFixture::new().await;
    fixture.post("/api/v1/stories/story-1/download").await;

    let (status, body) = fixture.get_text("/api/v1/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("storyline_stories_by_status"));
    assert!(body.contains("storyline_http_requests_total"));
}
