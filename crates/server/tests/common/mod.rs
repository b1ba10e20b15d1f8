//! Common test utilities for in-process API testing.
//!
//! The fixture wires in-memory stores, an orchestrator that tests drive
//! tick by tick, and optionally a real worker pool, then exposes the full
//! router for oneshot requests or a live listener.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use storyline_core::{
    testing::RecordingWorkQueue, AssetProcessor, AssetReporter, AssetReporting, CancelBus,
    Config, InMemoryAssetStore, InMemoryStoryStore, LocalWorkQueue, OrchestratorConfig,
    StoryEvents, StoryOrchestrator, StoryStatus, StoryStore, WorkQueue, WorkerConfig, WorkerPool,
};
use storyline_server::api::{create_router, WsBroadcaster};
use storyline_server::state::AppState;

/// Re-export fixtures for test convenience
pub use storyline_core::testing::fixtures;

/// Test fixture for API testing.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_schedule_download() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.post("/api/v1/stories/story-1/download").await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    pub state: Arc<AppState>,
    pub stories: Arc<InMemoryStoryStore>,
    pub assets: Arc<InMemoryAssetStore>,
    /// Every job the orchestrator dispatched
    pub queue: Arc<RecordingWorkQueue>,
    pub cancel_bus: CancelBus,
    pub events: StoryEvents,
    pub orchestrator: Option<Arc<StoryOrchestrator>>,
    pub worker_pool: Option<Arc<WorkerPool>>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Configuration for the test fixture
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Wire an orchestrator into the app state
    pub orchestrator: bool,
    /// Run an in-process worker pool reporting straight to the asset store
    pub workers: Option<WorkerConfig>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            orchestrator: true,
            workers: None,
        }
    }
}

impl TestConfig {
    /// Fixture without an orchestrator (status reports unavailable).
    pub fn without_orchestrator() -> Self {
        Self {
            orchestrator: false,
            workers: None,
        }
    }

    /// Fixture with fast in-process workers.
    pub fn with_workers() -> Self {
        Self {
            orchestrator: true,
            workers: Some(fast_workers()),
        }
    }
}

/// Workers finishing an asset in about 30ms.
pub fn fast_workers() -> WorkerConfig {
    WorkerConfig {
        work_increments: 3,
        tick_interval_ms: 10,
        ..Default::default()
    }
}

/// Orchestrator timings short enough for tests.
pub fn fast_orchestrator() -> OrchestratorConfig {
    OrchestratorConfig {
        idle_interval_ms: 10,
        loop_interval_ms: 10,
        poll_interval_ms: 20,
        clean_settle_ms: 10,
        error_backoff_ms: 10,
        heartbeat_timeout_ms: 500,
        start_timeout_ms: 1000,
        ..Default::default()
    }
}

impl TestFixture {
    /// Create a fixture with the default demo stories and no workers.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let config = Config::default();
        let events = StoryEvents::default();

        let stories = Arc::new(InMemoryStoryStore::new().with_events(events.clone()));
        for seed in &config.stories {
            stories.insert(seed.to_story()).unwrap();
        }
        let assets = Arc::new(InMemoryAssetStore::new());
        let cancel_bus = CancelBus::new();

        let (queue, worker_pool) = match &test_config.workers {
            Some(worker_config) => {
                let (local, jobs) = LocalWorkQueue::new();
                let reporter: Arc<dyn AssetReporter> =
                    Arc::new(AssetReporting::new(assets.clone()));
                let pool = WorkerPool::new(
                    AssetProcessor::new(reporter, cancel_bus.clone(), worker_config),
                    worker_config.concurrency,
                );
                pool.start(jobs);
                let forward: Arc<dyn WorkQueue> = Arc::new(local);
                (
                    Arc::new(RecordingWorkQueue::forwarding(forward)),
                    Some(Arc::new(pool)),
                )
            }
            None => (Arc::new(RecordingWorkQueue::new()), None),
        };

        let orchestrator = test_config.orchestrator.then(|| {
            Arc::new(StoryOrchestrator::new(
                fast_orchestrator(),
                stories.clone(),
                assets.clone(),
                queue.clone(),
                cancel_bus.clone(),
            ))
        });

        let mut state = AppState::new(
            config,
            stories.clone(),
            assets.clone(),
            WsBroadcaster::default(),
        );
        if let Some(ref orch) = orchestrator {
            state = state.with_orchestrator(Arc::clone(orch));
        }
        if let Some(ref pool) = worker_pool {
            state = state.with_worker_pool(Arc::clone(pool));
        }
        let state = Arc::new(state);

        let router = create_router(Arc::clone(&state));

        Self {
            router,
            state,
            stories,
            assets,
            queue,
            cancel_bus,
            events,
            orchestrator,
            worker_pool,
        }
    }

    /// The orchestrator; panics when the fixture was built without one.
    pub fn orchestrator(&self) -> &Arc<StoryOrchestrator> {
        self.orchestrator
            .as_ref()
            .expect("fixture has no orchestrator")
    }

    /// Current status of a story straight from the store.
    pub fn status(&self, story_id: &str) -> StoryStatus {
        self.stories.get(story_id).unwrap().unwrap().status
    }

    /// Serve the router on an ephemeral port. Returns the base URL.
    pub async fn serve(&self) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = self.router.clone();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    /// Poll `condition` until it holds or `timeout` elapses.
    pub async fn wait_for<F: Fn() -> bool>(&self, condition: F, timeout: Duration) -> bool {
        let start = std::time::Instant::now();
        while start.elapsed() < timeout {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        condition()
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path).await
    }

    /// Send a POST request without a body.
    pub async fn post(&self, path: &str) -> TestResponse {
        self.request("POST", path).await
    }

    /// Send a GET request and return the raw body text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let (status, bytes) = self.send("GET", path).await;
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str) -> TestResponse {
        let (status, body_bytes) = self.send(method, path).await;

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }

    async fn send(&self, method: &str, path: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        (status, body_bytes.to_vec())
    }
}
