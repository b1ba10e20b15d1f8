use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storyline_core::{
    load_config, validate_config, AssetProcessor, AssetReporter, AssetReporting, AssetStore,
    CancelBus, Config, FaultInjector, HttpAssetReporter, InMemoryAssetStore, InMemoryStoryStore,
    LocalWorkQueue, SqliteStore, StoryEvents, StoryOrchestrator, StoryStore, WorkQueue,
    WorkerPool,
};

use storyline_server::api::{create_router, WsBroadcaster};
use storyline_server::state::AppState;

/// How long in-flight asset jobs get to finish on shutdown.
const WORKER_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("STORYLINE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);
    if config.faults.failure_rate > 0.0 {
        warn!(
            "Fault injection enabled: {:.0}% of store mutations will fail",
            config.faults.failure_rate * 100.0
        );
    }

    let events = StoryEvents::default();
    let (stories, assets) = open_stores(&config, events.clone())?;

    seed_stories(&config, stories.as_ref())?;

    // Work queue and worker pool
    let cancel_bus = CancelBus::new();
    let (queue, jobs) = LocalWorkQueue::new();

    let reporter: Arc<dyn AssetReporter> = match &config.worker.callback_url {
        Some(url) => {
            info!("Workers report over HTTP to {}", url);
            Arc::new(
                HttpAssetReporter::new(
                    url.clone(),
                    Duration::from_millis(config.worker.request_timeout_ms),
                )
                .context("Failed to create HTTP asset reporter")?,
            )
        }
        None => Arc::new(AssetReporting::new(Arc::clone(&assets))),
    };

    let processor = AssetProcessor::new(reporter, cancel_bus.clone(), &config.worker);
    let worker_pool = Arc::new(WorkerPool::new(processor, config.worker.concurrency));
    worker_pool.start(jobs);
    info!(
        "Worker pool started (concurrency: {})",
        config.worker.concurrency
    );

    // Orchestrator
    let queue: Arc<dyn WorkQueue> = Arc::new(queue);
    let orchestrator = Arc::new(StoryOrchestrator::new(
        config.orchestrator.clone(),
        Arc::clone(&stories),
        Arc::clone(&assets),
        queue,
        cancel_bus,
    ));

    if config.orchestrator.enabled {
        orchestrator.start().await;
        info!("Story orchestrator started");
    } else {
        info!("Orchestrator disabled in config");
    }

    // Push story snapshots to WebSocket clients on every change
    let ws_broadcaster = WsBroadcaster::default();
    let forwarder = ws_broadcaster.forward_story_changes(&events, Arc::clone(&stories));
    info!("WebSocket broadcaster initialized");

    // Create app state
    let state = Arc::new(
        AppState::new(config.clone(), stories, assets, ws_broadcaster)
            .with_orchestrator(Arc::clone(&orchestrator))
            .with_worker_pool(Arc::clone(&worker_pool)),
    );

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");

    if orchestrator.is_running() {
        info!("Stopping orchestrator...");
        orchestrator.stop().await;
        info!("Orchestrator stopped");
    }

    worker_pool.stop(WORKER_SHUTDOWN_GRACE).await;
    info!("Worker pool stopped");

    forwarder.abort();

    Ok(())
}

/// Open the configured stores.
///
/// With a database path, one SQLite file backs both stories and asset
/// records. Without one, both live in memory for the life of the process.
fn open_stores(
    config: &Config,
    events: StoryEvents,
) -> Result<(Arc<dyn StoryStore>, Arc<dyn AssetStore>)> {
    let faults = FaultInjector::new(config.faults.failure_rate);

    match &config.database.path {
        Some(path) => {
            let store = Arc::new(
                SqliteStore::new(path)
                    .with_context(|| format!("Failed to open database at {:?}", path))?
                    .with_faults(faults)
                    .with_events(events),
            );
            info!("SQLite store initialized");
            let stories: Arc<dyn StoryStore> = store.clone();
            let assets: Arc<dyn AssetStore> = store;
            Ok((stories, assets))
        }
        None => {
            info!("Using in-memory stores");
            let stories: Arc<dyn StoryStore> = Arc::new(
                InMemoryStoryStore::new()
                    .with_faults(faults)
                    .with_events(events),
            );
            let assets: Arc<dyn AssetStore> =
                Arc::new(InMemoryAssetStore::new().with_faults(faults));
            Ok((stories, assets))
        }
    }
}

/// Insert configured stories that the store does not know yet.
///
/// Stories persisted by an earlier run keep their status.
fn seed_stories(config: &Config, stories: &dyn StoryStore) -> Result<()> {
    let mut seeded = 0;
    for seed in &config.stories {
        if stories
            .get(&seed.id)
            .with_context(|| format!("Failed to look up story {}", seed.id))?
            .is_none()
        {
            stories
                .insert(seed.to_story())
                .with_context(|| format!("Failed to seed story {}", seed.id))?;
            seeded += 1;
        }
    }
    info!(
        "Story catalog ready ({} configured, {} newly seeded)",
        config.stories.len(),
        seeded
    );
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
