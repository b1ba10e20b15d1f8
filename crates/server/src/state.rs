use std::sync::Arc;
use storyline_core::{
    AssetReporting, AssetStore, CommandHandler, Config, SanitizedConfig, StoryOrchestrator,
    StoryStore, WorkerPool,
};

use crate::api::WsBroadcaster;

/// Shared application state
pub struct AppState {
    config: Config,
    stories: Arc<dyn StoryStore>,
    assets: Arc<dyn AssetStore>,
    commands: CommandHandler,
    reporting: AssetReporting,
    ws_broadcaster: WsBroadcaster,
    orchestrator: Option<Arc<StoryOrchestrator>>,
    worker_pool: Option<Arc<WorkerPool>>,
}

impl AppState {
    pub fn new(
        config: Config,
        stories: Arc<dyn StoryStore>,
        assets: Arc<dyn AssetStore>,
        ws_broadcaster: WsBroadcaster,
    ) -> Self {
        Self {
            config,
            commands: CommandHandler::new(Arc::clone(&stories)),
            reporting: AssetReporting::new(Arc::clone(&assets)),
            stories,
            assets,
            ws_broadcaster,
            orchestrator: None,
            worker_pool: None,
        }
    }

    pub fn with_orchestrator(mut self, orchestrator: Arc<StoryOrchestrator>) -> Self {
        self.orchestrator = Some(orchestrator);
        self
    }

    pub fn with_worker_pool(mut self, pool: Arc<WorkerPool>) -> Self {
        self.worker_pool = Some(pool);
        self
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn stories(&self) -> &dyn StoryStore {
        self.stories.as_ref()
    }

    pub fn assets(&self) -> &dyn AssetStore {
        self.assets.as_ref()
    }

    pub fn commands(&self) -> &CommandHandler {
        &self.commands
    }

    pub fn reporting(&self) -> &AssetReporting {
        &self.reporting
    }

    pub fn ws_broadcaster(&self) -> &WsBroadcaster {
        &self.ws_broadcaster
    }

    pub fn orchestrator(&self) -> Option<&Arc<StoryOrchestrator>> {
        self.orchestrator.as_ref()
    }

    pub fn worker_pool(&self) -> Option<&Arc<WorkerPool>> {
        self.worker_pool.as_ref()
    }
}
