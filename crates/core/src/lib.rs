pub mod asset;
pub mod cancel;
pub mod config;
pub mod events;
pub mod metrics;
pub mod orchestrator;
pub mod queue;
pub mod store;
pub mod story;
pub mod testing;
pub mod worker;

pub use asset::{AssetRecord, AssetStore, InMemoryAssetStore, StallPolicy};
pub use cancel::{CancelBus, CancelSubscription};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
    StorySeed,
};
pub use events::{StoryChanged, StoryEvents};
pub use orchestrator::{
    AssetReporting, CommandHandler, OrchestratorConfig, OrchestratorError, OrchestratorStatus,
    StoryOrchestrator, TickOutcome,
};
pub use queue::{AssetJob, JobReceiver, LocalWorkQueue, QueueError, WorkQueue};
pub use store::{FaultInjector, SqliteStore, StoreError};
pub use story::{InMemoryStoryStore, Story, StoryFilter, StoryStatus, StoryStore};
pub use worker::{
    Acknowledgement, AssetProcessor, AssetReporter, HttpAssetReporter, JobOutcome, ReportError,
    WorkerConfig, WorkerPool,
};
