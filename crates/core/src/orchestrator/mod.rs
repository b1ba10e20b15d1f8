//! Story orchestrator: the single-flight scheduler loop and the command and
//! callback surfaces that feed it.
//!
//! - **Commands** set story statuses on behalf of users
//! - **Reporting** applies worker callbacks to asset records
//! - **Runner** reconciles, collects orphans and advances one story at a time

mod commands;
mod config;
mod reporting;
mod runner;
mod types;

pub use commands::CommandHandler;
pub use config::OrchestratorConfig;
pub use reporting::AssetReporting;
pub use runner::StoryOrchestrator;
pub use types::{CleanResult, DownloadResult, OrchestratorError, OrchestratorStatus, TickOutcome};
