//! Callbacks from asset workers to the orchestrator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Response to a worker callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub acknowledged: bool,
}

impl Acknowledgement {
    pub fn accepted() -> Self {
        Self { acknowledged: true }
    }

    pub fn rejected() -> Self {
        Self {
            acknowledged: false,
        }
    }
}

/// Errors reaching the orchestrator.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The orchestrator hit a transient fault; the callback had no effect.
    #[error("transient fault: {0}")]
    Transient(String),

    /// The callback could not be delivered.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Trait for reporting asset progress to the orchestrator.
///
/// A missing asset record is never an error here: it surfaces as
/// `false` / a rejected acknowledgement.
#[async_trait]
pub trait AssetReporter: Send + Sync {
    /// Whether the asset's processing record still exists.
    async fn asset_exists(&self, asset_id: &str) -> Result<bool, ReportError>;

    /// Processing started. Sets `started` and refreshes the heartbeat.
    async fn report_started(&self, asset_id: &str) -> Result<Acknowledgement, ReportError>;

    /// Still alive. Refreshes the heartbeat.
    async fn report_heartbeat(&self, asset_id: &str) -> Result<Acknowledgement, ReportError>;

    /// All work done. Sets `finished`.
    async fn report_finished(&self, asset_id: &str) -> Result<Acknowledgement, ReportError>;
}
