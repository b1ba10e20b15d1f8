//! Types for the story orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::queue::QueueError;
use crate::store::StoreError;

/// Errors that can occur during one orchestrator iteration.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Story or asset store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Work queue failure.
    #[error("work queue error: {0}")]
    Queue(#[from] QueueError),
}

impl OrchestratorError {
    /// Whether the iteration simply lost a simulated storage coin flip.
    pub fn is_transient(&self) -> bool {
        matches!(self, OrchestratorError::Store(e) if e.is_transient())
    }
}

/// What one call to `tick` did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickOutcome {
    /// No story was pending.
    Idle,
    /// A download workflow ran for the story.
    Downloaded { story_id: String, result: DownloadResult },
    /// A clean workflow ran for the story.
    Cleaned { story_id: String, result: CleanResult },
}

/// How a download workflow ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadResult {
    /// Every required asset finished.
    Downloaded,
    /// The story was cancelled and is now idle.
    Canceled,
    /// An asset stalled and the story is now in error.
    Stalled,
    /// The story disappeared mid-download.
    Vanished,
    /// The story was no longer scheduled when the workflow started.
    Skipped,
}

impl DownloadResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadResult::Downloaded => "downloaded",
            DownloadResult::Canceled => "canceled",
            DownloadResult::Stalled => "stalled",
            DownloadResult::Vanished => "vanished",
            DownloadResult::Skipped => "skipped",
        }
    }
}

/// How a clean workflow ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanResult {
    /// Story is idle again; lists the asset records released.
    Cleaned { released: Vec<String> },
    /// The story disappeared before cleaning.
    Skipped,
}

/// Current status of the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    /// Whether the loop is running.
    pub running: bool,
    /// Stories waiting for a download.
    pub scheduled_count: usize,
    /// Stories waiting for a clean.
    pub scheduled_cleaning_count: usize,
    /// Stories currently downloading (0 or 1).
    pub downloading_count: usize,
    /// Stories in error.
    pub error_count: usize,
    /// Asset records currently tracked.
    pub asset_records: usize,
}
