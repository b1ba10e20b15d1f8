//! Work queue carrying asset processing jobs to the worker pool.
//!
//! Delivery is at-least-once with no ordering guarantee across jobs;
//! workers tolerate duplicates and stale jobs.

mod local;

pub use local::{JobReceiver, LocalWorkQueue};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Payload of one asset processing job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetJob {
    /// Asset to process.
    pub asset_id: String,
}

impl AssetJob {
    pub fn new(asset_id: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
        }
    }
}

/// Errors from dispatching jobs.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The consuming side is gone.
    #[error("work queue closed")]
    Closed,

    /// Transport failure.
    #[error("dispatch failed: {0}")]
    Dispatch(String),
}

/// Trait for job queue transports.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Hand a job to the worker pool.
    async fn dispatch(&self, job: AssetJob) -> Result<(), QueueError>;
}
