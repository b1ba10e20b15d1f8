//! In-process work queue.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{AssetJob, QueueError, WorkQueue};

/// Receiving half of a [`LocalWorkQueue`], consumed by the worker pool.
pub type JobReceiver = mpsc::UnboundedReceiver<AssetJob>;

/// Work queue backed by an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct LocalWorkQueue {
    tx: mpsc::UnboundedSender<AssetJob>,
}

impl LocalWorkQueue {
    /// Create a queue and its receiving half.
    pub fn new() -> (Self, JobReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl WorkQueue for LocalWorkQueue {
    async fn dispatch(&self, job: AssetJob) -> Result<(), QueueError> {
        self.tx.send(job).map_err(|_| QueueError::Closed)
    }
}
