//! Recording work queue for testing.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::queue::{AssetJob, QueueError, WorkQueue};

/// Work queue that records every dispatched job.
///
/// Optionally forwards jobs to another queue, so tests can count
/// dispatches while real workers consume them.
///
/// # Example
///
/// ```rust,ignore
/// use storyline_core::testing::RecordingWorkQueue;
///
/// let queue = RecordingWorkQueue::new();
/// queue.dispatch(AssetJob::new("asset-1")).await?;
/// assert_eq!(queue.dispatched_ids(), vec!["asset-1"]);
/// ```
#[derive(Default)]
pub struct RecordingWorkQueue {
    jobs: Mutex<Vec<AssetJob>>,
    next_error: Mutex<Option<QueueError>>,
    forward: Option<Arc<dyn WorkQueue>>,
}

impl RecordingWorkQueue {
    /// Record jobs without delivering them anywhere.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record jobs and hand them on to `inner`.
    pub fn forwarding(inner: Arc<dyn WorkQueue>) -> Self {
        Self {
            forward: Some(inner),
            ..Self::default()
        }
    }

    /// Fail the next dispatch with this error.
    pub fn fail_next(&self, error: QueueError) {
        if let Ok(mut next) = self.next_error.lock() {
            *next = Some(error);
        }
    }

    /// All jobs dispatched so far, in order.
    pub fn dispatched(&self) -> Vec<AssetJob> {
        self.jobs.lock().map(|jobs| jobs.clone()).unwrap_or_default()
    }

    /// Asset ids of all jobs dispatched so far, in order.
    pub fn dispatched_ids(&self) -> Vec<String> {
        self.dispatched()
            .into_iter()
            .map(|job| job.asset_id)
            .collect()
    }

    /// How many jobs were dispatched for one asset.
    pub fn dispatch_count(&self, asset_id: &str) -> usize {
        self.dispatched()
            .iter()
            .filter(|job| job.asset_id == asset_id)
            .count()
    }

    /// Forget recorded jobs.
    pub fn clear(&self) {
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.clear();
        }
    }
}

#[async_trait]
impl WorkQueue for RecordingWorkQueue {
    async fn dispatch(&self, job: AssetJob) -> Result<(), QueueError> {
        let failure = self.next_error.lock().ok().and_then(|mut next| next.take());
        if let Some(error) = failure {
            return Err(error);
        }

        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.push(job.clone());
        }

        match &self.forward {
            Some(inner) => inner.dispatch(job).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::LocalWorkQueue;

    #[tokio::test]
    async fn test_records_jobs() {
        let queue = RecordingWorkQueue::new();
        queue.dispatch(AssetJob::new("asset-1")).await.unwrap();
        queue.dispatch(AssetJob::new("asset-2")).await.unwrap();
        queue.dispatch(AssetJob::new("asset-1")).await.unwrap();

        assert_eq!(queue.dispatched_ids(), vec!["asset-1", "asset-2", "asset-1"]);
        assert_eq!(queue.dispatch_count("asset-1"), 2);

        queue.clear();
        assert!(queue.dispatched().is_empty());
    }

    #[tokio::test]
    async fn test_fail_next() {
        let queue = RecordingWorkQueue::new();
        queue.fail_next(QueueError::Dispatch("broker down".into()));

        assert!(queue.dispatch(AssetJob::new("asset-1")).await.is_err());
        assert!(queue.dispatch(AssetJob::new("asset-1")).await.is_ok());
        assert_eq!(queue.dispatch_count("asset-1"), 1);
    }

    #[tokio::test]
    async fn test_forwarding() {
        let (inner, mut rx) = LocalWorkQueue::new();
        let queue = RecordingWorkQueue::forwarding(Arc::new(inner));
        queue.dispatch(AssetJob::new("asset-1")).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().asset_id, "asset-1");
        assert_eq!(queue.dispatch_count("asset-1"), 1);
    }
}
