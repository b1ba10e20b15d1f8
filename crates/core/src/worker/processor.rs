//! Per-job asset processing.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cancel::CancelBus;
use crate::queue::AssetJob;

use super::config::WorkerConfig;
use super::reporter::{AssetReporter, ReportError};

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "reason")]
pub enum JobOutcome {
    /// All increments done and reported.
    Finished,
    /// A cancellation arrived mid-job.
    Cancelled,
    /// The processing record was deleted (before or during the job).
    RecordMissing,
    /// The orchestrator refused the start report.
    NotAcknowledged,
    /// A callback failed.
    Failed(String),
}

impl JobOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobOutcome::Finished => "finished",
            JobOutcome::Cancelled => "cancelled",
            JobOutcome::RecordMissing => "record_missing",
            JobOutcome::NotAcknowledged => "not_acknowledged",
            JobOutcome::Failed(_) => "failed",
        }
    }

    /// Whether the job ended in an error rather than a normal early exit.
    pub fn is_failure(&self) -> bool {
        matches!(self, JobOutcome::Failed(_))
    }
}

impl From<ReportError> for JobOutcome {
    fn from(err: ReportError) -> Self {
        JobOutcome::Failed(err.to_string())
    }
}

/// Runs one asset job: start, heartbeat per increment, finish.
///
/// The processor never decides liveness; a job that fails midway simply
/// stops heartbeating and the orchestrator's stall detector takes over.
pub struct AssetProcessor {
    reporter: Arc<dyn AssetReporter>,
    cancel_bus: CancelBus,
    work_increments: u32,
    tick_interval: Duration,
}

impl AssetProcessor {
    pub fn new(reporter: Arc<dyn AssetReporter>, cancel_bus: CancelBus, config: &WorkerConfig) -> Self {
        Self {
            reporter,
            cancel_bus,
            work_increments: config.work_increments,
            tick_interval: Duration::from_millis(config.tick_interval_ms),
        }
    }

    /// Process a job to completion or early exit.
    pub async fn process(&self, job: &AssetJob) -> JobOutcome {
        let outcome = match self.run(&job.asset_id).await {
            Ok(outcome) => outcome,
            Err(e) => e.into(),
        };

        match &outcome {
            JobOutcome::Finished => info!("Asset {} finished", job.asset_id),
            JobOutcome::Failed(reason) => warn!("Asset {} failed: {}", job.asset_id, reason),
            other => debug!("Asset {} exited early: {}", job.asset_id, other.as_str()),
        }

        crate::metrics::ASSET_JOBS_COMPLETED
            .with_label_values(&[outcome.as_str()])
            .inc();

        outcome
    }

    async fn run(&self, asset_id: &str) -> Result<JobOutcome, ReportError> {
        if !self.reporter.asset_exists(asset_id).await? {
            return Ok(JobOutcome::RecordMissing);
        }

        if !self.reporter.report_started(asset_id).await?.acknowledged {
            return Ok(JobOutcome::NotAcknowledged);
        }

        // Dropped on every return path below
        let mut cancellation = self.cancel_bus.subscribe();

        for increment in 0..self.work_increments {
            if cancellation.is_cancelled() {
                return Ok(JobOutcome::Cancelled);
            }
            if !self.reporter.asset_exists(asset_id).await? {
                return Ok(JobOutcome::RecordMissing);
            }
            if !self.reporter.report_heartbeat(asset_id).await?.acknowledged {
                return Ok(JobOutcome::RecordMissing);
            }
            debug!(
                "Asset {} increment {}/{}",
                asset_id,
                increment + 1,
                self.work_increments
            );

            tokio::select! {
                _ = tokio::time::sleep(self.tick_interval) => {}
                _ = cancellation.cancelled() => return Ok(JobOutcome::Cancelled),
            }
        }

        if cancellation.is_cancelled() {
            return Ok(JobOutcome::Cancelled);
        }

        self.reporter.report_finished(asset_id).await?;
        Ok(JobOutcome::Finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{AssetStore, InMemoryAssetStore};
    use crate::orchestrator::AssetReporting;
    use crate::worker::Acknowledgement;

    fn fast_config() -> WorkerConfig {
        WorkerConfig {
            work_increments: 3,
            tick_interval_ms: 10,
            ..Default::default()
        }
    }

    fn setup() -> (Arc<InMemoryAssetStore>, CancelBus, AssetProcessor) {
        let assets = Arc::new(InMemoryAssetStore::new());
        let bus = CancelBus::new();
        let reporter = Arc::new(AssetReporting::new(assets.clone()));
        let processor = AssetProcessor::new(reporter, bus.clone(), &fast_config());
        (assets, bus, processor)
    }

    #[tokio::test]
    async fn test_job_runs_to_finish() {
        let (assets, bus, processor) = setup();
        assets.create("asset-1").unwrap();

        let outcome = processor.process(&AssetJob::new("asset-1")).await;
        assert_eq!(outcome, JobOutcome::Finished);

        let record = assets.get("asset-1").unwrap().unwrap();
        assert!(record.started);
        assert!(record.finished);
        assert!(record.last_heartbeat_at >= record.created_at);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_record_aborts_silently() {
        let (assets, _bus, processor) = setup();

        let outcome = processor.process(&AssetJob::new("asset-1")).await;
        assert_eq!(outcome, JobOutcome::RecordMissing);
        assert!(assets.get("asset-1").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancellation_stops_before_finish() {
        let assets = Arc::new(InMemoryAssetStore::new());
        let bus = CancelBus::new();
        let reporter = Arc::new(AssetReporting::new(assets.clone()));
        let config = WorkerConfig {
            work_increments: 50,
            tick_interval_ms: 20,
            ..Default::default()
        };
        let processor = AssetProcessor::new(reporter, bus.clone(), &config);
        assets.create("asset-1").unwrap();

        let handle = tokio::spawn(async move { processor.process(&AssetJob::new("asset-1")).await });

        // Wait until the worker is subscribed
        for _ in 0..100 {
            if bus.subscriber_count() > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        bus.broadcast();

        let outcome = handle.await.unwrap();
        assert_eq!(outcome, JobOutcome::Cancelled);
        assert!(!assets.get("asset-1").unwrap().unwrap().finished);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_record_deleted_mid_job() {
        let assets = Arc::new(InMemoryAssetStore::new());
        let bus = CancelBus::new();
        let reporter = Arc::new(AssetReporting::new(assets.clone()));
        let config = WorkerConfig {
            work_increments: 50,
            tick_interval_ms: 20,
            ..Default::default()
        };
        let processor = AssetProcessor::new(reporter, bus.clone(), &config);
        assets.create("asset-1").unwrap();

        let handle = tokio::spawn(async move { processor.process(&AssetJob::new("asset-1")).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assets.delete("asset-1").unwrap();

        let outcome = handle.await.unwrap();
        assert_eq!(outcome, JobOutcome::RecordMissing);
        assert_eq!(bus.subscriber_count(), 0);
    }

    struct FlakyReporter;

    #[async_trait::async_trait]
    impl AssetReporter for FlakyReporter {
        async fn asset_exists(&self, _asset_id: &str) -> Result<bool, ReportError> {
            Ok(true)
        }

        async fn report_started(&self, _asset_id: &str) -> Result<Acknowledgement, ReportError> {
            Err(ReportError::Transient("mark_started".to_string()))
        }

        async fn report_heartbeat(&self, _asset_id: &str) -> Result<Acknowledgement, ReportError> {
            Ok(Acknowledgement::accepted())
        }

        async fn report_finished(&self, _asset_id: &str) -> Result<Acknowledgement, ReportError> {
            Ok(Acknowledgement::accepted())
        }
    }

    #[tokio::test]
    async fn test_transient_fault_fails_job() {
        let bus = CancelBus::new();
        let processor = AssetProcessor::new(Arc::new(FlakyReporter), bus.clone(), &fast_config());

        let outcome = processor.process(&AssetJob::new("asset-1")).await;
        assert!(outcome.is_failure());
        assert_eq!(bus.subscriber_count(), 0);
    }

    /// Accepts existence checks, refuses the start report, counts the rest.
    #[derive(Default)]
    struct RejectingReporter {
        later_calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl AssetReporter for RejectingReporter {
        async fn asset_exists(&self, _asset_id: &str) -> Result<bool, ReportError> {
            Ok(true)
        }

        async fn report_started(&self, _asset_id: &str) -> Result<Acknowledgement, ReportError> {
            Ok(Acknowledgement::rejected())
        }

        async fn report_heartbeat(&self, _asset_id: &str) -> Result<Acknowledgement, ReportError> {
            self.later_calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(Acknowledgement::accepted())
        }

        async fn report_finished(&self, _asset_id: &str) -> Result<Acknowledgement, ReportError> {
            self.later_calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(Acknowledgement::accepted())
        }
    }

    #[tokio::test]
    async fn test_rejected_start_exits_without_side_effects() {
        let bus = CancelBus::new();
        let reporter = Arc::new(RejectingReporter::default());
        let processor = AssetProcessor::new(reporter.clone(), bus.clone(), &fast_config());

        let outcome = processor.process(&AssetJob::new("asset-1")).await;

        assert_eq!(outcome, JobOutcome::NotAcknowledged);
        assert!(!outcome.is_failure());
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(
            reporter.later_calls.load(std::sync::atomic::Ordering::SeqCst),
            0
        );
    }
}
