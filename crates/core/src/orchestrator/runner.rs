//! Story orchestrator implementation.
//!
//! One loop advances at most one story per iteration:
//! - Reconcile: stories left in an exclusive status are forced to `error`
//! - Collect: asset records no active story references are deleted
//! - Select: the most recently requested pending story is advanced
//! - Sleep, then loop

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::asset::AssetStore;
use crate::cancel::CancelBus;
use crate::queue::{AssetJob, WorkQueue};
use crate::store::StoreError;
use crate::story::{Story, StoryFilter, StoryStatus, StoryStore};

use super::config::OrchestratorConfig;
use super::types::{
    CleanResult, DownloadResult, OrchestratorError, OrchestratorStatus, TickOutcome,
};

/// How long `stop` waits for the in-flight iteration before aborting it.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Everything one iteration needs. Shared with the spawned loop.
struct Scheduler {
    config: OrchestratorConfig,
    stories: Arc<dyn StoryStore>,
    assets: Arc<dyn AssetStore>,
    queue: Arc<dyn WorkQueue>,
    cancel_bus: CancelBus,
}

/// The story orchestrator - drives scheduled stories through download and
/// cleanup, one at a time.
pub struct StoryOrchestrator {
    scheduler: Arc<Scheduler>,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl StoryOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: OrchestratorConfig,
        stories: Arc<dyn StoryStore>,
        assets: Arc<dyn AssetStore>,
        queue: Arc<dyn WorkQueue>,
        cancel_bus: CancelBus,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            scheduler: Arc::new(Scheduler {
                config,
                stories,
                assets,
                queue,
                cancel_bus,
            }),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            handle: Mutex::new(None),
        }
    }

    /// Start the orchestrator (spawns the scheduler loop).
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Orchestrator already running");
            return;
        }

        info!("Starting story orchestrator");

        let scheduler = Arc::clone(&self.scheduler);
        let running = Arc::clone(&self.running);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            info!("Scheduler loop started");
            loop {
                if !running.load(Ordering::Relaxed) {
                    break;
                }

                let pause = scheduler.iterate().await;

                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Scheduler loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(pause) => {}
                }
            }
            info!("Scheduler loop stopped");
        });

        *self.handle.lock().await = Some(handle);
    }

    /// Stop the orchestrator gracefully.
    ///
    /// The current iteration is allowed to finish within a grace period.
    /// A download still polling after that is aborted and its story is
    /// forced to `error` by reconciliation on the next start.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Orchestrator not running");
            return;
        }

        info!("Stopping story orchestrator");
        let _ = self.shutdown_tx.send(());

        if let Some(mut handle) = self.handle.lock().await.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await.is_err() {
                warn!("Scheduler iteration did not finish in time, aborting");
                handle.abort();
            }
        }

        info!("Story orchestrator stopped");
    }

    /// Whether the loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Get current orchestrator status.
    pub fn status(&self) -> OrchestratorStatus {
        let count = |status: StoryStatus| {
            self.scheduler
                .stories
                .list(&StoryFilter::new().with_statuses([status]))
                .map(|stories| stories.len())
                .unwrap_or(0)
        };

        OrchestratorStatus {
            running: self.is_running(),
            scheduled_count: count(StoryStatus::Scheduled),
            scheduled_cleaning_count: count(StoryStatus::ScheduledCleaning),
            downloading_count: count(StoryStatus::Downloading),
            error_count: count(StoryStatus::Error),
            asset_records: self
                .scheduler
                .assets
                .list()
                .map(|records| records.len())
                .unwrap_or(0),
        }
    }

    /// Run exactly one iteration: reconcile, collect, advance one story.
    pub async fn tick(&self) -> Result<TickOutcome, OrchestratorError> {
        self.scheduler.tick().await
    }
}

impl Scheduler {
    /// One loop body. Returns how long to sleep before the next one.
    async fn iterate(&self) -> Duration {
        match self.tick().await {
            Ok(TickOutcome::Idle) => {
                crate::metrics::LOOP_ITERATIONS
                    .with_label_values(&["idle"])
                    .inc();
                Duration::from_millis(self.config.idle_interval_ms)
            }
            Ok(outcome) => {
                debug!("Iteration finished: {:?}", outcome);
                crate::metrics::LOOP_ITERATIONS
                    .with_label_values(&["advanced"])
                    .inc();
                Duration::from_millis(self.config.loop_interval_ms)
            }
            Err(e) => {
                if e.is_transient() {
                    warn!("Iteration hit a transient fault: {}", e);
                } else {
                    error!("Iteration failed: {}", e);
                }
                crate::metrics::LOOP_ITERATIONS
                    .with_label_values(&["error"])
                    .inc();
                Duration::from_millis(self.config.error_backoff_ms)
            }
        }
    }

    async fn tick(&self) -> Result<TickOutcome, OrchestratorError> {
        self.reconcile()?;
        self.collect_garbage()?;

        let Some(story) = self.select_next()? else {
            return Ok(TickOutcome::Idle);
        };

        match story.status {
            StoryStatus::ScheduledCleaning => {
                let result = self.clean(&story.id).await?;
                Ok(TickOutcome::Cleaned {
                    story_id: story.id,
                    result,
                })
            }
            _ => {
                let result = self.download(&story.id).await?;
                Ok(TickOutcome::Downloaded {
                    story_id: story.id,
                    result,
                })
            }
        }
    }

    /// Force every story left in an exclusive status to `error`.
    ///
    /// Only the loop itself puts stories in these statuses, and it always
    /// moves them on before returning, so finding one here means an
    /// earlier iteration died midway.
    fn reconcile(&self) -> Result<(), OrchestratorError> {
        let stale = self.stories.list(&StoryFilter::new().with_statuses(
            StoryStatus::ALL.iter().copied().filter(StoryStatus::is_exclusive),
        ))?;

        for story in stale {
            warn!(
                "Story {} found in {} at loop start, marking as error",
                story.id, story.status
            );
            match self.set_status(&story.id, StoryStatus::Error) {
                Ok(_) | Err(StoreError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
            crate::metrics::STORIES_RECONCILED.inc();
        }

        Ok(())
    }

    /// Delete asset records that no non-idle story requires.
    fn collect_garbage(&self) -> Result<(), OrchestratorError> {
        let active = self
            .stories
            .list(&StoryFilter::new().excluding_status(StoryStatus::Idle))?;

        for record in self.assets.list()? {
            if active.iter().any(|story| story.requires(&record.id)) {
                continue;
            }
            if self.assets.delete(&record.id)? {
                debug!("Collected orphaned asset record {}", record.id);
                crate::metrics::ASSET_RECORDS_COLLECTED.inc();
            }
        }

        Ok(())
    }

    /// The pending story with the most recent status change.
    fn select_next(&self) -> Result<Option<Story>, OrchestratorError> {
        let pending = self.stories.list(&StoryFilter::new().with_statuses(
            StoryStatus::ALL.iter().copied().filter(StoryStatus::is_pending),
        ))?;

        Ok(pending
            .into_iter()
            .max_by_key(|story| story.status_changed_at))
    }

    async fn download(&self, story_id: &str) -> Result<DownloadResult, OrchestratorError> {
        let story = match self.stories.get(story_id)? {
            Some(story) if story.status == StoryStatus::Scheduled => story,
            Some(_) => {
                debug!("Story {} is no longer scheduled, skipping download", story_id);
                return Ok(DownloadResult::Skipped);
            }
            None => {
                debug!("Story {} not found, skipping download", story_id);
                return Ok(DownloadResult::Skipped);
            }
        };

        info!("Starting download of story {}", story_id);
        match self.set_status(story_id, StoryStatus::Downloading) {
            Ok(_) => {}
            Err(StoreError::NotFound(_)) => return Ok(DownloadResult::Skipped),
            Err(e) => return Err(e.into()),
        }
        let started = Instant::now();

        let mut pending = Vec::new();
        for asset_id in &story.required_asset_ids {
            if pending.contains(asset_id) {
                continue;
            }
            if let Some(record) = self.assets.get(asset_id)? {
                if record.finished {
                    debug!("Asset {} already finished, reusing", asset_id);
                    continue;
                }
            }
            pending.push(asset_id.clone());
        }

        for asset_id in &pending {
            // Resets any unfinished record left from an earlier attempt
            self.assets.create(asset_id)?;
            self.queue.dispatch(AssetJob::new(asset_id.as_str())).await?;
            crate::metrics::ASSET_JOBS_DISPATCHED.inc();
            debug!("Dispatched asset job for {}", asset_id);
        }

        let result = self.poll_download(story_id, &pending).await?;

        info!("Download of story {} ended: {}", story_id, result.as_str());
        crate::metrics::DOWNLOAD_DURATION
            .with_label_values(&[result.as_str()])
            .observe(started.elapsed().as_secs_f64());

        Ok(result)
    }

    async fn poll_download(
        &self,
        story_id: &str,
        pending: &[String],
    ) -> Result<DownloadResult, OrchestratorError> {
        let policy = self.config.stall_policy();
        let interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            let Some(story) = self.stories.get(story_id)? else {
                warn!("Story {} disappeared mid-download", story_id);
                self.cancel_bus.broadcast();
                return Ok(DownloadResult::Vanished);
            };

            if story.status == StoryStatus::Canceling {
                info!("Story {} canceled, stopping download", story_id);
                let updated = self.set_status(story_id, StoryStatus::Idle);
                self.cancel_bus.broadcast();
                updated?;
                return Ok(DownloadResult::Canceled);
            }

            let now = Utc::now();
            let mut stalled = None;
            let mut all_finished = true;
            for asset_id in pending {
                match self.assets.get(asset_id)? {
                    Some(record) if record.is_stalled(now, &policy) => {
                        stalled = Some(asset_id);
                        break;
                    }
                    Some(record) => all_finished &= record.finished,
                    // Deleted from under a running download
                    None => {
                        stalled = Some(asset_id);
                        break;
                    }
                }
            }

            if let Some(asset_id) = stalled {
                warn!("Asset {} stalled, story {} failed", asset_id, story_id);
                crate::metrics::STALL_DETECTIONS.inc();
                let updated = self.set_status(story_id, StoryStatus::Error);
                self.cancel_bus.broadcast();
                updated?;
                return Ok(DownloadResult::Stalled);
            }

            if all_finished {
                self.set_status(story_id, StoryStatus::Downloaded)?;
                return Ok(DownloadResult::Downloaded);
            }

            tokio::time::sleep(interval).await;
        }
    }

    async fn clean(&self, story_id: &str) -> Result<CleanResult, OrchestratorError> {
        let Some(story) = self.stories.get(story_id)? else {
            debug!("Story {} not found, skipping clean", story_id);
            return Ok(CleanResult::Skipped);
        };

        info!("Cleaning story {}", story_id);
        match self.set_status(story_id, StoryStatus::Cleaning) {
            Ok(_) => {}
            Err(StoreError::NotFound(_)) => return Ok(CleanResult::Skipped),
            Err(e) => return Err(e.into()),
        }

        tokio::time::sleep(Duration::from_millis(self.config.clean_settle_ms)).await;

        let active = self
            .stories
            .list(&StoryFilter::new().excluding_status(StoryStatus::Idle))?;

        let mut released = Vec::new();
        for asset_id in &story.required_asset_ids {
            let shared = active
                .iter()
                .any(|other| other.id != story.id && other.requires(asset_id));
            if shared {
                debug!("Asset {} still in use, keeping its record", asset_id);
                continue;
            }
            if self.assets.delete(asset_id)? {
                released.push(asset_id.clone());
            }
        }

        self.set_status(story_id, StoryStatus::Idle)?;
        info!(
            "Story {} cleaned, released {} asset records",
            story_id,
            released.len()
        );

        Ok(CleanResult::Cleaned { released })
    }

    fn set_status(&self, story_id: &str, status: StoryStatus) -> Result<Story, StoreError> {
        let story = self.stories.update_status(story_id, status)?;
        crate::metrics::STORY_TRANSITIONS
            .with_label_values(&[status.as_str()])
            .inc();
        Ok(story)
    }
}
