//! Bounded pool of asset workers fed by the work queue.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, Semaphore};
use tracing::{debug, info, warn};

use crate::queue::JobReceiver;

use super::processor::{AssetProcessor, JobOutcome};

/// Snapshot of pool activity.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStatus {
    pub running: bool,
    pub active_jobs: usize,
    pub max_concurrent: usize,
    pub total_processed: u64,
    pub total_cancelled: u64,
    pub total_failed: u64,
}

#[derive(Default)]
struct PoolStats {
    active: AtomicU64,
    total_processed: AtomicU64,
    total_cancelled: AtomicU64,
    total_failed: AtomicU64,
}

impl PoolStats {
    fn record(&self, outcome: &JobOutcome) {
        self.total_processed.fetch_add(1, Ordering::Relaxed);
        match outcome {
            JobOutcome::Cancelled => {
                self.total_cancelled.fetch_add(1, Ordering::Relaxed);
            }
            JobOutcome::Failed(_) => {
                self.total_failed.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }
}

/// Consumes [`AssetJob`](crate::queue::AssetJob)s with bounded concurrency.
pub struct WorkerPool {
    processor: Arc<AssetProcessor>,
    concurrency: usize,
    semaphore: Arc<Semaphore>,
    stats: Arc<PoolStats>,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl WorkerPool {
    pub fn new(processor: AssetProcessor, concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            processor: Arc::new(processor),
            concurrency,
            semaphore: Arc::new(Semaphore::new(concurrency)),
            stats: Arc::new(PoolStats::default()),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Start pulling jobs from `jobs`.
    pub fn start(&self, mut jobs: JobReceiver) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Worker pool already running");
            return;
        }

        let processor = Arc::clone(&self.processor);
        let semaphore = Arc::clone(&self.semaphore);
        let stats = Arc::clone(&self.stats);
        let running = Arc::clone(&self.running);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Worker pool started");
            loop {
                let job = tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    job = jobs.recv() => match job {
                        Some(job) => job,
                        None => {
                            debug!("Work queue closed");
                            break;
                        }
                    },
                };

                let permit = tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => break,
                    },
                };

                let processor = Arc::clone(&processor);
                let stats = Arc::clone(&stats);
                stats.active.fetch_add(1, Ordering::Relaxed);

                tokio::spawn(async move {
                    let outcome = processor.process(&job).await;
                    stats.record(&outcome);
                    stats.active.fetch_sub(1, Ordering::Relaxed);
                    drop(permit);
                });
            }
            running.store(false, Ordering::SeqCst);
            info!("Worker pool stopped");
        });
    }

    /// Stop accepting jobs and wait up to `grace` for in-flight jobs.
    pub async fn stop(&self, grace: Duration) {
        if !self.running.load(Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown_tx.send(());

        let all = self.concurrency as u32;
        match tokio::time::timeout(grace, self.semaphore.acquire_many(all)).await {
            Ok(Ok(permits)) => drop(permits),
            Ok(Err(_)) => {}
            Err(_) => warn!(
                "Worker pool stopped with {} jobs still running",
                self.stats.active.load(Ordering::Relaxed)
            ),
        }
    }

    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            running: self.running.load(Ordering::Relaxed),
            active_jobs: self.stats.active.load(Ordering::Relaxed) as usize,
            max_concurrent: self.concurrency,
            total_processed: self.stats.total_processed.load(Ordering::Relaxed),
            total_cancelled: self.stats.total_cancelled.load(Ordering::Relaxed),
            total_failed: self.stats.total_failed.load(Ordering::Relaxed),
        }
    }
}
