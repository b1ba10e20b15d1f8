//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Orchestrator (loop iterations, reconciliation, garbage collection)
//! - Story workflows (downloads, cleanups, stalls, cancellations)
//! - Asset workers (dispatched and completed jobs)
//! - Stores (injected transient faults)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Orchestrator Loop Metrics
// =============================================================================

/// Loop iterations by result.
pub static LOOP_ITERATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "storyline_orchestrator_iterations_total",
            "Total orchestrator loop iterations",
        ),
        &["result"], // "idle", "advanced", "error"
    )
    .unwrap()
});

/// Stories forced to error by stall reconciliation.
pub static STORIES_RECONCILED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "storyline_stories_reconciled_total",
        "Stories found in an exclusive status at loop start and failed",
    )
    .unwrap()
});

/// Orphaned asset records deleted by garbage collection.
pub static ASSET_RECORDS_COLLECTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "storyline_asset_records_collected_total",
        "Asset records deleted because no story referenced them",
    )
    .unwrap()
});

/// Story status transitions written by the orchestrator and commands.
pub static STORY_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "storyline_story_transitions_total",
            "Story status transitions",
        ),
        &["to_status"],
    )
    .unwrap()
});

// =============================================================================
// Workflow Metrics
// =============================================================================

/// Download workflow duration in seconds.
pub static DOWNLOAD_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "storyline_download_duration_seconds",
            "Duration of story download workflows",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0]),
        &["result"], // "downloaded", "canceled", "stalled", "vanished"
    )
    .unwrap()
});

/// Stall detections total.
pub static STALL_DETECTIONS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "storyline_stall_detections_total",
        "Total asset stall detections",
    )
    .unwrap()
});

/// Cancellation signals broadcast to workers.
pub static CANCELLATIONS_BROADCAST: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "storyline_cancellations_broadcast_total",
        "Total cancellation broadcasts",
    )
    .unwrap()
});

// =============================================================================
// Worker Metrics
// =============================================================================

/// Asset jobs dispatched to the work queue.
pub static ASSET_JOBS_DISPATCHED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "storyline_asset_jobs_dispatched_total",
        "Total asset jobs dispatched",
    )
    .unwrap()
});

/// Asset jobs completed by outcome.
pub static ASSET_JOBS_COMPLETED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "storyline_asset_jobs_completed_total",
            "Asset jobs processed by workers",
        ),
        &["outcome"],
    )
    .unwrap()
});

// =============================================================================
// Store Metrics
// =============================================================================

/// Injected transient faults by operation.
pub static TRANSIENT_FAULTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "storyline_transient_faults_total",
            "Transient store faults injected",
        ),
        &["operation"],
    )
    .unwrap()
});

/// Returns all core metrics for registration with a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Orchestrator
        Box::new(LOOP_ITERATIONS.clone()),
        Box::new(STORIES_RECONCILED.clone()),
        Box::new(ASSET_RECORDS_COLLECTED.clone()),
        Box::new(STORY_TRANSITIONS.clone()),
        // Workflows
        Box::new(DOWNLOAD_DURATION.clone()),
        Box::new(STALL_DETECTIONS.clone()),
        Box::new(CANCELLATIONS_BROADCAST.clone()),
        // Workers
        Box::new(ASSET_JOBS_DISPATCHED.clone()),
        Box::new(ASSET_JOBS_COMPLETED.clone()),
        // Stores
        Box::new(TRANSIENT_FAULTS.clone()),
    ]
}
