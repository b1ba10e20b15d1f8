//! Asset processing record types.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Processing state of one asset, shared by every story requiring it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssetRecord {
    /// Asset identifier (the record key).
    pub id: String,
    /// A worker acknowledged the job.
    pub started: bool,
    /// The worker completed all work. Implies `started`.
    pub finished: bool,
    /// Last liveness signal from the worker.
    pub last_heartbeat_at: DateTime<Utc>,
    /// When the record was (re)created.
    pub created_at: DateTime<Utc>,
}

impl AssetRecord {
    /// A fresh record awaiting a worker.
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            started: false,
            finished: false,
            last_heartbeat_at: now,
            created_at: now,
        }
    }

    /// Whether the asset has stopped making progress.
    ///
    /// Started but unfinished records stall once their heartbeat is older
    /// than the heartbeat timeout; records never started stall once they
    /// are older than the start timeout. Finished records never stall.
    pub fn is_stalled(&self, now: DateTime<Utc>, policy: &StallPolicy) -> bool {
        if self.finished {
            return false;
        }
        if self.started {
            exceeds(now, self.last_heartbeat_at, policy.heartbeat_timeout)
        } else {
            exceeds(now, self.created_at, policy.start_timeout)
        }
    }
}

fn exceeds(now: DateTime<Utc>, since: DateTime<Utc>, timeout: Duration) -> bool {
    match (now - since).to_std() {
        Ok(elapsed) => elapsed > timeout,
        // `since` is in the future
        Err(_) => false,
    }
}

/// Liveness thresholds for stall detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StallPolicy {
    /// Max silence between heartbeats of a started asset.
    pub heartbeat_timeout: Duration,
    /// Max wait for a worker to start a created asset.
    pub start_timeout: Duration,
}

impl Default for StallPolicy {
    fn default() -> Self {
        Self {
            heartbeat_timeout: Duration::from_secs(5),
            start_timeout: Duration::from_secs(10),
        }
    }
}
