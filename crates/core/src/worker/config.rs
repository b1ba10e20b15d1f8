//! Worker pool configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the asset worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Maximum jobs processed at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Work increments per job. Each increment emits one heartbeat.
    #[serde(default = "default_work_increments")]
    pub work_increments: u32,

    /// Pause between increments (milliseconds).
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    /// Report back over HTTP to this base URL (e.g. "http://127.0.0.1:3000")
    /// instead of writing to the asset store directly.
    #[serde(default)]
    pub callback_url: Option<String>,

    /// Timeout for HTTP callbacks (milliseconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_concurrency() -> usize {
    10
}

fn default_work_increments() -> u32 {
    5
}

fn default_tick_interval() -> u64 {
    500
}

fn default_request_timeout() -> u64 {
    1000
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            work_increments: default_work_increments(),
            tick_interval_ms: default_tick_interval(),
            callback_url: None,
            request_timeout_ms: default_request_timeout(),
        }
    }
}
