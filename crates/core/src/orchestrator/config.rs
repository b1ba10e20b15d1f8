//! Orchestrator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::asset::StallPolicy;

/// Configuration for the story orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Run the scheduler loop at startup.
    /// When disabled, stories can be scheduled but nothing advances them.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Sleep when no story is pending (milliseconds).
    #[serde(default = "default_idle_interval")]
    pub idle_interval_ms: u64,

    /// Sleep after advancing a story (milliseconds).
    #[serde(default = "default_loop_interval")]
    pub loop_interval_ms: u64,

    /// How often a download checks its assets (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Delay between entering `cleaning` and releasing assets (milliseconds).
    #[serde(default = "default_clean_settle")]
    pub clean_settle_ms: u64,

    /// Sleep after a failed iteration (milliseconds).
    #[serde(default = "default_error_backoff")]
    pub error_backoff_ms: u64,

    /// A started asset without a heartbeat for this long is stalled (milliseconds).
    #[serde(default = "default_heartbeat_timeout")]
    pub heartbeat_timeout_ms: u64,

    /// An asset never started this long after creation is stalled (milliseconds).
    /// Must exceed `heartbeat_timeout_ms`.
    #[serde(default = "default_start_timeout")]
    pub start_timeout_ms: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_idle_interval() -> u64 {
    100
}

fn default_loop_interval() -> u64 {
    500
}

fn default_poll_interval() -> u64 {
    500
}

fn default_clean_settle() -> u64 {
    500
}

fn default_error_backoff() -> u64 {
    500
}

fn default_heartbeat_timeout() -> u64 {
    5000 // 5 seconds
}

fn default_start_timeout() -> u64 {
    10000 // 10 seconds
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            idle_interval_ms: default_idle_interval(),
            loop_interval_ms: default_loop_interval(),
            poll_interval_ms: default_poll_interval(),
            clean_settle_ms: default_clean_settle(),
            error_backoff_ms: default_error_backoff(),
            heartbeat_timeout_ms: default_heartbeat_timeout(),
            start_timeout_ms: default_start_timeout(),
        }
    }
}

impl OrchestratorConfig {
    /// Stall thresholds derived from the configured timeouts.
    pub fn stall_policy(&self) -> StallPolicy {
        StallPolicy {
            heartbeat_timeout: Duration::from_millis(self.heartbeat_timeout_ms),
            start_timeout: Duration::from_millis(self.start_timeout_ms),
        }
    }
}
