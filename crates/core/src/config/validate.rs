use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Start timeout exceeds heartbeat timeout
/// - Worker concurrency and increments are positive
/// - Fault rate is a probability
/// - Story ids are unique, as are asset ids within a story
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    // The start timeout covers queueing plus the first heartbeat interval
    let orchestrator = &config.orchestrator;
    if orchestrator.start_timeout_ms <= orchestrator.heartbeat_timeout_ms {
        return Err(ConfigError::ValidationError(format!(
            "orchestrator.start_timeout_ms ({}) must exceed heartbeat_timeout_ms ({})",
            orchestrator.start_timeout_ms, orchestrator.heartbeat_timeout_ms
        )));
    }

    if config.worker.concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "worker.concurrency cannot be 0".to_string(),
        ));
    }

    if config.worker.work_increments == 0 {
        return Err(ConfigError::ValidationError(
            "worker.work_increments cannot be 0".to_string(),
        ));
    }

    if !(0.0..=1.0).contains(&config.faults.failure_rate) {
        return Err(ConfigError::ValidationError(format!(
            "faults.failure_rate must be between 0 and 1, got {}",
            config.faults.failure_rate
        )));
    }

    let mut ids = std::collections::HashSet::new();
    for story in &config.stories {
        if !ids.insert(story.id.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate story id: {}",
                story.id
            )));
        }

        let mut assets = std::collections::HashSet::new();
        if let Some(asset) = story.assets.iter().find(|a| !assets.insert(a.as_str())) {
            return Err(ConfigError::ValidationError(format!(
                "story {} lists asset {} more than once",
                story.id, asset
            )));
        }
    }

    Ok(())
}
