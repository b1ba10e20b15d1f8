use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::orchestrator::OrchestratorConfig;
use crate::story::Story;
use crate::worker::WorkerConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub faults: FaultConfig,
    /// Story catalog loaded at startup.
    #[serde(default = "default_stories")]
    pub stories: Vec<StorySeed>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            worker: WorkerConfig::default(),
            faults: FaultConfig::default(),
            stories: default_stories(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    3000
}

/// Database configuration
///
/// Without a path, stories and asset records live in memory only.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Simulated storage flakiness
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FaultConfig {
    /// Probability (0.0-1.0) that any store mutation fails transiently.
    #[serde(default)]
    pub failure_rate: f64,
}

/// A story to seed the catalog with.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StorySeed {
    pub id: String,
    pub title: String,
    pub assets: Vec<String>,
}

impl StorySeed {
    pub fn new(id: &str, title: &str, assets: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            assets: assets.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// An idle story built from this seed.
    pub fn to_story(&self) -> Story {
        Story::new(self.id.clone(), self.title.clone(), self.assets.clone())
    }
}

fn default_stories() -> Vec<StorySeed> {
    vec![
        StorySeed::new("story-1", "Story 1", &["asset-1", "asset-2", "asset-3"]),
        StorySeed::new("story-2", "Story 2", &["asset-3", "asset-4"]),
        StorySeed::new("story-3", "Story 3", &["asset-4", "asset-5", "asset-6"]),
    ]
}

/// Config as exposed over the API
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: SanitizedDatabaseConfig,
    pub orchestrator: OrchestratorConfig,
    pub worker: SanitizedWorkerConfig,
    pub faults: FaultConfig,
    pub story_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDatabaseConfig {
    pub backend: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedWorkerConfig {
    pub concurrency: usize,
    pub work_increments: u32,
    pub tick_interval_ms: u64,
    pub http_callbacks: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: SanitizedDatabaseConfig {
                backend: match config.database.path {
                    Some(_) => "sqlite".to_string(),
                    None => "memory".to_string(),
                },
            },
            orchestrator: config.orchestrator.clone(),
            worker: SanitizedWorkerConfig {
                concurrency: config.worker.concurrency,
                work_increments: config.worker.work_increments,
                tick_interval_ms: config.worker.tick_interval_ms,
                http_callbacks: config.worker.callback_url.is_some(),
            },
            faults: config.faults.clone(),
            story_count: config.stories.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert!(config.database.path.is_none());
        assert_eq!(config.faults.failure_rate, 0.0);
        assert_eq!(config.stories.len(), 3);
        assert_eq!(
            config.stories[1],
            StorySeed::new("story-2", "Story 2", &["asset-3", "asset-4"])
        );
    }

    #[test]
    fn test_deserialize_sections() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000

[database]
path = "storyline.db"

[worker]
concurrency = 4

[faults]
failure_rate = 0.005

[[stories]]
id = "intro"
title = "Intro"
assets = ["a", "b"]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.path, Some(PathBuf::from("storyline.db")));
        assert_eq!(config.worker.concurrency, 4);
        assert_eq!(config.worker.work_increments, 5);
        assert_eq!(config.faults.failure_rate, 0.005);
        assert_eq!(config.stories.len(), 1);
        assert_eq!(config.stories[0].to_story().required_asset_ids, vec!["a", "b"]);
    }

    #[test]
    fn test_sanitized_config() {
        let mut config = Config::default();
        config.worker.callback_url = Some("http://127.0.0.1:3000".to_string());

        let sanitized = SanitizedConfig::from(&config);
        assert_eq!(sanitized.database.backend, "memory");
        assert!(sanitized.worker.http_callbacks);
        assert_eq!(sanitized.story_count, 3);
    }
}
