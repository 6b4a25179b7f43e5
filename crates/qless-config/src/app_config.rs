//! Application configuration structures.

use qless_core::LoggingConfig;
use qless_jobs::{QueueSpec, RedisConfig, WorkerConfig};
use serde::{Deserialize, Serialize};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name and metadata.
    #[serde(default)]
    pub app: AppMetadata,

    /// Queues to reserve from: a name or an ordered list of names.
    #[serde(default)]
    pub queues: QueueSpec,

    /// Worker configuration, handed to every job.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Redis store configuration.
    #[serde(default)]
    pub redis: RedisConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Application metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppMetadata {
    /// Application name.
    pub name: String,
    /// Application version.
    pub version: String,
    /// Environment (development, staging, production).
    pub environment: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "qless-worker".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

impl AppMetadata {
    /// Returns true when running in production.
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}
