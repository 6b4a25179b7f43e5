//! Worker and store configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Queue used when none is configured.
pub const DEFAULT_QUEUE: &str = "default";

/// Milliseconds between idle polls when none is configured.
pub const DEFAULT_INTERVAL_MS: u64 = 5000;

/// Which queues a worker reserves from.
///
/// A single name and a one-element list reserve the same jobs, but only a
/// list goes through the ordered scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueueSpec {
    /// One queue.
    Single(String),
    /// Queues tried strictly in this order every cycle.
    List(Vec<String>),
}

impl QueueSpec {
    /// Replaces blank specifiers with the default queue.
    pub fn normalized(self) -> Self {
        match self {
            QueueSpec::Single(name) if name.trim().is_empty() => Self::default(),
            QueueSpec::List(names) if names.is_empty() => Self::default(),
            other => other,
        }
    }

    /// Queue names in reservation order.
    pub fn names(&self) -> Vec<&str> {
        match self {
            QueueSpec::Single(name) => vec![name.as_str()],
            QueueSpec::List(names) => names.iter().map(String::as_str).collect(),
        }
    }

    /// Returns true for the list form.
    pub fn is_list(&self) -> bool {
        matches!(self, QueueSpec::List(_))
    }
}

impl Default for QueueSpec {
    fn default() -> Self {
        QueueSpec::Single(DEFAULT_QUEUE.to_string())
    }
}

impl From<&str> for QueueSpec {
    fn from(name: &str) -> Self {
        QueueSpec::Single(name.to_string())
    }
}

impl From<String> for QueueSpec {
    fn from(name: String) -> Self {
        QueueSpec::Single(name)
    }
}

impl From<Vec<String>> for QueueSpec {
    fn from(names: Vec<String>) -> Self {
        QueueSpec::List(names)
    }
}

impl From<Vec<&str>> for QueueSpec {
    fn from(names: Vec<&str>) -> Self {
        QueueSpec::List(names.into_iter().map(str::to_string).collect())
    }
}

impl From<Option<QueueSpec>> for QueueSpec {
    fn from(spec: Option<QueueSpec>) -> Self {
        spec.unwrap_or_default()
    }
}

/// Configuration handed to the worker and, unchanged, to every job it runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Milliseconds to wait after an empty reservation.
    #[serde(default = "default_interval")]
    pub interval_ms: u64,

    /// Free-form settings for job handlers.
    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval(),
            options: HashMap::new(),
        }
    }
}

fn default_interval() -> u64 {
    DEFAULT_INTERVAL_MS
}

impl WorkerConfig {
    /// Creates a config with the given polling interval.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval_ms: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            ..Self::default()
        }
    }

    /// Returns the polling interval as Duration.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Looks up a handler option.
    pub fn option(&self, key: &str) -> Option<&serde_json::Value> {
        self.options.get(key)
    }
}

/// Redis store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis URL.
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Path to the qless-core Lua script.
    #[serde(default = "default_script_path")]
    pub script_path: String,

    /// Worker name reported to the store; defaults to `<hostname>-<pid>`.
    #[serde(default)]
    pub worker_name: Option<String>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            pool_size: default_pool_size(),
            script_path: default_script_path(),
            worker_name: None,
        }
    }
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_pool_size() -> usize {
    4
}

fn default_script_path() -> String {
    "qless-core/qless.lua".to_string()
}

impl RedisConfig {
    /// Worker name to report, falling back to `<hostname>-<pid>`.
    pub fn resolved_worker_name(&self) -> String {
        match &self.worker_name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => {
                let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
                format!("{}-{}", host, std::process::id())
            }
        }
    }
}
