//! Job handlers keyed by klass name.

use crate::config::WorkerConfig;
use crate::failure::PerformError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// The behavior run for every job of one klass.
#[async_trait]
pub trait JobHandler<J>: Send + Sync {
    /// Execute the job. The handler may cancel, retry or heartbeat it
    /// through `job` before returning.
    async fn perform(&self, job: &J, config: &WorkerConfig) -> Result<(), PerformError>;
}

/// Registered handlers.
pub struct HandlerRegistry<J> {
    handlers: RwLock<HashMap<String, Arc<dyn JobHandler<J>>>>,
}

impl<J: Send + Sync + 'static> HandlerRegistry<J> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Register the handler for a klass, replacing any previous one.
    pub fn register(&self, klass: impl Into<String>, handler: impl JobHandler<J> + 'static) {
        let klass = klass.into();
        info!(klass = %klass, "Registered job handler");
        self.handlers.write().insert(klass, Arc::new(handler));
    }

    /// Get the handler for a klass.
    pub fn get(&self, klass: &str) -> Option<Arc<dyn JobHandler<J>>> {
        self.handlers.read().get(klass).cloned()
    }

    pub fn contains(&self, klass: &str) -> bool {
        self.handlers.read().contains_key(klass)
    }

    /// Registered klass names, sorted.
    pub fn klasses(&self) -> Vec<String> {
        let mut klasses: Vec<String> = self.handlers.read().keys().cloned().collect();
        klasses.sort();
        klasses
    }

    /// Run the handler registered for `klass`.
    ///
    /// An unknown klass fails with a `MissingHandler` error.
    pub async fn dispatch(&self, klass: &str, job: &J, config: &WorkerConfig) -> Result<(), PerformError> {
        match self.get(klass) {
            Some(handler) => handler.perform(job, config).await,
            None => Err(PerformError::new(
                "MissingHandler",
                format!("No handler registered for klass {}", klass),
            )),
        }
    }
}

impl<J: Send + Sync + 'static> Default for HandlerRegistry<J> {
    fn default() -> Self {
        Self::new()
    }
}
