//! Handlers built into the worker binary.

use async_trait::async_trait;
use qless_jobs::{HandlerRegistry, Job, JobHandler, PerformError, RedisJob, WorkerConfig};
use tracing::info;

/// Logs the job and its payload, then succeeds.
pub struct EchoHandler;

#[async_trait]
impl<J: Job> JobHandler<J> for EchoHandler {
    async fn perform(&self, job: &J, _config: &WorkerConfig) -> Result<(), PerformError> {
        let attrs = job.attributes();
        info!(jid = %attrs.jid, data = %attrs.data, "Echo {}", job);
        Ok(())
    }
}

/// Fails every job with the group and message found in its payload.
///
/// Payload: `{"group": "...", "message": "..."}`. Without a group the
/// failure is reported as a plain message.
pub struct FailHandler;

#[async_trait]
impl<J: Job> JobHandler<J> for FailHandler {
    async fn perform(&self, job: &J, _config: &WorkerConfig) -> Result<(), PerformError> {
        let data = &job.attributes().data;
        let message = data
            .get("message")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("failed on request");

        Err(match data.get("group").and_then(serde_json::Value::as_str) {
            Some(group) => PerformError::new(group, message),
            None => PerformError::from(message),
        })
    }
}

/// Register the built-in handlers.
pub fn register_builtin(registry: &HandlerRegistry<RedisJob>) {
    registry.register("qless.Echo", EchoHandler);
    registry.register("qless.Fail", FailHandler);
}
