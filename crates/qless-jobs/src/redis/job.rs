//! Jobs reserved through the qless-core script.

use super::client::Shared;
use crate::config::WorkerConfig;
use crate::error::{JobError, JobResult};
use crate::failure::PerformError;
use crate::job::{Jid, Job, JobAttributes, JobState};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// A job held by this worker.
///
/// Handlers receive it in [`JobHandler::perform`](crate::JobHandler::perform)
/// and may cancel, retry or heartbeat it. Cancelling or retrying marks the
/// state as changed so the worker does not complete it afterwards.
pub struct RedisJob {
    attrs: JobAttributes,
    shared: Arc<Shared>,
    state_changed: AtomicBool,
}

impl RedisJob {
    pub(crate) fn new(attrs: JobAttributes, shared: Arc<Shared>) -> Self {
        Self {
            attrs,
            shared,
            state_changed: AtomicBool::new(false),
        }
    }

    /// The job payload.
    pub fn data(&self) -> &serde_json::Value {
        &self.attrs.data
    }

    /// Remove the job from the store.
    pub async fn cancel(&self) -> JobResult<()> {
        let args = [self.attrs.jid.to_string()];
        self.changing_state(self.shared.transition::<redis::Value>("cancel", &args))
            .await?;
        Ok(())
    }

    /// Put the job back in its queue after `delay`, consuming one retry.
    pub async fn retry(&self, delay: Duration, group: &str, message: &str) -> JobResult<()> {
        let args = [
            self.attrs.jid.to_string(),
            self.attrs.queue_name.clone(),
            self.shared.worker_name.clone(),
            delay.as_secs().to_string(),
            group.to_string(),
            message.to_string(),
        ];
        self.changing_state(self.shared.transition::<redis::Value>("retry", &args))
            .await?;
        Ok(())
    }

    /// Renew this worker's lock. Returns the new expiration.
    pub async fn heartbeat(&self) -> JobResult<Option<DateTime<Utc>>> {
        let args = [
            self.attrs.jid.to_string(),
            self.shared.worker_name.clone(),
            self.encoded_data()?,
        ];
        let expires: f64 = self.shared.transition("heartbeat", &args).await?;
        Ok(expiry(expires))
    }

    /// Await a transition that takes the job away from this worker and
    /// mark the state changed once the store has accepted it.
    async fn changing_state<T>(
        &self,
        transition: impl Future<Output = JobResult<T>>,
    ) -> JobResult<T> {
        let value = transition.await?;
        self.state_changed.store(true, Ordering::SeqCst);
        Ok(value)
    }

    fn encoded_data(&self) -> JobResult<String> {
        Ok(serde_json::to_string(&self.attrs.data)?)
    }
}

impl fmt::Display for RedisJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.attrs, f)
    }
}

#[async_trait]
impl Job for RedisJob {
    fn attributes(&self) -> &JobAttributes {
        &self.attrs
    }

    fn is_state_changed(&self) -> bool {
        self.state_changed.load(Ordering::SeqCst)
    }

    async fn perform(&self, config: &WorkerConfig) -> Result<(), PerformError> {
        let registry = self.shared.registry.clone();
        registry.dispatch(&self.attrs.klass_name, self, config).await
    }

    async fn complete(&self) -> JobResult<()> {
        let args = [
            self.attrs.jid.to_string(),
            self.shared.worker_name.clone(),
            self.attrs.queue_name.clone(),
            self.encoded_data()?,
        ];
        self.shared.transition::<redis::Value>("complete", &args).await?;
        Ok(())
    }

    async fn fail(&self, group: &str, message: &str) -> JobResult<()> {
        let args = [
            self.attrs.jid.to_string(),
            self.shared.worker_name.clone(),
            group.to_string(),
            message.to_string(),
            self.encoded_data()?,
        ];
        self.shared.transition::<redis::Value>("fail", &args).await?;
        Ok(())
    }
}

/// A job as the script encodes it.
#[derive(Debug, Deserialize)]
struct WireJob {
    jid: String,
    klass: String,
    queue: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    priority: i64,
    #[serde(default, deserialize_with = "lua_list")]
    tags: Vec<String>,
    #[serde(default, deserialize_with = "lua_list")]
    dependencies: Vec<String>,
    #[serde(default, deserialize_with = "lua_list")]
    dependents: Vec<String>,
    #[serde(default, deserialize_with = "lua_list")]
    resources: Vec<String>,
    #[serde(default)]
    expires: Option<f64>,
    #[serde(default)]
    worker: Option<String>,
    #[serde(default)]
    retries: i64,
    #[serde(default)]
    remaining: i64,
    #[serde(default)]
    data: Option<String>,
}

/// cjson encodes an empty Lua table as `{}`, so empty lists arrive as objects.
fn lua_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum LuaList<T> {
        List(Vec<T>),
        Table(HashMap<String, serde_json::Value>),
    }

    Ok(match LuaList::<T>::deserialize(deserializer)? {
        LuaList::List(items) => items,
        LuaList::Table(_) => Vec::new(),
    })
}

fn wire_state(state: &str) -> JobState {
    match state {
        "waiting" => JobState::Waiting,
        "scheduled" => JobState::Scheduled,
        "stalled" => JobState::Stalled,
        "depends" => JobState::Depends,
        "complete" => JobState::Complete,
        "failed" => JobState::Failed,
        "cancelled" => JobState::Cancelled,
        "running" => JobState::Running,
        other => {
            // pop only hands out jobs it has just locked for this worker
            debug!(state = other, "Unknown job state from store, treating as running");
            JobState::Running
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn expiry(secs: f64) -> Option<DateTime<Utc>> {
    if secs <= 0.0 {
        return None;
    }
    DateTime::from_timestamp_millis((secs * 1000.0) as i64)
}

impl From<WireJob> for JobAttributes {
    fn from(wire: WireJob) -> Self {
        let data = match wire.data.as_deref() {
            Some(raw) => serde_json::from_str(raw)
                .unwrap_or_else(|_| serde_json::Value::String(raw.to_string())),
            None => serde_json::Value::Null,
        };

        Self {
            jid: Jid::from(wire.jid),
            klass_name: wire.klass,
            queue_name: wire.queue,
            priority: wire.priority,
            tags: wire.tags,
            dependencies: wire.dependencies.into_iter().map(Jid::from).collect(),
            dependents: wire.dependents.into_iter().map(Jid::from).collect(),
            expires_at: wire.expires.and_then(expiry),
            worker_name: wire.worker.filter(|name| !name.is_empty()),
            original_retries: u32::try_from(wire.retries).unwrap_or(0),
            retries_left: u32::try_from(wire.remaining).unwrap_or(0),
            resources: wire.resources,
            state: wire_state(&wire.state),
            data,
        }
    }
}

#[derive(Deserialize)]
struct PopReply(#[serde(deserialize_with = "lua_list")] Vec<WireJob>);

/// Decode the reply of `pop`: a JSON list holding at most one job.
pub(crate) fn decode_pop(payload: &str) -> JobResult<Option<JobAttributes>> {
    let PopReply(jobs) = serde_json::from_str(payload)
        .map_err(|e| JobError::Protocol(format!("Invalid pop reply: {}", e)))?;
    Ok(jobs.into_iter().next().map(JobAttributes::from))
}
