//! Job trait and attributes.

use crate::config::WorkerConfig;
use crate::error::JobResult;
use crate::failure::PerformError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque job identifier assigned by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Jid(String);

impl Jid {
    /// Creates a jid from a string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the jid as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Jid {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Jid {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle state of a job, as recorded by the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Queued and waiting to be popped.
    #[default]
    Waiting,
    /// Held by a worker.
    Running,
    /// Delayed until a future time.
    Scheduled,
    /// The holding worker's lock expired.
    Stalled,
    /// Waiting on dependencies.
    Depends,
    /// Finished successfully.
    Complete,
    /// Finished with a failure.
    Failed,
    /// Removed before finishing.
    Cancelled,
}

impl JobState {
    /// Returns true for states no worker may transition out of.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Complete | JobState::Failed | JobState::Cancelled)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Waiting => write!(f, "waiting"),
            JobState::Running => write!(f, "running"),
            JobState::Scheduled => write!(f, "scheduled"),
            JobState::Stalled => write!(f, "stalled"),
            JobState::Depends => write!(f, "depends"),
            JobState::Complete => write!(f, "complete"),
            JobState::Failed => write!(f, "failed"),
            JobState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Descriptive attributes of a reserved job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobAttributes {
    /// Job identifier.
    pub jid: Jid,

    /// Name of the behavior that executes the job.
    pub klass_name: String,

    /// Queue the job was popped from.
    pub queue_name: String,

    /// Priority within the queue.
    pub priority: i64,

    /// Tags for categorization.
    pub tags: Vec<String>,

    /// Jobs this one waits on.
    pub dependencies: Vec<Jid>,

    /// Jobs waiting on this one.
    pub dependents: Vec<Jid>,

    /// When the current lock expires.
    pub expires_at: Option<DateTime<Utc>>,

    /// Worker currently holding the job.
    pub worker_name: Option<String>,

    /// Retries allowed when the job was put.
    pub original_retries: u32,

    /// Retries still available.
    pub retries_left: u32,

    /// Resources the job holds.
    pub resources: Vec<String>,

    /// State at reservation time.
    pub state: JobState,

    /// Job payload.
    pub data: serde_json::Value,
}

impl JobAttributes {
    /// Creates attributes for a running job with no payload.
    pub fn new(jid: impl Into<Jid>, klass_name: impl Into<String>, queue_name: impl Into<String>) -> Self {
        Self {
            jid: jid.into(),
            klass_name: klass_name.into(),
            queue_name: queue_name.into(),
            state: JobState::Running,
            data: serde_json::Value::Null,
            ..Default::default()
        }
    }
}

impl fmt::Display for JobAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} / {} / {})",
            self.klass_name, self.jid, self.queue_name, self.state
        )
    }
}

/// A reserved unit of work.
///
/// Implemented by store clients. The worker only requests transitions;
/// the store decides whether they apply and reports lost ownership as
/// [`JobError::Contention`](crate::JobError::Contention).
#[async_trait]
pub trait Job: fmt::Display + Send + Sync {
    /// Attributes captured when the job was reserved.
    fn attributes(&self) -> &JobAttributes;

    /// Job identifier.
    fn jid(&self) -> &Jid {
        &self.attributes().jid
    }

    /// Returns true if the job's state was changed since it was reserved,
    /// either by its own behavior (cancel, retry) or by another actor.
    fn is_state_changed(&self) -> bool;

    /// Run the job's own behavior.
    async fn perform(&self, config: &WorkerConfig) -> Result<(), PerformError>;

    /// Ask the store to mark the job complete.
    async fn complete(&self) -> JobResult<()>;

    /// Ask the store to mark the job failed.
    async fn fail(&self, group: &str, message: &str) -> JobResult<()>;
}
