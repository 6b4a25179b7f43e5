//! Structured job context attached to failure log entries.

use crate::job::{Jid, JobAttributes};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Snapshot of the job fields worth having next to a failure in the logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobLogContext {
    pub expires_at: Option<DateTime<Utc>>,
    pub jid: Jid,
    pub klass_name: String,
    pub original_retries: u32,
    pub priority: i64,
    pub queue_name: String,
    pub retries_left: u32,
    pub tags: Vec<String>,
    pub worker_name: Option<String>,
    pub resources: Vec<String>,
}

impl From<&JobAttributes> for JobLogContext {
    fn from(attrs: &JobAttributes) -> Self {
        Self {
            expires_at: attrs.expires_at,
            jid: attrs.jid.clone(),
            klass_name: attrs.klass_name.clone(),
            original_retries: attrs.original_retries,
            priority: attrs.priority,
            queue_name: attrs.queue_name.clone(),
            retries_left: attrs.retries_left,
            tags: attrs.tags.clone(),
            worker_name: attrs.worker_name.clone(),
            resources: attrs.resources.clone(),
        }
    }
}
