//! In-memory store for worker integration tests.
//!
//! Enforces ownership like the qless-core script does: only the worker
//! holding a running job may complete or fail it, everything else is
//! rejected as contention.

use async_trait::async_trait;
use parking_lot::Mutex;
use qless_jobs::{
    Client, Job, JobAttributes, JobError, JobResult, JobState, PerformError, Queue, WorkerConfig,
};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Klass names understood by [`StoreJob::perform`].
pub mod klass {
    /// Succeeds.
    pub const SUCCEED: &str = "Succeed";
    /// Fails with a structured `TimeoutError`.
    pub const TIME_OUT: &str = "TimeOut";
    /// Fails with a plain string.
    pub const PANIC_STRING: &str = "PanicString";
    /// Cancels itself while running.
    pub const SELF_CANCEL: &str = "SelfCancel";
    /// Gets handed to another worker while running.
    pub const STOLEN: &str = "Stolen";
}

#[derive(Debug, Clone)]
pub struct StoredJob {
    pub klass: String,
    pub queue: String,
    pub state: JobState,
    pub worker: Option<String>,
    pub failure: Option<(String, String)>,
}

#[derive(Debug, Default)]
pub struct Store {
    jobs: Mutex<HashMap<String, StoredJob>>,
    queues: Mutex<HashMap<String, VecDeque<String>>>,
}

impl Store {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn put(&self, queue: &str, jid: &str, klass: &str) {
        self.jobs.lock().insert(
            jid.to_string(),
            StoredJob {
                klass: klass.to_string(),
                queue: queue.to_string(),
                state: JobState::Waiting,
                worker: None,
                failure: None,
            },
        );
        self.queues
            .lock()
            .entry(queue.to_string())
            .or_default()
            .push_back(jid.to_string());
    }

    pub fn job(&self, jid: &str) -> StoredJob {
        self.jobs.lock()[jid].clone()
    }

    fn take(&self, queue: &str, worker: &str) -> Option<JobAttributes> {
        let jid = self.queues.lock().get_mut(queue)?.pop_front()?;
        let mut jobs = self.jobs.lock();
        let stored = jobs.get_mut(&jid)?;
        stored.state = JobState::Running;
        stored.worker = Some(worker.to_string());

        let mut attrs = JobAttributes::new(jid.as_str(), stored.klass.as_str(), queue);
        attrs.worker_name = Some(worker.to_string());
        attrs.original_retries = 5;
        attrs.retries_left = 5;
        Some(attrs)
    }

    fn transition(&self, jid: &str, worker: &str, to: JobState, failure: Option<(String, String)>) -> JobResult<()> {
        let mut jobs = self.jobs.lock();
        let stored = jobs
            .get_mut(jid)
            .ok_or_else(|| JobError::contention(format!("Job {} does not exist", jid)))?;

        if stored.state != JobState::Running || stored.worker.as_deref() != Some(worker) {
            return Err(JobError::contention(format!(
                "Job {} is not currently running for {}",
                jid, worker
            )));
        }

        stored.state = to;
        stored.failure = failure;
        Ok(())
    }

    fn reassign(&self, jid: &str, worker: &str) {
        if let Some(stored) = self.jobs.lock().get_mut(jid) {
            stored.worker = Some(worker.to_string());
        }
    }

    fn cancel(&self, jid: &str) {
        if let Some(stored) = self.jobs.lock().get_mut(jid) {
            stored.state = JobState::Cancelled;
            stored.worker = None;
        }
    }
}

pub struct StoreClient {
    store: Arc<Store>,
    worker: String,
}

impl StoreClient {
    pub fn new(store: &Arc<Store>, worker: &str) -> Self {
        Self {
            store: store.clone(),
            worker: worker.to_string(),
        }
    }
}

impl Client for StoreClient {
    type Queue = StoreQueue;

    fn queue(&self, name: &str) -> StoreQueue {
        StoreQueue {
            name: name.to_string(),
            store: self.store.clone(),
            worker: self.worker.clone(),
        }
    }
}

pub struct StoreQueue {
    name: String,
    store: Arc<Store>,
    worker: String,
}

#[async_trait]
impl Queue for StoreQueue {
    type Job = StoreJob;

    fn name(&self) -> &str {
        &self.name
    }

    async fn pop(&self) -> JobResult<Option<StoreJob>> {
        Ok(self.store.take(&self.name, &self.worker).map(|attrs| StoreJob {
            attrs,
            store: self.store.clone(),
            worker: self.worker.clone(),
            state_changed: AtomicBool::new(false),
        }))
    }
}

pub struct StoreJob {
    attrs: JobAttributes,
    store: Arc<Store>,
    worker: String,
    state_changed: AtomicBool,
}

impl fmt::Display for StoreJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.attrs, f)
    }
}

#[async_trait]
impl Job for StoreJob {
    fn attributes(&self) -> &JobAttributes {
        &self.attrs
    }

    fn is_state_changed(&self) -> bool {
        self.state_changed.load(Ordering::SeqCst)
    }

    async fn perform(&self, _config: &WorkerConfig) -> Result<(), PerformError> {
        let jid = self.attrs.jid.as_str();
        match self.attrs.klass_name.as_str() {
            klass::TIME_OUT => Err(PerformError::new("TimeoutError", "deadline exceeded")
                .with_trace("at fetch_feed (feeds.rs:42)")),
            klass::PANIC_STRING => Err(PerformError::from("it broke")),
            klass::SELF_CANCEL => {
                self.store.cancel(jid);
                self.state_changed.store(true, Ordering::SeqCst);
                Ok(())
            }
            klass::STOLEN => {
                self.store.reassign(jid, "other-worker");
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn complete(&self) -> JobResult<()> {
        self.store
            .transition(self.attrs.jid.as_str(), &self.worker, JobState::Complete, None)
    }

    async fn fail(&self, group: &str, message: &str) -> JobResult<()> {
        self.store.transition(
            self.attrs.jid.as_str(),
            &self.worker,
            JobState::Failed,
            Some((group.to_string(), message.to_string())),
        )
    }
}
