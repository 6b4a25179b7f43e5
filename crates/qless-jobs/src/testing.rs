//! In-memory collaborators and log capture for unit tests.

use crate::config::WorkerConfig;
use crate::error::{JobError, JobResult};
use crate::failure::PerformError;
use crate::job::{Job, JobAttributes};
use crate::queue::{Client, Queue};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// Scripted answer for a store transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    Ok,
    Contention,
    Unavailable,
}

impl StoreOutcome {
    fn into_result(self, jid: &str) -> JobResult<()> {
        match self {
            StoreOutcome::Ok => Ok(()),
            StoreOutcome::Contention => Err(JobError::contention(format!(
                "Job {} is not currently running",
                jid
            ))),
            StoreOutcome::Unavailable => Err(JobError::Internal("store unavailable".into())),
        }
    }
}

#[derive(Debug)]
struct FakeJobState {
    perform_result: Mutex<Result<(), PerformError>>,
    change_state_on_perform: AtomicBool,
    state_changed: AtomicBool,
    complete_outcome: Mutex<StoreOutcome>,
    fail_outcome: Mutex<StoreOutcome>,
    perform_calls: AtomicUsize,
    complete_calls: AtomicUsize,
    fail_calls: Mutex<Vec<(String, String)>>,
}

/// Job whose behavior and store answers are scripted up front.
#[derive(Debug, Clone)]
pub struct FakeJob {
    attrs: JobAttributes,
    state: Arc<FakeJobState>,
}

impl FakeJob {
    pub fn new(jid: &str) -> Self {
        Self::in_queue(jid, "default")
    }

    pub fn in_queue(jid: &str, queue: &str) -> Self {
        Self {
            attrs: JobAttributes::new(jid, "FakeJob", queue),
            state: Arc::new(FakeJobState {
                perform_result: Mutex::new(Ok(())),
                change_state_on_perform: AtomicBool::new(false),
                state_changed: AtomicBool::new(false),
                complete_outcome: Mutex::new(StoreOutcome::Ok),
                fail_outcome: Mutex::new(StoreOutcome::Ok),
                perform_calls: AtomicUsize::new(0),
                complete_calls: AtomicUsize::new(0),
                fail_calls: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn failing_with(self, error: PerformError) -> Self {
        *self.state.perform_result.lock() = Err(error);
        self
    }

    /// The behavior cancels or requeues the job while running.
    pub fn changing_state(self) -> Self {
        self.state.change_state_on_perform.store(true, Ordering::SeqCst);
        self
    }

    pub fn complete_answers(self, outcome: StoreOutcome) -> Self {
        *self.state.complete_outcome.lock() = outcome;
        self
    }

    pub fn fail_answers(self, outcome: StoreOutcome) -> Self {
        *self.state.fail_outcome.lock() = outcome;
        self
    }

    pub fn perform_calls(&self) -> usize {
        self.state.perform_calls.load(Ordering::SeqCst)
    }

    pub fn complete_calls(&self) -> usize {
        self.state.complete_calls.load(Ordering::SeqCst)
    }

    pub fn fail_calls(&self) -> Vec<(String, String)> {
        self.state.fail_calls.lock().clone()
    }
}

impl fmt::Display for FakeJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.attrs, f)
    }
}

#[async_trait]
impl Job for FakeJob {
    fn attributes(&self) -> &JobAttributes {
        &self.attrs
    }

    fn is_state_changed(&self) -> bool {
        self.state.state_changed.load(Ordering::SeqCst)
    }

    async fn perform(&self, _config: &WorkerConfig) -> Result<(), PerformError> {
        self.state.perform_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.change_state_on_perform.load(Ordering::SeqCst) {
            self.state.state_changed.store(true, Ordering::SeqCst);
        }
        self.state.perform_result.lock().clone()
    }

    async fn complete(&self) -> JobResult<()> {
        self.state.complete_calls.fetch_add(1, Ordering::SeqCst);
        let outcome = *self.state.complete_outcome.lock();
        outcome.into_result(self.attrs.jid.as_str())
    }

    async fn fail(&self, group: &str, message: &str) -> JobResult<()> {
        self.state
            .fail_calls
            .lock()
            .push((group.to_string(), message.to_string()));
        let outcome = *self.state.fail_outcome.lock();
        outcome.into_result(self.attrs.jid.as_str())
    }
}

/// Scripted answer for one `pop`.
#[derive(Debug)]
pub enum Pop {
    Job(FakeJob),
    Empty,
    Error,
}

#[derive(Debug, Default)]
struct FakeQueueState {
    script: Mutex<VecDeque<Pop>>,
    pop_calls: AtomicUsize,
}

/// Queue handle replaying scripted pops; empty once the script runs out.
#[derive(Debug, Clone)]
pub struct FakeQueue {
    name: String,
    state: Arc<FakeQueueState>,
}

#[async_trait]
impl Queue for FakeQueue {
    type Job = FakeJob;

    fn name(&self) -> &str {
        &self.name
    }

    async fn pop(&self) -> JobResult<Option<FakeJob>> {
        self.state.pop_calls.fetch_add(1, Ordering::SeqCst);
        match self.state.script.lock().pop_front() {
            Some(Pop::Job(job)) => Ok(Some(job)),
            Some(Pop::Empty) | None => Ok(None),
            Some(Pop::Error) => Err(JobError::Internal(format!(
                "connection refused while popping {}",
                self.name
            ))),
        }
    }
}

/// Client handing out [`FakeQueue`] handles that share state per name.
#[derive(Debug, Default)]
pub struct FakeClient {
    queues: Mutex<HashMap<String, Arc<FakeQueueState>>>,
    queue_requests: AtomicUsize,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self, name: &str) -> Arc<FakeQueueState> {
        self.queues
            .lock()
            .entry(name.to_string())
            .or_default()
            .clone()
    }

    /// Appends scripted pops for a queue.
    pub fn script(&self, queue: &str, pops: impl IntoIterator<Item = Pop>) -> &Self {
        self.state(queue).script.lock().extend(pops);
        self
    }

    pub fn pop_calls(&self, queue: &str) -> usize {
        self.state(queue).pop_calls.load(Ordering::SeqCst)
    }

    /// Number of `queue(name)` lookups made by users of this client.
    pub fn queue_requests(&self) -> usize {
        self.queue_requests.load(Ordering::SeqCst)
    }
}

impl Client for FakeClient {
    type Queue = FakeQueue;

    fn queue(&self, name: &str) -> FakeQueue {
        self.queue_requests.fetch_add(1, Ordering::SeqCst);
        FakeQueue {
            name: name.to_string(),
            state: self.state(name),
        }
    }
}

/// A log event seen by [`CaptureLayer`].
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: HashMap<String, String>,
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: HashMap<String, String>,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.insert(field.name().to_string(), value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let rendered = format!("{:?}", value);
        if field.name() == "message" {
            self.message = rendered;
        } else {
            self.fields.insert(field.name().to_string(), rendered);
        }
    }
}

/// Layer recording every event into a shared buffer.
#[derive(Clone, Default)]
pub struct CaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CaptureLayer {
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().clone()
    }

    pub fn at_level(&self, level: Level) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.level == level)
            .collect()
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        self.events.lock().push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

/// Installs a capturing subscriber for the current thread.
///
/// Use with the default current-thread `#[tokio::test]` runtime so every
/// task logs on the thread holding the guard.
pub fn capture_logs() -> (CaptureLayer, tracing::subscriber::DefaultGuard) {
    let layer = CaptureLayer::default();
    let subscriber = tracing_subscriber::registry().with(layer.clone());
    let guard = tracing::subscriber::set_default(subscriber);
    (layer, guard)
}
