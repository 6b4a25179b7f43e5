//! The worker: reserve, perform, then complete or fail one job per cycle.

use crate::config::{QueueSpec, WorkerConfig};
use crate::context::JobLogContext;
use crate::error::WorkerError;
use crate::failure::{Failure, PerformError};
use crate::job::Job;
use crate::metrics::WorkerMetrics;
use crate::queue::{Client, ClientJob, Queue};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::sync::Notify;
use tracing::{debug, error, info};

/// Process termination signals that stop a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    /// Interactive interrupt (Ctrl+C).
    Interrupt,
    /// Managed termination from a supervisor.
    Terminate,
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationSignal::Interrupt => write!(f, "SIGINT"),
            TerminationSignal::Terminate => write!(f, "SIGTERM"),
        }
    }
}

/// Queue handles resolved once at construction.
enum Reservation<Q> {
    Single(Q),
    Ordered(Vec<Q>),
}

/// Drives jobs from one or more queues through perform and completion.
///
/// A worker never overlaps cycles; callers await each step before starting
/// the next. The shutdown flag is advisory and only read between cycles.
pub struct Worker<C: Client> {
    reservation: Reservation<C::Queue>,
    queue_names: Vec<String>,
    config: WorkerConfig,
    shutdown: AtomicBool,
    stop_notify: Notify,
}

impl<C: Client> Worker<C> {
    /// Create a worker for the given queues.
    ///
    /// A blank name or empty list falls back to the `default` queue.
    pub fn new(queues: impl Into<QueueSpec>, client: &C, config: WorkerConfig) -> Self {
        let spec = queues.into().normalized();
        let queue_names: Vec<String> = spec.names().into_iter().map(str::to_string).collect();

        let reservation = match &spec {
            QueueSpec::Single(name) => Reservation::Single(client.queue(name)),
            QueueSpec::List(names) => {
                Reservation::Ordered(names.iter().map(|name| client.queue(name)).collect())
            }
        };

        WorkerMetrics::set_running(true);

        Self {
            reservation,
            queue_names,
            config,
            shutdown: AtomicBool::new(false),
            stop_notify: Notify::new(),
        }
    }

    /// Reserve one job.
    ///
    /// With a queue list, queues are tried strictly in order; the first job
    /// or the first error ends the scan.
    pub async fn reserve(&self) -> Result<Option<ClientJob<C>>, WorkerError> {
        let job = match &self.reservation {
            Reservation::Single(queue) => pop_from(queue).await?,
            Reservation::Ordered(queues) => {
                let mut reserved = None;
                for queue in queues {
                    if let Some(job) = pop_from(queue).await? {
                        reserved = Some(job);
                        break;
                    }
                }
                reserved
            }
        };

        if let Some(job) = &job {
            let attrs = job.attributes();
            debug!(
                jid = %attrs.jid,
                klass = %attrs.klass_name,
                queue = %attrs.queue_name,
                "Reserved job"
            );
            WorkerMetrics::job_reserved(&attrs.queue_name, &attrs.klass_name);
        }

        Ok(job)
    }

    /// Run a job and resolve it.
    ///
    /// Execution errors go to [`fail_job`](Self::fail_job); only errors
    /// from the resolving transition reach the caller.
    pub async fn perform<J: Job>(&self, job: &J) -> Result<(), WorkerError> {
        let attrs = job.attributes();
        debug!(jid = %attrs.jid, klass = %attrs.klass_name, "Performing {}", job);

        let started = Instant::now();
        match job.perform(&self.config).await {
            Ok(()) => {
                WorkerMetrics::job_duration(
                    &attrs.queue_name,
                    &attrs.klass_name,
                    "completed",
                    started.elapsed(),
                );
                self.try_complete(job).await
            }
            Err(err) => {
                WorkerMetrics::job_duration(
                    &attrs.queue_name,
                    &attrs.klass_name,
                    "failed",
                    started.elapsed(),
                );
                self.fail_job(job, &err).await
            }
        }
    }

    /// Complete a job unless its state already changed.
    pub async fn try_complete<J: Job>(&self, job: &J) -> Result<(), WorkerError> {
        let attrs = job.attributes();

        if job.is_state_changed() {
            debug!(jid = %attrs.jid, "State of {} changed while running, not completing", job);
            WorkerMetrics::state_changed(&attrs.queue_name);
            return Ok(());
        }

        match job.complete().await {
            Ok(()) => {
                debug!(jid = %attrs.jid, "Completed {}", job);
                WorkerMetrics::job_completed(&attrs.queue_name, &attrs.klass_name);
                Ok(())
            }
            Err(err) if err.is_contention() => {
                error!(jid = %attrs.jid, error = %err, "Failed to complete {}: {}", job, err);
                WorkerMetrics::ownership_lost(&attrs.queue_name, "complete");
                Ok(())
            }
            Err(source) => Err(WorkerError::Complete {
                jid: attrs.jid.to_string(),
                source,
            }),
        }
    }

    /// Classify an execution error and mark the job failed.
    pub async fn fail_job<J: Job>(&self, job: &J, error: &PerformError) -> Result<(), WorkerError> {
        let attrs = job.attributes();
        let Failure { group, message } = Failure::classify(error);
        let context = serde_json::to_string(&JobLogContext::from(attrs)).unwrap_or_default();

        error!(
            group = %group,
            jid = %attrs.jid,
            context = %context,
            "Got {} failure from {}: {}",
            group,
            job,
            message
        );

        match job.fail(&group, &message).await {
            Ok(()) => {
                WorkerMetrics::job_failed(&attrs.queue_name, &attrs.klass_name, &group);
                Ok(())
            }
            Err(err) if err.is_contention() => {
                error!(
                    jid = %attrs.jid,
                    error = %err,
                    context = %context,
                    "Failed to fail {}: {}",
                    job,
                    err
                );
                WorkerMetrics::ownership_lost(&attrs.queue_name, "fail");
                Ok(())
            }
            Err(source) => Err(WorkerError::Fail {
                jid: attrs.jid.to_string(),
                source,
            }),
        }
    }

    /// Set the shutdown flag. Returns true only for the call that set it.
    pub fn stop(&self) -> bool {
        let first = !self.shutdown.swap(true, Ordering::SeqCst);
        if first {
            info!(queues = ?self.queue_names, "Worker will stop after the current cycle");
            WorkerMetrics::set_running(false);
            self.stop_notify.notify_waiters();
        }
        first
    }

    /// Log a termination signal, then stop.
    pub fn on_signal(&self, signal: TerminationSignal) -> bool {
        info!(signal = %signal, "{} received. Setting stop flag.", signal);
        self.stop()
    }

    /// Whether [`stop`](Self::stop) has been called.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Resolves once the shutdown flag is set.
    pub async fn stopped(&self) {
        loop {
            let notified = self.stop_notify.notified();
            if self.is_shutdown() {
                return;
            }
            notified.await;
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Queue names in reservation order.
    pub fn queue_names(&self) -> &[String] {
        &self.queue_names
    }

    /// Whether reservation scans a queue list.
    pub fn is_multi_queue(&self) -> bool {
        matches!(self.reservation, Reservation::Ordered(_))
    }
}

async fn pop_from<Q: Queue>(queue: &Q) -> Result<Option<Q::Job>, WorkerError> {
    queue.pop().await.map_err(|source| {
        WorkerMetrics::pop_error(queue.name());
        WorkerError::Pop {
            queue: queue.name().to_string(),
            source,
        }
    })
}
