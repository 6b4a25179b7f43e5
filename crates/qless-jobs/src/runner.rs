//! Driving loop: repeat worker cycles until the worker is stopped.

use crate::error::WorkerError;
use crate::queue::Client;
use crate::worker::Worker;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, Instrument};

/// Outcome of one successful cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    /// A job was reserved and resolved.
    Performed,
    /// Every queue was empty.
    Idle,
}

/// Counters for one [`Runner::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Jobs reserved and resolved.
    pub performed: u64,
    /// Cycles that found no job.
    pub idle_polls: u64,
    /// Cycles that ended in a reservation or resolution error.
    pub errors: u64,
}

/// Runs a worker's cycles back to back.
pub struct Runner<C: Client> {
    worker: Arc<Worker<C>>,
}

impl<C: Client> Runner<C> {
    pub fn new(worker: Arc<Worker<C>>) -> Self {
        Self { worker }
    }

    pub fn worker(&self) -> &Arc<Worker<C>> {
        &self.worker
    }

    /// Reserve and, if a job came back, perform it.
    pub async fn run_once(&self) -> Result<Cycle, WorkerError> {
        match self.worker.reserve().await? {
            Some(job) => {
                self.worker.perform(&job).await?;
                Ok(Cycle::Performed)
            }
            None => Ok(Cycle::Idle),
        }
    }

    /// Run cycles until the shutdown flag is set.
    ///
    /// After an empty reservation or an error the loop sleeps for the
    /// configured interval; [`Worker::stop`] cuts that sleep short. A cycle
    /// already in progress always runs to the end.
    pub async fn run(&self) -> RunStats {
        let span = info_span!(
            "worker",
            pid = std::process::id(),
            queues = ?self.worker.queue_names()
        );
        self.drive().instrument(span).await
    }

    async fn drive(&self) -> RunStats {
        info!(
            interval_ms = self.worker.config().interval_ms,
            "Worker started"
        );

        let mut stats = RunStats::default();
        while !self.worker.is_shutdown() {
            match self.run_once().await {
                Ok(Cycle::Performed) => stats.performed += 1,
                Ok(Cycle::Idle) => {
                    stats.idle_polls += 1;
                    debug!("No jobs available, sleeping");
                    self.idle().await;
                }
                Err(e) => {
                    stats.errors += 1;
                    error!(error = %e, "Worker cycle failed");
                    self.idle().await;
                }
            }
        }

        info!(
            performed = stats.performed,
            idle_polls = stats.idle_polls,
            errors = stats.errors,
            "Worker stopped"
        );
        stats
    }

    async fn idle(&self) {
        tokio::select! {
            _ = tokio::time::sleep(self.worker.config().interval()) => {}
            _ = self.worker.stopped() => {}
        }
    }
}
