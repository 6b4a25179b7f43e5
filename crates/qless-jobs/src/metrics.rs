//! Prometheus metrics for worker monitoring.
//!
//! Recording goes through the `metrics` facade; nothing is exported unless
//! the host process installs a recorder.

use metrics::{counter, describe_counter, describe_histogram, gauge, describe_gauge, histogram};
use std::time::Duration;

/// Metric names for the worker.
pub mod names {
    /// Total jobs reserved from a queue.
    pub const JOBS_RESERVED_TOTAL: &str = "qless_jobs_reserved_total";
    /// Total jobs completed by this worker.
    pub const JOBS_COMPLETED_TOTAL: &str = "qless_jobs_completed_total";
    /// Total jobs failed by this worker.
    pub const JOBS_FAILED_TOTAL: &str = "qless_jobs_failed_total";
    /// Total transitions rejected because another actor owns the job.
    pub const JOBS_OWNERSHIP_LOST_TOTAL: &str = "qless_jobs_ownership_lost_total";
    /// Total jobs whose state changed during execution.
    pub const JOBS_STATE_CHANGED_TOTAL: &str = "qless_jobs_state_changed_total";
    /// Total failed queue fetches.
    pub const POP_ERRORS_TOTAL: &str = "qless_jobs_pop_errors_total";

    /// Job execution duration in seconds.
    pub const JOB_DURATION_SECONDS: &str = "qless_job_duration_seconds";

    /// 1 while the worker accepts new jobs, 0 once stopped.
    pub const WORKER_RUNNING: &str = "qless_worker_running";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        names::JOBS_RESERVED_TOTAL,
        "Total number of jobs reserved from a queue"
    );
    describe_counter!(
        names::JOBS_COMPLETED_TOTAL,
        "Total number of jobs completed successfully"
    );
    describe_counter!(
        names::JOBS_FAILED_TOTAL,
        "Total number of jobs marked failed"
    );
    describe_counter!(
        names::JOBS_OWNERSHIP_LOST_TOTAL,
        "Total number of transitions rejected because the job was resolved elsewhere"
    );
    describe_counter!(
        names::JOBS_STATE_CHANGED_TOTAL,
        "Total number of jobs whose state changed while running"
    );
    describe_counter!(
        names::POP_ERRORS_TOTAL,
        "Total number of failed queue fetches"
    );

    describe_histogram!(
        names::JOB_DURATION_SECONDS,
        "Job execution duration in seconds"
    );

    describe_gauge!(
        names::WORKER_RUNNING,
        "Whether the worker accepts new jobs (1) or has been stopped (0)"
    );
}

/// Worker metrics recorder.
#[derive(Clone)]
pub struct WorkerMetrics;

impl WorkerMetrics {
    /// Record a job reserved.
    pub fn job_reserved(queue: &str, klass: &str) {
        counter!(
            names::JOBS_RESERVED_TOTAL,
            "queue" => queue.to_string(),
            "klass" => klass.to_string()
        )
        .increment(1);
    }

    /// Record a job completed.
    pub fn job_completed(queue: &str, klass: &str) {
        counter!(
            names::JOBS_COMPLETED_TOTAL,
            "queue" => queue.to_string(),
            "klass" => klass.to_string()
        )
        .increment(1);
    }

    /// Record a job failed.
    pub fn job_failed(queue: &str, klass: &str, group: &str) {
        counter!(
            names::JOBS_FAILED_TOTAL,
            "queue" => queue.to_string(),
            "klass" => klass.to_string(),
            "group" => group.to_string()
        )
        .increment(1);
    }

    /// Record a transition lost to another actor.
    pub fn ownership_lost(queue: &str, transition: &'static str) {
        counter!(
            names::JOBS_OWNERSHIP_LOST_TOTAL,
            "queue" => queue.to_string(),
            "transition" => transition
        )
        .increment(1);
    }

    /// Record a job whose state changed while it ran.
    pub fn state_changed(queue: &str) {
        counter!(
            names::JOBS_STATE_CHANGED_TOTAL,
            "queue" => queue.to_string()
        )
        .increment(1);
    }

    /// Record a failed queue fetch.
    pub fn pop_error(queue: &str) {
        counter!(
            names::POP_ERRORS_TOTAL,
            "queue" => queue.to_string()
        )
        .increment(1);
    }

    /// Record job execution duration.
    pub fn job_duration(queue: &str, klass: &str, outcome: &'static str, duration: Duration) {
        histogram!(
            names::JOB_DURATION_SECONDS,
            "queue" => queue.to_string(),
            "klass" => klass.to_string(),
            "outcome" => outcome
        )
        .record(duration.as_secs_f64());
    }

    /// Update the running gauge.
    pub fn set_running(running: bool) {
        gauge!(names::WORKER_RUNNING).set(if running { 1.0 } else { 0.0 });
    }
}
