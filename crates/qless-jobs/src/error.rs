//! Job error types.

use qless_core::QlessError;
use thiserror::Error;

/// Result type for store operations on jobs and queues.
pub type JobResult<T> = Result<T, JobError>;

/// Errors reported by the backing store.
#[derive(Debug, Error)]
pub enum JobError {
    /// The store rejected a transition because this worker no longer owns
    /// the job: it was completed or failed elsewhere, handed to another
    /// worker, or cancelled.
    #[error("Job ownership lost: {0}")]
    Contention(String),

    /// Redis error.
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Redis pool error.
    #[error("Redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store answered with something the client cannot decode.
    #[error("Malformed store response: {0}")]
    Protocol(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl JobError {
    /// Creates a contention error.
    pub fn contention(message: impl Into<String>) -> Self {
        JobError::Contention(message.into())
    }

    /// Returns true if this error means another actor already resolved the
    /// job. The worker swallows these after logging them.
    pub fn is_contention(&self) -> bool {
        matches!(self, JobError::Contention(_))
    }
}

/// Errors surfaced by one worker cycle to whatever drives it.
///
/// Contention never appears here; execution failures are routed to
/// `fail` and only show up if resolving them fails.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// A queue fetch failed; later queues were not tried this cycle.
    #[error("Failed to pop from queue {queue}: {source}")]
    Pop {
        queue: String,
        #[source]
        source: JobError,
    },

    /// Completing a job failed for a reason other than contention.
    #[error("Failed to complete job {jid}: {source}")]
    Complete {
        jid: String,
        #[source]
        source: JobError,
    },

    /// Failing a job failed for a reason other than contention.
    #[error("Failed to fail job {jid}: {source}")]
    Fail {
        jid: String,
        #[source]
        source: JobError,
    },
}

impl WorkerError {
    /// The store error behind this failure.
    pub fn store_error(&self) -> &JobError {
        match self {
            WorkerError::Pop { source, .. }
            | WorkerError::Complete { source, .. }
            | WorkerError::Fail { source, .. } => source,
        }
    }
}

impl From<JobError> for QlessError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::Redis(e) => QlessError::Connection(e.to_string()),
            JobError::Pool(e) => QlessError::Connection(e.to_string()),
            JobError::Configuration(msg) => QlessError::Configuration(msg),
            other => QlessError::Internal(other.to_string()),
        }
    }
}

impl From<WorkerError> for QlessError {
    fn from(err: WorkerError) -> Self {
        QlessError::Worker(err.to_string())
    }
}
