//! Queue and client abstractions.

use crate::error::JobResult;
use crate::job::Job;
use async_trait::async_trait;

/// A named, ordered source of pending jobs.
///
/// Ordering (priority, FIFO) is the store's business; a queue only answers
/// "here is one job" or "empty".
#[async_trait]
pub trait Queue: Send + Sync {
    /// Job type produced by this queue.
    type Job: Job;

    /// Queue name.
    fn name(&self) -> &str;

    /// Reserve at most one job.
    async fn pop(&self) -> JobResult<Option<Self::Job>>;
}

/// Handle to the backing store.
pub trait Client: Send + Sync {
    /// Queue handle type.
    type Queue: Queue;

    /// Returns a handle for the named queue.
    fn queue(&self, name: &str) -> Self::Queue;
}

/// Job type yielded by a client's queues.
pub type ClientJob<C> = <<C as Client>::Queue as Queue>::Job;
