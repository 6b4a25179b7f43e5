//! Qless Jobs - Worker Execution Core
//!
//! Reserves jobs from one or more named qless queues, executes them and
//! resolves each one to completion or failure against the backing store:
//! - Ordered multi-queue reservation with early exit
//! - Completion guarded against jobs whose state already changed
//! - Failure classification into `(group, message)`
//! - Lost ownership races (contention) logged and swallowed
//! - Cooperative, idempotent shutdown flag
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Runner                              │
//! │   while !shutdown:                                           │
//! │                                                              │
//! │   Worker::reserve ──► Queue[0].pop ─► Queue[1].pop ─► ...    │
//! │        │                 (first job or first error wins)     │
//! │        ▼                                                     │
//! │   Worker::perform ──► Job::perform(config)                   │
//! │        │                     │                               │
//! │        ▼ ok                  ▼ err                           │
//! │   try_complete          fail_job(group, message)             │
//! │        │                     │                               │
//! │        └──── contention? ────┴──► log + swallow              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use qless_jobs::{HandlerRegistry, QueueSpec, RedisClient, Runner, Worker, WorkerConfig};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(HandlerRegistry::new());
//! registry.register("SendEmail", SendEmail);
//!
//! let client = RedisClient::connect(&redis_config, registry).await?;
//! let worker = Arc::new(Worker::new(
//!     QueueSpec::from(vec!["critical", "default"]),
//!     &client,
//!     WorkerConfig::default(),
//! ));
//!
//! let stats = Runner::new(worker).run().await;
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod failure;
pub mod job;
pub mod metrics;
pub mod queue;
pub mod redis;
pub mod registry;
pub mod runner;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{QueueSpec, RedisConfig, WorkerConfig, DEFAULT_INTERVAL_MS, DEFAULT_QUEUE};
pub use context::JobLogContext;
pub use error::{JobError, JobResult, WorkerError};
pub use failure::{Failure, PerformError};
pub use job::{Jid, Job, JobAttributes, JobState};
pub use metrics::{register_metrics, WorkerMetrics};
pub use queue::{Client, ClientJob, Queue};
pub use redis::{RedisClient, RedisJob, RedisQueue};
pub use registry::{HandlerRegistry, JobHandler};
pub use runner::{Cycle, RunStats, Runner};
pub use worker::{TerminationSignal, Worker};

/// Re-export commonly used traits
pub mod prelude {
    pub use crate::job::{Job, JobState};
    pub use crate::queue::{Client, Queue};
    pub use crate::registry::JobHandler;
    pub use crate::worker::Worker;
    pub use crate::{JobError, JobResult, PerformError, WorkerConfig};
}
