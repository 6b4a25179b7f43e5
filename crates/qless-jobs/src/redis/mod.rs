//! Redis-backed client driving the qless-core Lua script.
//!
//! Every store operation is one `EVALSHA` of the script with no keys and
//! `command, now, ...args` as arguments. Queue storage, ordering, locking
//! and retry bookkeeping all live in the script.

mod client;
mod job;

pub use client::{RedisClient, RedisQueue};
pub use job::RedisJob;

use crate::config::RedisConfig;
use crate::error::{JobError, JobResult};
use deadpool_redis::{Config, Pool, Runtime};
use redis::{ErrorKind, RedisError, Script};
use std::path::Path;
use tracing::info;

/// Create a Redis connection pool.
pub async fn create_pool(config: &RedisConfig) -> JobResult<Pool> {
    info!(url = %config.url, pool_size = config.pool_size, "Creating Redis connection pool...");

    let cfg = Config::from_url(&config.url);

    let pool = cfg
        .builder()
        .map_err(|e| JobError::Configuration(format!("Invalid Redis config: {}", e)))?
        .max_size(config.pool_size)
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| JobError::Configuration(format!("Failed to create pool: {}", e)))?;

    // Test connection
    let mut conn = pool.get().await?;
    redis::cmd("PING")
        .query_async::<String>(&mut *conn)
        .await?;

    info!("Redis connection pool created successfully");

    Ok(pool)
}

/// Read the qless-core script from disk.
pub async fn load_script(path: impl AsRef<Path>) -> JobResult<Script> {
    let path = path.as_ref();
    let source = tokio::fs::read_to_string(path).await.map_err(|e| {
        JobError::Configuration(format!(
            "Failed to read qless script {}: {}",
            path.display(),
            e
        ))
    })?;

    if source.trim().is_empty() {
        return Err(JobError::Configuration(format!(
            "qless script {} is empty",
            path.display()
        )));
    }

    info!(path = %path.display(), "Loaded qless script");
    Ok(Script::new(&source))
}

/// Map an error from a job transition (complete, fail, cancel, retry,
/// heartbeat).
///
/// The script refuses transitions on jobs this worker no longer owns by
/// calling `error("Complete(): Job ... is not currently running")`. Redis
/// reports that as an `ERR` reply whose detail names the script. Any other
/// reply error (`OOM`, `BUSY`, `NOPERM`, arity errors, a failing
/// `redis.call` inside the script) is a store failure, not a race.
pub(crate) fn transition_error(err: RedisError) -> JobError {
    if is_script_refusal(&err) {
        JobError::Contention(err.to_string())
    } else {
        JobError::Redis(err)
    }
}

fn is_script_refusal(err: &RedisError) -> bool {
    if err.kind() != ErrorKind::ResponseError || err.code() != Some("ERR") {
        return false;
    }
    err.detail().is_some_and(|detail| {
        detail.contains("user_script:") && detail.contains("(): ")
    })
}

/// Current time as the script expects it: float seconds.
pub(crate) fn script_now() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    format!("{}.{:03}", millis / 1000, millis % 1000)
}
