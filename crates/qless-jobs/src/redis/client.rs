//! Redis client and queue handles.

use super::job::{decode_pop, RedisJob};
use super::{create_pool, load_script, script_now, transition_error};
use crate::config::RedisConfig;
use crate::error::{JobError, JobResult};
use crate::queue::{Client, Queue};
use crate::registry::HandlerRegistry;
use async_trait::async_trait;
use deadpool_redis::Pool;
use redis::{FromRedisValue, Script};
use std::sync::Arc;
use tracing::debug;

/// State shared by the client, its queues and every job they produce.
pub(crate) struct Shared {
    pool: Pool,
    script: Script,
    pub(crate) worker_name: String,
    pub(crate) registry: Arc<HandlerRegistry<RedisJob>>,
}

impl Shared {
    /// Invoke one script command.
    pub(crate) async fn call<T: FromRedisValue>(&self, command: &str, args: &[String]) -> JobResult<T> {
        let mut conn = self.pool.get().await?;

        let mut invocation = self.script.prepare_invoke();
        invocation.arg(command).arg(script_now());
        for arg in args {
            invocation.arg(arg);
        }

        debug!(command, "Invoking qless script");
        Ok(invocation.invoke_async(&mut *conn).await?)
    }

    /// Invoke a job transition, reporting script refusals as contention.
    pub(crate) async fn transition<T: FromRedisValue>(&self, command: &str, args: &[String]) -> JobResult<T> {
        match self.call(command, args).await {
            Err(JobError::Redis(err)) => Err(transition_error(err)),
            other => other,
        }
    }
}

/// [`Client`] backed by Redis and the qless-core script.
#[derive(Clone)]
pub struct RedisClient {
    shared: Arc<Shared>,
}

impl RedisClient {
    /// Connect to Redis and load the script.
    pub async fn connect(
        config: &RedisConfig,
        registry: Arc<HandlerRegistry<RedisJob>>,
    ) -> JobResult<Self> {
        let pool = create_pool(config).await?;
        let script = load_script(&config.script_path).await?;
        Ok(Self::new(pool, script, config.resolved_worker_name(), registry))
    }

    /// Build a client from parts.
    pub fn new(
        pool: Pool,
        script: Script,
        worker_name: impl Into<String>,
        registry: Arc<HandlerRegistry<RedisJob>>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                pool,
                script,
                worker_name: worker_name.into(),
                registry,
            }),
        }
    }

    /// Name this worker reports to the store.
    pub fn worker_name(&self) -> &str {
        &self.shared.worker_name
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry<RedisJob>> {
        &self.shared.registry
    }
}

impl Client for RedisClient {
    type Queue = RedisQueue;

    fn queue(&self, name: &str) -> RedisQueue {
        RedisQueue {
            name: name.to_string(),
            shared: self.shared.clone(),
        }
    }
}

/// Handle to one named queue.
#[derive(Clone)]
pub struct RedisQueue {
    name: String,
    shared: Arc<Shared>,
}

impl RedisQueue {
    #[cfg(test)]
    pub(crate) fn shared(&self) -> Arc<Shared> {
        self.shared.clone()
    }
}

#[async_trait]
impl Queue for RedisQueue {
    type Job = RedisJob;

    fn name(&self) -> &str {
        &self.name
    }

    async fn pop(&self) -> JobResult<Option<RedisJob>> {
        let args = [
            self.name.clone(),
            self.shared.worker_name.clone(),
            "1".to_string(),
        ];
        let payload: Option<String> = self.shared.call("pop", &args).await?;

        let attrs = match payload {
            Some(payload) => decode_pop(&payload)?,
            None => None,
        };
        Ok(attrs.map(|attrs| RedisJob::new(attrs, self.shared.clone())))
    }
}
