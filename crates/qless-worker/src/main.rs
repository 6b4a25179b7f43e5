//! # Qless Worker
//!
//! Reserves jobs from the configured qless queues and runs them until
//! SIGINT or SIGTERM. The cycle in progress always finishes first.

use qless_config::{AppConfig, ConfigLoader};
use qless_core::{init_logging, QlessResult};
use qless_jobs::{register_metrics, HandlerRegistry, RedisClient, Runner, Worker};
use qless_worker::{handlers, shutdown, startup};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match ConfigLoader::from_default_location() {
        Ok(loader) => loader.get().await,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    startup::print_banner();
    info!("Starting qless worker...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    startup::print_startup_info(&config);

    if let Err(e) = run(config).await {
        error!(code = e.error_code(), "Worker error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> QlessResult<()> {
    register_metrics();

    let registry = Arc::new(HandlerRegistry::new());
    handlers::register_builtin(&registry);
    info!(klasses = ?registry.klasses(), "Job handlers registered");

    let client = RedisClient::connect(&config.redis, registry).await?;
    info!(worker = client.worker_name(), "Connected to Redis");

    let worker = Arc::new(Worker::new(config.queues, &client, config.worker));
    let signals = shutdown::install(worker.clone())?;

    let stats = Runner::new(worker).run().await;
    signals.abort();

    info!(
        performed = stats.performed,
        idle_polls = stats.idle_polls,
        errors = stats.errors,
        "Worker shutdown complete"
    );
    Ok(())
}
