//! Worker startup utilities.

use qless_config::AppConfig;
use tracing::info;
use url::Url;

/// Prints the startup banner.
pub fn print_banner() {
    info!(r#"
          __
   ____ _/ /__  __________
  / __ `/ / _ \/ ___/ ___/
 / /_/ / /  __(__  |__  )
 \__, /_/\___/____/____/
   /_/          worker
    "#);
}

/// Prints worker startup information.
pub fn print_startup_info(config: &AppConfig) {
    let separator = "=".repeat(60);
    info!("{}", separator);
    info!("Environment: {}", config.app.environment);
    info!("Queues:      {}", config.queues.names().join(", "));
    info!("Interval:    {}ms", config.worker.interval_ms);
    info!("Redis:       {}", redacted_url(&config.redis.url));
    info!("Worker name: {}", config.redis.resolved_worker_name());
    info!("{}", separator);
}

/// Hides the password in a connection URL.
pub fn redacted_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) if url.password().is_some() => {
            if url.set_password(Some("***")).is_err() {
                return "<redacted>".to_string();
            }
            url.to_string()
        }
        Ok(url) => url.to_string(),
        Err(_) => "<invalid url>".to_string(),
    }
}
