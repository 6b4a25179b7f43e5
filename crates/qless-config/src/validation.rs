//! Configuration validation module.
//!
//! Fails fast on invalid configuration rather than at runtime.

use crate::AppConfig;
use std::fmt;
use url::Url;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    /// URL format is invalid.
    InvalidUrl { url_type: String, message: String },
    /// Pool size must be within bounds.
    InvalidPoolSize { value: usize, maximum: usize },
    /// Interval value must be positive.
    NonPositiveInterval { name: String },
    /// A queue name is blank.
    BlankQueueName { position: usize },
    /// The same queue appears twice in the list.
    DuplicateQueue { name: String },
    /// Script path is empty.
    MissingScriptPath,
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl { url_type, message } => {
                write!(f, "Invalid {} URL: {}", url_type, message)
            }
            Self::InvalidPoolSize { value, maximum } => {
                write!(f, "Invalid pool size {} (must be 1-{})", value, maximum)
            }
            Self::NonPositiveInterval { name } => {
                write!(f, "{} must be greater than zero", name)
            }
            Self::BlankQueueName { position } => {
                write!(f, "Queue name at position {} is blank", position)
            }
            Self::DuplicateQueue { name } => {
                write!(f, "Queue {} is listed more than once", name)
            }
            Self::MissingScriptPath => write!(f, "redis.script_path is required"),
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Result of configuration validation containing all errors found.
#[derive(Debug)]
pub struct ValidationResult {
    errors: Vec<ConfigValidationError>,
}

impl ValidationResult {
    fn new() -> Self {
        Self { errors: Vec::new() }
    }

    fn add_error(&mut self, error: ConfigValidationError) {
        self.errors.push(error);
    }

    /// Returns true if validation passed (no errors).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the validation errors.
    pub fn errors(&self) -> &[ConfigValidationError] {
        &self.errors
    }

    /// Converts to Result, returning Err with all errors if any exist.
    pub fn into_result(self) -> Result<(), Vec<ConfigValidationError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Maximum connection pool size.
    const MAX_POOL_SIZE: usize = 256;

    /// Validates the entire application configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut result = ValidationResult::new();

        Self::validate_queues(&config.queues, &mut result);
        Self::validate_worker(&config.worker, &mut result);
        Self::validate_redis(&config.redis, &mut result);

        result.into_result()
    }

    /// Validates the queue list. An empty list is allowed and means `default`.
    fn validate_queues(queues: &qless_jobs::QueueSpec, result: &mut ValidationResult) {
        if !queues.is_list() {
            return;
        }

        let names = queues.names();
        for (position, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                result.add_error(ConfigValidationError::BlankQueueName { position });
            } else if names[..position].contains(name) {
                result.add_error(ConfigValidationError::DuplicateQueue {
                    name: (*name).to_string(),
                });
            }
        }
    }

    fn validate_worker(config: &qless_jobs::WorkerConfig, result: &mut ValidationResult) {
        if config.interval_ms == 0 {
            result.add_error(ConfigValidationError::NonPositiveInterval {
                name: "worker.interval_ms".to_string(),
            });
        }
    }

    /// Validates Redis configuration.
    fn validate_redis(config: &qless_jobs::RedisConfig, result: &mut ValidationResult) {
        match Url::parse(&config.url) {
            Ok(url) if url.scheme() == "redis" || url.scheme() == "rediss" => {}
            Ok(url) => result.add_error(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: format!("unsupported scheme {}, expected redis or rediss", url.scheme()),
            }),
            Err(e) => result.add_error(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: format!("{}: {}", config.url, e),
            }),
        }

        if config.pool_size == 0 || config.pool_size > Self::MAX_POOL_SIZE {
            result.add_error(ConfigValidationError::InvalidPoolSize {
                value: config.pool_size,
                maximum: Self::MAX_POOL_SIZE,
            });
        }

        if config.script_path.trim().is_empty() {
            result.add_error(ConfigValidationError::MissingScriptPath);
        }
    }
}

/// Formats validation errors for display.
pub fn format_validation_errors(errors: &[ConfigValidationError]) -> String {
    let mut output = String::from("Configuration validation failed:\n");
    for (i, error) in errors.iter().enumerate() {
        output.push_str(&format!("  {}. {}\n", i + 1, error));
    }
    output
}
