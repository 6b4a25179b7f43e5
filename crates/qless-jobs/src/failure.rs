//! Execution errors and their classification into failure groups.

use std::fmt;

/// What a job's behavior reports when it does not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PerformError {
    /// A typed error with a name, human-readable text and diagnostic trace.
    Error {
        name: String,
        message: String,
        trace: String,
    },
    /// A bare value with no further structure.
    Value(String),
}

impl PerformError {
    /// Creates a structured error without a trace.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        PerformError::Error {
            name: name.into(),
            message: message.into(),
            trace: String::new(),
        }
    }

    /// Attaches diagnostic detail. No-op on bare values.
    #[must_use]
    pub fn with_trace(self, trace: impl Into<String>) -> Self {
        match self {
            PerformError::Error { name, message, .. } => PerformError::Error {
                name,
                message,
                trace: trace.into(),
            },
            value @ PerformError::Value(_) => value,
        }
    }

    /// Captures a Rust error: its type name, its message and its `source()`
    /// chain as the trace.
    pub fn from_error<E: std::error::Error + ?Sized>(err: &E) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(format!("caused by: {}", cause));
            source = cause.source();
        }

        PerformError::Error {
            name: short_type_name::<E>().to_string(),
            message: err.to_string(),
            trace: causes.join("\n"),
        }
    }
}

/// `my_crate::errors::TimeoutError<T>` -> `TimeoutError`
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

impl fmt::Display for PerformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerformError::Error { name, message, .. } => write!(f, "{}: {}", name, message),
            PerformError::Value(value) => write!(f, "{}", value),
        }
    }
}

impl std::error::Error for PerformError {}

impl From<String> for PerformError {
    fn from(value: String) -> Self {
        PerformError::Value(value)
    }
}

impl From<&str> for PerformError {
    fn from(value: &str) -> Self {
        PerformError::Value(value.to_string())
    }
}

/// The `(group, message)` pair recorded by the store for a failed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Failure group, used by the store to bucket failed jobs.
    pub group: String,
    /// Full failure text.
    pub message: String,
}

impl Failure {
    /// Classifies an execution error.
    ///
    /// Structured errors group by name and carry their text followed by a
    /// blank line and the trace. Bare values use their string form for both.
    pub fn classify(error: &PerformError) -> Self {
        match error {
            PerformError::Error { name, message, trace } => Self {
                group: name.clone(),
                message: format!("{}\n\n{}", message, trace),
            },
            PerformError::Value(value) => Self {
                group: value.clone(),
                message: value.clone(),
            },
        }
    }
}

impl From<&PerformError> for Failure {
    fn from(error: &PerformError) -> Self {
        Self::classify(error)
    }
}
