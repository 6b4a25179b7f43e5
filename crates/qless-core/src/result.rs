//! Result type aliases for the qless worker.

use crate::QlessError;

/// A specialized `Result` type for application-level operations.
pub type QlessResult<T> = Result<T, QlessError>;
