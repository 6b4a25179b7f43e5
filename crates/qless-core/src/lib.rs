//! # Qless Core
//!
//! Shared error definitions and logging setup used by every crate of the
//! qless worker workspace.

pub mod error;
pub mod result;
pub mod telemetry;

pub use error::*;
pub use result::*;
pub use telemetry::{init_logging, LoggingConfig};
