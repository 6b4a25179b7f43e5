//! # Qless Worker
//!
//! Bootstrap pieces for the `qless-worker` binary: built-in job handlers,
//! termination signal wiring and startup logging.

pub mod handlers;
pub mod shutdown;
pub mod startup;
