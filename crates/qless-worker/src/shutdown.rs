//! Termination signal wiring.
//!
//! Every SIGINT and SIGTERM is forwarded to [`Worker::on_signal`]; the worker
//! logs each one and sets its stop flag on the first.

use qless_jobs::{Client, TerminationSignal, Worker};
use std::io;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Install signal handlers forwarding to `worker`.
///
/// Handlers are registered before this returns, so signals delivered
/// afterwards are never lost. Abort the returned task once the worker has
/// finished.
#[cfg(unix)]
pub fn install<C>(worker: Arc<Worker<C>>) -> io::Result<JoinHandle<()>>
where
    C: Client + 'static,
{
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    Ok(tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                Some(()) = sigint.recv() => TerminationSignal::Interrupt,
                Some(()) = sigterm.recv() => TerminationSignal::Terminate,
                else => break,
            };
            worker.on_signal(received);
        }
    }))
}

#[cfg(not(unix))]
pub fn install<C>(worker: Arc<Worker<C>>) -> io::Result<JoinHandle<()>>
where
    C: Client + 'static,
{
    Ok(tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            worker.on_signal(TerminationSignal::Interrupt);
        }
        tracing::error!("Failed to listen for Ctrl+C");
    }))
}
