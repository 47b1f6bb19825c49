// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Process-wide shutdown signaling.
//!
//! One write-once broadcast flag observed by every worker at its
//! suspension points. The flag is set exactly once (repeated triggers
//! are no-ops) and never resets. Workers include the signal as one case
//! of a `tokio::select!` rather than polling it, so cancellation latency
//! is bounded by the next suspension point, not by a spin interval.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Owner of the shutdown flag. Cloned into tasks that may trigger
/// shutdown (signal handler, completion watcher).
#[derive(Clone)]
pub struct ShutdownController {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Set the flag. Returns `true` only for the first trigger.
    pub fn trigger(&self) -> bool {
        !self.tx.send_replace(true)
    }

    /// Whether shutdown has been triggered.
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// A receiver for workers to select on.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve when the process receives SIGINT or SIGTERM.
///
/// No other signals are handled. If handler installation fails the
/// future pends forever; the pipeline then only stops through replay
/// completion or an explicit trigger.
#[cfg(unix)]
pub async fn interrupted() {
    use tokio::signal::unix::{signal, SignalKind};

    match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
        (Ok(mut sigint), Ok(mut sigterm)) => {
            tokio::select! {
                _ = sigint.recv() => info!("Received SIGINT"),
                _ = sigterm.recv() => info!("Received SIGTERM"),
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!(error = %e, "Failed to install signal handlers");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
pub async fn interrupted() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Received interrupt");
}
