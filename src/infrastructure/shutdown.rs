//! Graceful Shutdown Handler
//!
//! Provides coordinated shutdown for both listeners and tracks admission
//! calls that are still running against the shared resolver.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Shutdown coordinator for graceful termination.
///
/// Tracks in-flight requests and signals shutdown to all components.
#[derive(Clone)]
pub struct ShutdownController {
    /// Whether shutdown has been initiated
    shutdown_initiated: Arc<AtomicBool>,
    /// Number of in-flight admission calls
    active_requests: Arc<AtomicUsize>,
    /// Broadcast channel for shutdown signal
    shutdown_tx: broadcast::Sender<()>,
    /// Notify when all requests are drained
    drain_complete: Arc<Notify>,
}

impl ShutdownController {
    /// Create a new shutdown controller.
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
            active_requests: Arc::new(AtomicUsize::new(0)),
            shutdown_tx,
            drain_complete: Arc::new(Notify::new()),
        }
    }

    /// Subscribe to shutdown notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Initiate graceful shutdown.
    pub fn shutdown(&self) {
        if !self.shutdown_initiated.swap(true, Ordering::SeqCst) {
            tracing::info!("initiating graceful shutdown");
            let _ = self.shutdown_tx.send(());
        }
    }

    /// Check if shutdown has been initiated.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown_initiated.load(Ordering::SeqCst)
    }

    /// Resolve once shutdown has been initiated.
    ///
    /// Returns immediately if it already was.
    pub async fn wait(&self) {
        // Subscribe before checking the flag so a concurrent shutdown()
        // is either seen here or delivered on the channel.
        let mut rx = self.subscribe();
        if self.is_shutdown() {
            return;
        }
        let _ = rx.recv().await;
    }

    /// Get the number of in-flight requests.
    pub fn active_requests(&self) -> usize {
        self.active_requests.load(Ordering::SeqCst)
    }

    /// Increment in-flight request count.
    pub fn request_started(&self) {
        self.active_requests.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrement in-flight request count and notify if drained.
    pub fn request_ended(&self) {
        let prev = self.active_requests.fetch_sub(1, Ordering::SeqCst);
        if prev == 1 {
            self.drain_complete.notify_waiters();
        }
    }

    /// Wait for all in-flight requests to drain (with timeout).
    pub async fn wait_for_drain(&self, timeout: Duration) -> bool {
        self.wait_for_drain_until(Instant::now() + timeout).await
    }

    /// Wait for all in-flight requests to drain, giving up at `deadline`.
    pub async fn wait_for_drain_until(&self, deadline: Instant) -> bool {
        let drained = async {
            loop {
                let notified = self.drain_complete.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if self.active_requests() == 0 {
                    return;
                }
                notified.await;
            }
        };

        match tokio::time::timeout_at(deadline, drained).await {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(
                    "drain timeout: {} requests still active",
                    self.active_requests()
                );
                false
            }
        }
    }

    /// Create a request guard that auto-decrements on drop.
    pub fn request_guard(&self) -> RequestGuard {
        self.request_started();
        RequestGuard {
            controller: self.clone(),
        }
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard for tracking an in-flight request.
///
/// Automatically decrements the request count when dropped.
pub struct RequestGuard {
    controller: ShutdownController,
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.controller.request_ended();
    }
}

/// Install signal handlers for graceful shutdown.
///
/// Returns a future that completes when a shutdown signal is received.
#[cfg_attr(coverage_nightly, coverage(off))]
pub async fn shutdown_signal(controller: ShutdownController) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            tracing::info!("received SIGTERM, initiating shutdown");
        }
        _ = controller.wait() => {}
    }

    controller.shutdown();
}
