//! Lifecycle Coordinator
//!
//! Owns the shared geo resolver, brings both listeners up together and
//! tears everything down in order: stop listeners, drain in-flight
//! admission calls, then close the resolver exactly once.

use crate::adapters::inbound::{GrpcServer, HttpServer};
use crate::application::IpCheckService;
use crate::config::Config;
use crate::domain::ports::GeoResolver;
use crate::infrastructure::shutdown::ShutdownController;
use anyhow::Context;
use parking_lot::RwLock;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::Instant;

/// Lifecycle phase of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Resolver open, nothing listening yet
    Created,
    /// Both listeners accepting requests
    Running,
    /// Listeners stopped or stopping, draining in-flight calls
    Stopping,
    /// Resolver closed
    Stopped,
}

/// Listener addresses and drain bound.
#[derive(Debug, Clone)]
pub struct ServeSettings {
    pub http_listen_addr: String,
    pub grpc_listen_addr: String,
    pub drain_timeout: Duration,
}

impl From<&Config> for ServeSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            http_listen_addr: cfg.http_listen_addr.clone(),
            grpc_listen_addr: cfg.grpc_listen_addr.clone(),
            drain_timeout: Duration::from_secs(cfg.drain_timeout_secs),
        }
    }
}

/// Cloneable view of a coordinator: current state plus the shutdown trigger.
#[derive(Clone)]
pub struct LifecycleHandle {
    state: Arc<RwLock<LifecycleState>>,
    shutdown: ShutdownController,
}

impl LifecycleHandle {
    fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(LifecycleState::Created)),
            shutdown: ShutdownController::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.read()
    }

    /// Request the `Running -> Stopping` transition.
    pub fn shutdown(&self) {
        self.shutdown.shutdown();
    }

    pub fn controller(&self) -> ShutdownController {
        self.shutdown.clone()
    }

    fn transition(&self, next: LifecycleState) {
        let mut state = self.state.write();
        tracing::debug!("lifecycle {:?} -> {:?}", *state, next);
        *state = next;
    }
}

/// Lifecycle coordinator.
///
/// The only owner allowed to close the resolver. Adapters receive an
/// `IpCheckService`, which has no way to close it.
pub struct Coordinator {
    resolver: Arc<dyn GeoResolver>,
    settings: ServeSettings,
    handle: LifecycleHandle,
}

impl Coordinator {
    /// Take ownership of an opened resolver.
    pub fn new(resolver: Arc<dyn GeoResolver>, settings: ServeSettings) -> Self {
        Self {
            resolver,
            settings,
            handle: LifecycleHandle::new(),
        }
    }

    pub fn handle(&self) -> LifecycleHandle {
        self.handle.clone()
    }

    /// Bind both listeners.
    ///
    /// Either both ports are bound or neither is: if the second bind fails
    /// the first listener is dropped, the resolver is closed and the
    /// coordinator ends in `Stopped`.
    pub async fn bind(self) -> anyhow::Result<BoundCoordinator> {
        let listeners = async {
            let http = TcpListener::bind(&self.settings.http_listen_addr)
                .await
                .with_context(|| {
                    format!("failed to bind HTTP listener on {}", self.settings.http_listen_addr)
                })?;
            let grpc = TcpListener::bind(&self.settings.grpc_listen_addr)
                .await
                .with_context(|| {
                    format!("failed to bind gRPC listener on {}", self.settings.grpc_listen_addr)
                })?;
            anyhow::Ok((http, grpc))
        }
        .await;

        match listeners {
            Ok((http_listener, grpc_listener)) => Ok(BoundCoordinator {
                resolver: self.resolver,
                settings: self.settings,
                handle: self.handle,
                http_listener,
                grpc_listener,
            }),
            Err(e) => {
                tracing::error!("startup aborted: {:#}", e);
                close_resolver(self.resolver.as_ref());
                self.handle.transition(LifecycleState::Stopped);
                Err(e)
            }
        }
    }

    /// Bind, serve until shutdown, then tear down.
    pub async fn run(self) -> anyhow::Result<()> {
        self.bind().await?.run().await
    }
}

/// Coordinator whose listeners are bound but not yet serving.
pub struct BoundCoordinator {
    resolver: Arc<dyn GeoResolver>,
    settings: ServeSettings,
    handle: LifecycleHandle,
    http_listener: TcpListener,
    grpc_listener: TcpListener,
}

impl BoundCoordinator {
    pub fn http_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.http_listener.local_addr()?)
    }

    pub fn grpc_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.grpc_listener.local_addr()?)
    }

    pub fn handle(&self) -> LifecycleHandle {
        self.handle.clone()
    }

    /// Serve both protocols until shutdown is requested.
    ///
    /// The gRPC listener runs as its own task; HTTP is served on the
    /// calling task, so this returns only after shutdown completes. A gRPC
    /// failure while running raises the shutdown signal so HTTP stops too.
    pub async fn run(self) -> anyhow::Result<()> {
        let BoundCoordinator {
            resolver,
            settings,
            handle,
            http_listener,
            grpc_listener,
        } = self;
        let shutdown = handle.controller();

        let service = Arc::new(IpCheckService::new(resolver.clone()));
        let http = HttpServer::new(service.clone(), shutdown.clone());
        let grpc = GrpcServer::new(service, shutdown.clone());

        handle.transition(LifecycleState::Running);

        let mut grpc_task = tokio::spawn({
            let shutdown = shutdown.clone();
            async move {
                let result = grpc.serve(grpc_listener).await;
                if let Err(e) = &result {
                    tracing::error!("gRPC listener failed: {:#}", e);
                    shutdown.shutdown();
                }
                result
            }
        });

        let http_result = http.serve(http_listener).await;
        if let Err(e) = &http_result {
            tracing::error!("HTTP listener failed: {:#}", e);
        }

        // However HTTP ended, gRPC must stop as well.
        shutdown.shutdown();
        handle.transition(LifecycleState::Stopping);

        // One deadline bounds both the gRPC join and the in-flight drain.
        let deadline = Instant::now() + settings.drain_timeout;

        let grpc_result =
            match tokio::time::timeout_at(deadline, &mut grpc_task).await {
                Ok(Ok(result)) => result,
                Ok(Err(join_err)) => Err(anyhow::anyhow!("gRPC listener task failed: {}", join_err)),
                Err(_) => {
                    tracing::warn!(
                        "gRPC listener did not stop within {:?}, aborting it",
                        settings.drain_timeout
                    );
                    grpc_task.abort();
                    Ok(())
                }
            };

        if !shutdown.wait_for_drain_until(deadline).await {
            tracing::warn!(
                "closing geo resolver with {} admission calls still in flight",
                shutdown.active_requests()
            );
        }

        close_resolver(resolver.as_ref());
        handle.transition(LifecycleState::Stopped);
        tracing::info!("shutdown complete");

        http_result.and(grpc_result)
    }
}

fn close_resolver(resolver: &dyn GeoResolver) {
    match resolver.close() {
        Ok(()) => tracing::info!("geo resolver released"),
        Err(e) => tracing::error!("failed to close geo resolver: {}", e),
    }
}
