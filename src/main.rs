//! ipchecker - IP country allow-list service over HTTP and gRPC
//!
//! This is the composition root that wires together all the components.

use ipchecker::adapters::outbound::MaxMindGeoResolver;
use ipchecker::config::load_config;
use ipchecker::domain::ports::GeoResolver;
use ipchecker::infrastructure::{shutdown_signal, Coordinator, ServeSettings};
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let cfg = load_config()?;

    // Setup logging
    let log_level = if cfg.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    cfg.validate()?;

    tracing::info!(
        "starting ipchecker http={} grpc={}",
        cfg.http_listen_addr,
        cfg.grpc_listen_addr
    );

    // ===== COMPOSITION ROOT =====

    // The service cannot answer anything without geodata.
    let resolver: Arc<dyn GeoResolver> = match MaxMindGeoResolver::from_file(&cfg.geoip_path) {
        Ok(r) => Arc::new(r),
        Err(e) => {
            tracing::error!("failed to load GeoIP DB from {}: {:#}", cfg.geoip_path, e);
            return Err(e);
        }
    };

    let coordinator = Coordinator::new(resolver, ServeSettings::from(&cfg));
    tokio::spawn(shutdown_signal(coordinator.handle().controller()));

    coordinator.run().await?;

    tracing::info!("all listeners stopped, exiting");
    Ok(())
}
