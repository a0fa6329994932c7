//! Mock OpenID Connect provider (v1)
//!
//! A development identity provider built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌────────────────────────────────────────────────────────┐
//!                       │                      OIDC MOCK                         │
//!                       │                                                        │
//!   Client Request      │  ┌─────────┐    ┌────────────┐    ┌──────────────┐    │
//!   ────────────────────┼─▶│  http   │───▶│ lifecycle  │───▶│   routing    │    │
//!                       │  │ server  │    │  engine()  │    │  normalize   │    │
//!                       │  └─────────┘    └─────┬──────┘    └──────┬───────┘    │
//!                       │                       │ first use        │            │
//!                       │                       ▼                  ▼            │
//!                       │                ┌────────────┐    ┌──────────────┐     │
//!                       │                │  config +  │    │   provider   │     │
//!                       │                │  account   │    │    engine    │     │
//!                       │                └────────────┘    └──────┬───────┘     │
//!   Client Response     │                                          │            │
//!   ◀───────────────────┼──────────────────────────────────────────┘            │
//!                       │                                                        │
//!                       │  Cross-cutting: observability (logs, metrics, spans)   │
//!                       └────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tokio::net::TcpListener;

use oidc_mock::config::loader::load_server;
use oidc_mock::http::HttpServer;
use oidc_mock::lifecycle::{engine_manager, signals, Shutdown};
use oidc_mock::observability::{logging, metrics};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    tracing::info!("oidc-mock v{} starting", env!("CARGO_PKG_VERSION"));

    let config = load_server()?;
    tracing::info!(
        bind_address = %config.bind_address,
        request_timeout_secs = config.request_timeout_secs,
        "Server configuration loaded"
    );

    if let Some(metrics_address) = &config.metrics_address {
        match metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    // The engine is built by the first request, not here.
    let engines = Arc::new(engine_manager());

    let shutdown = Arc::new(Shutdown::new());
    signals::spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(&config, engines);
    server.run(listener, shutdown.wait()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
