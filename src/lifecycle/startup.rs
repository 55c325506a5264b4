//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize metrics when enabled
//! - Freeze the API and build the HTTP server
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Schemas compile before the listener binds (no traffic on a broken API)
//! - Listener starts last (traffic only when ready)

use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::http::server::{HttpServer, ServerError};
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;
use crate::routing::Singlend;

/// Serve `api` per `config` until a stop signal arrives.
pub async fn run(config: ServerConfig, api: Singlend) -> Result<(), ServerError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = HttpServer::new(config, api)?;

    let listener = TcpListener::bind(&server.config().listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        path = %server.config().endpoint.path,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    let stop = shutdown.subscribe();
    signals::spawn_signal_listener(shutdown);

    server.run(listener, stop).await
}
