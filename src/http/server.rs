//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the dispatch endpoint
//! - Wire up middleware (request ID, tracing, body limit, timeout)
//! - Bind server to listener
//! - Graceful shutdown

use std::time::Duration;

use axum::{http::StatusCode, middleware, routing::any, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{ServerConfig, ValidationError};
use crate::http::middleware::{singlend_middleware, SinglendState};
use crate::http::request::UuidRequestId;
use crate::routing::Singlend;
use crate::schema::SchemaError;

/// Errors that stop the server from starting or running.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("invalid endpoint configuration: {0:?}")]
    Config(Vec<ValidationError>),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP server exposing one dispatch endpoint.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Freeze `api` and build the router for `config`.
    pub fn new(config: ServerConfig, api: Singlend) -> Result<Self, ServerError> {
        let options = config
            .endpoint
            .middleware_options()
            .map_err(ServerError::Config)?;
        let state = api.middleware(options)?;

        tracing::info!(
            path = %config.endpoint.path,
            entries = state.dispatcher().registry().len(),
            strict_schema = state.dispatcher().strict_schema(),
            "API frozen"
        );

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: SinglendState) -> Router {
        Router::new()
            .route(&config.endpoint.path, any(method_not_allowed))
            .route_layer(middleware::from_fn_with_state(state, singlend_middleware))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(RequestBodyLimitLayer::new(config.endpoint.max_body_bytes))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// The fully layered router, for embedding or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Reached only by methods the middleware does not intercept.
async fn method_not_allowed() -> StatusCode {
    StatusCode::METHOD_NOT_ALLOWED
}
