//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, path and method names
//! - Validate value ranges (limits and timeouts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::Method;

use crate::config::schema::{EndpointConfig, ServerConfig};
use crate::http::middleware::MiddlewareOptions;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid bind address `{0}`")]
    InvalidBindAddress(String),
    #[error("endpoint path `{0}` must start with '/'")]
    InvalidPath(String),
    #[error("endpoint must intercept at least one method")]
    NoMethods,
    #[error("invalid HTTP method `{0}`")]
    InvalidMethod(String),
    #[error("max_body_bytes must be greater than zero")]
    ZeroBodyLimit,
    #[error("request timeout must be greater than zero")]
    ZeroTimeout,
    #[error("invalid metrics address `{0}`")]
    InvalidMetricsAddress(String),
}

/// Check every semantic rule, collecting all failures.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if !config.endpoint.path.starts_with('/') {
        errors.push(ValidationError::InvalidPath(config.endpoint.path.clone()));
    }

    if config.endpoint.methods.is_empty() {
        errors.push(ValidationError::NoMethods);
    }
    if let Err(mut method_errors) = parse_methods(&config.endpoint.methods) {
        errors.append(&mut method_errors);
    }

    if config.endpoint.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn parse_methods(methods: &[String]) -> Result<Vec<Method>, Vec<ValidationError>> {
    let mut parsed = Vec::with_capacity(methods.len());
    let mut errors = Vec::new();
    for name in methods {
        match Method::from_bytes(name.to_ascii_uppercase().as_bytes()) {
            Ok(method) => parsed.push(method),
            Err(_) => errors.push(ValidationError::InvalidMethod(name.clone())),
        }
    }
    if errors.is_empty() {
        Ok(parsed)
    } else {
        Err(errors)
    }
}

impl EndpointConfig {
    /// Middleware options for this endpoint.
    pub fn middleware_options(&self) -> Result<MiddlewareOptions, Vec<ValidationError>> {
        Ok(MiddlewareOptions {
            methods: parse_methods(&self.methods)?,
            max_body_bytes: self.max_body_bytes,
        })
    }
}
