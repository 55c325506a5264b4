//! Configuration schema definitions.
//!
//! This module defines the configuration structure for the demo server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The single dispatch endpoint.
    pub endpoint: EndpointConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Where and how the dispatcher is mounted.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Path the middleware is attached to.
    pub path: String,

    /// HTTP methods that are dispatched; others fall through.
    pub methods: Vec<String>,

    /// Reject undeclared keys in object query schemas.
    pub strict_schema: bool,

    /// Largest accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            path: "/api/singlend".to_string(),
            methods: vec!["POST".to_string()],
            strict_schema: true,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Pretty for development, JSON for production.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics listener.
    pub metrics_enabled: bool,

    /// Metrics listener address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "singlend=debug,tower_http=debug".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
