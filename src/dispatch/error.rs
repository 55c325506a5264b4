//! Dispatch failures and their HTTP rendering.

use std::any::Any;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::schema::ValidationFailure;

/// Error type returned by user handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Every way a dispatch can fail.
#[derive(Debug, thiserror::Error)]
pub enum SinglendError {
    /// Body text is not JSON.
    #[error("Invalid JSON")]
    InvalidJson,

    /// Body is JSON but not a `{type, query}` envelope.
    #[error("Invalid Query")]
    InvalidQuery,

    /// Query rejected by a group or route schema.
    #[error("{0}")]
    InvalidQuerySchema(ValidationFailure),

    /// No route answers to the envelope's `type`.
    #[error("Not Found Query Type")]
    NotFoundQueryType,

    /// A handler failed or panicked.
    #[error("{message}")]
    InternalServerError { name: String, message: String },

    /// The request body could not be read (transport error or size limit).
    #[error("Invalid Body")]
    InvalidBody,
}

impl SinglendError {
    pub fn status(&self) -> StatusCode {
        match self {
            SinglendError::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SinglendError::InvalidJson => "invalid_json",
            SinglendError::InvalidQuery => "invalid_query",
            SinglendError::InvalidQuerySchema(_) => "invalid_query_schema",
            SinglendError::NotFoundQueryType => "not_found_query_type",
            SinglendError::InternalServerError { .. } => "internal_server_error",
            SinglendError::InvalidBody => "invalid_body",
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        SinglendError::InternalServerError {
            name: "Error".into(),
            message: message.into(),
        }
    }

    /// Reclassify an error returned by a handler.
    ///
    /// A `SinglendError` is passed through unchanged; anything else becomes
    /// `InternalServerError` carrying its message.
    pub fn from_handler_error(error: BoxError) -> Self {
        match error.downcast::<SinglendError>() {
            Ok(known) => *known,
            Err(other) => Self::internal(other.to_string()),
        }
    }

    /// Reclassify a panic raised inside a handler.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_default();
        tracing::error!(panic = %detail, "Handler panicked");
        Self::internal("Unknown error")
    }
}

impl IntoResponse for SinglendError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            SinglendError::InvalidQuerySchema(failure) => (status, Json(failure)).into_response(),
            SinglendError::InternalServerError { name, message } => {
                (status, Json(json!({ "name": name, "message": message }))).into_response()
            }
            other => (status, other.to_string()).into_response(),
        }
    }
}
