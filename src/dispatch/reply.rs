//! Response builders handed to route and group handlers.
//!
//! # Responsibilities
//! - Build the `{status, response}` record a handler returns
//! - Build the `next(value)` record a group handler returns to continue
//!
//! # Design Decisions
//! - All builders are pure: they allocate a record and nothing else
//! - `ok` defaults to 200, `error` to 400, `response` takes an explicit status

use std::fmt;
use std::marker::PhantomData;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;

/// The only shape a handler hands back to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub response: Value,
}

impl Reply {
    pub fn new(response: Value, status: StatusCode) -> Self {
        Self { status, response }
    }

    /// 200 OK.
    pub fn ok(response: Value) -> Self {
        Self::new(response, StatusCode::OK)
    }

    pub fn ok_with(response: Value, status: StatusCode) -> Self {
        Self::new(response, status)
    }

    /// 400 Bad Request.
    pub fn error(response: Value) -> Self {
        Self::new(response, StatusCode::BAD_REQUEST)
    }

    pub fn error_with(response: Value, status: StatusCode) -> Self {
        Self::new(response, status)
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

/// Builders available to route handlers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Respond;

impl Respond {
    pub fn ok(self, response: Value) -> Reply {
        Reply::ok(response)
    }

    pub fn ok_with(self, response: Value, status: StatusCode) -> Reply {
        Reply::ok_with(response, status)
    }

    pub fn error(self, response: Value) -> Reply {
        Reply::error(response)
    }

    pub fn error_with(self, response: Value, status: StatusCode) -> Reply {
        Reply::error_with(response, status)
    }

    pub fn response(self, response: Value, status: StatusCode) -> Reply {
        Reply::new(response, status)
    }
}

/// What a group handler decided: continue into the route, or answer now.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupReply<V> {
    /// Continue into the inner route carrying `V`.
    Next(V),
    /// Short-circuit with this reply; the inner route never runs.
    Reply(Reply),
}

/// Builders available to group handlers.
pub struct GroupRespond<V> {
    _value: PhantomData<fn() -> V>,
}

impl<V> GroupRespond<V> {
    pub(crate) fn new() -> Self {
        Self { _value: PhantomData }
    }

    pub fn next(self, value: V) -> GroupReply<V> {
        GroupReply::Next(value)
    }

    pub fn error(self, response: Value) -> GroupReply<V> {
        GroupReply::Reply(Reply::error(response))
    }

    pub fn error_with(self, response: Value, status: StatusCode) -> GroupReply<V> {
        GroupReply::Reply(Reply::error_with(response, status))
    }

    pub fn response(self, response: Value, status: StatusCode) -> GroupReply<V> {
        GroupReply::Reply(Reply::new(response, status))
    }
}

impl<V> Clone for GroupRespond<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for GroupRespond<V> {}

impl<V> fmt::Debug for GroupRespond<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GroupRespond")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_defaults() {
        let r = Respond;
        assert_eq!(r.ok(json!({"a": 1})).status, StatusCode::OK);
        assert_eq!(r.error(json!({})).status, StatusCode::BAD_REQUEST);
        assert_eq!(
            r.response(json!(null), StatusCode::IM_A_TEAPOT).status,
            StatusCode::IM_A_TEAPOT
        );
        assert_eq!(
            r.ok_with(json!(1), StatusCode::CREATED),
            Reply::new(json!(1), StatusCode::CREATED)
        );
        assert_eq!(
            r.error_with(json!(1), StatusCode::NOT_FOUND).status,
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_group_builders() {
        let g = GroupRespond::<String>::new();
        assert_eq!(g.next("12345".into()), GroupReply::Next("12345".to_string()));
        assert_eq!(
            g.error(json!({"message": "Invalid id"})),
            GroupReply::Reply(Reply::error(json!({"message": "Invalid id"})))
        );
        assert_eq!(
            g.response(json!([]), StatusCode::ACCEPTED),
            GroupReply::Reply(Reply::new(json!([]), StatusCode::ACCEPTED))
        );
    }

    #[tokio::test]
    async fn test_ok_serializes_as_json() {
        let response = Reply::ok(json!({"a": 1})).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "application/json"
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"a":1}"#);
    }
}
