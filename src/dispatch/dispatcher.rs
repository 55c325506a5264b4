//! Per-request dispatch protocol.
//!
//! # Responsibilities
//! - Parse the envelope and resolve its `type`
//! - Run the group pre-handler, if any, and honour its short-circuit
//! - Validate the query against the effective schema
//! - Invoke the route handler and return its reply
//! - Reclassify handler errors and panics
//!
//! # Design Decisions
//! - The registry is frozen at construction; every reachable effective schema
//!   is compiled once, keyed by `type`
//! - A group schema is validated as declared. Strictness applies to the
//!   schema the route finally sees (group ∪ route when both are objects)
//! - Nothing is written until the whole chain succeeds or fails

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::Value;
use tracing::Instrument;

use super::{BoxError, Envelope, Reply, Respond, SinglendError};
use crate::http::X_REQUEST_ID;
use crate::observability::metrics;
use crate::routing::{resolve, GroupOutcome, Registry, ResolvedTarget};
use crate::schema::{CompiledSchema, Schema, SchemaError};

/// Default cap on request body size (1 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Compiled validators for one resolvable `type`.
#[derive(Debug)]
struct Validators {
    group: Option<CompiledSchema>,
    route: CompiledSchema,
}

impl Validators {
    fn for_target(target: ResolvedTarget<'_>, strict: bool) -> Result<Self, SchemaError> {
        match target {
            ResolvedTarget::Route(route) => {
                let schema = if strict {
                    route.schema().strict_or_passthrough()
                } else {
                    route.schema().clone()
                };
                Ok(Self {
                    group: None,
                    route: schema.compile()?,
                })
            }
            ResolvedTarget::Grouped(group, route) => Ok(Self {
                group: Some(group.schema().compile()?),
                route: grouped_route_schema(group.schema(), route.schema(), strict)
                    .compile()?,
            }),
        }
    }
}

/// Effective schema of a route reached through a group.
fn grouped_route_schema(group: &Schema, route: &Schema, strict: bool) -> Schema {
    if !(group.is_object() && route.is_object()) {
        return route.clone();
    }
    let merged = route.merge(group);
    if strict {
        merged.strict_or_passthrough()
    } else {
        merged
    }
}

struct Inner {
    registry: Registry,
    strict_schema: bool,
    validators: HashMap<String, Validators>,
}

/// Frozen registry plus the request protocol. Cheap to clone.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
    max_body_bytes: usize,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("entries", &self.inner.registry.len())
            .field("types", &self.inner.validators.len())
            .field("strict_schema", &self.inner.strict_schema)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

impl Dispatcher {
    /// Freeze `registry`, compiling the schemas of every reachable route.
    ///
    /// `strict_schema` applies to every entry, mounted ones included.
    pub fn new(registry: Registry, strict_schema: bool) -> Result<Self, SchemaError> {
        let mut validators = HashMap::new();
        for type_name in registry.type_names() {
            if validators.contains_key(type_name) {
                continue;
            }
            if let Some(target) = resolve(&registry, type_name) {
                validators.insert(type_name.to_string(), Validators::for_target(target, strict_schema)?);
            }
        }

        tracing::debug!(
            entries = registry.len(),
            types = validators.len(),
            strict_schema,
            "Registry frozen"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                registry,
                strict_schema,
                validators,
            }),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn strict_schema(&self) -> bool {
        self.inner.strict_schema
    }

    /// Serve one HTTP request end to end.
    pub async fn handle(&self, request: Request) -> Response {
        let start = Instant::now();
        let request_id = request
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        let span = tracing::info_span!("singlend", request_id = %request_id);
        let result = self.read_and_dispatch(request.into_body()).instrument(span).await;

        match result {
            Ok(reply) => {
                metrics::record_request(reply.status.as_u16(), start);
                reply.into_response()
            }
            Err(error) => {
                if error.status().is_server_error() {
                    tracing::error!(request_id = %request_id, kind = error.kind(), error = %error, "Dispatch failed");
                } else {
                    tracing::warn!(request_id = %request_id, kind = error.kind(), error = %error, "Dispatch rejected");
                }
                metrics::record_failure(error.kind());
                metrics::record_request(error.status().as_u16(), start);
                error.into_response()
            }
        }
    }

    async fn read_and_dispatch(&self, body: Body) -> Result<Reply, SinglendError> {
        match axum::body::to_bytes(body, self.max_body_bytes).await {
            Ok(bytes) => self.dispatch(&bytes).await,
            Err(e) => {
                tracing::debug!(error = %e, limit = self.max_body_bytes, "Failed to read body");
                Err(SinglendError::InvalidBody)
            }
        }
    }

    /// Run the dispatch protocol on a raw request body.
    pub async fn dispatch(&self, body: &[u8]) -> Result<Reply, SinglendError> {
        let envelope = Envelope::parse(body)?;

        let Some(target) = resolve(&self.inner.registry, &envelope.type_name) else {
            return Err(SinglendError::NotFoundQueryType);
        };
        let validators = self
            .inner
            .validators
            .get(&envelope.type_name)
            .ok_or_else(|| SinglendError::internal("no validators for resolved type"))?;

        match target {
            ResolvedTarget::Route(route) => {
                tracing::debug!(type_name = %envelope.type_name, "Dispatching route");
                let query = validate(&validators.route, &envelope.query).await?;
                let handler = route.handler().clone();
                guarded(move || handler(query, Respond)).await
            }
            ResolvedTarget::Grouped(group, route) => {
                tracing::debug!(type_name = %envelope.type_name, "Dispatching grouped route");
                let group_schema = validators
                    .group
                    .as_ref()
                    .ok_or_else(|| SinglendError::internal("no group validator for grouped type"))?;
                let group_query = validate(group_schema, &envelope.query).await?;

                let group_handler = group.handler().clone();
                let value = match guarded(move || group_handler(group_query)).await? {
                    GroupOutcome::Reply(reply) => {
                        tracing::debug!(
                            type_name = %envelope.type_name,
                            status = reply.status.as_u16(),
                            "Group answered before route"
                        );
                        return Ok(reply);
                    }
                    GroupOutcome::Next(value) => value,
                };

                let query = validate(&validators.route, &envelope.query).await?;
                let handler = route.handler().clone();
                guarded(move || handler(query, value, Respond)).await
            }
        }
    }
}

async fn validate(schema: &CompiledSchema, query: &Value) -> Result<Value, SinglendError> {
    schema
        .validate(query)
        .await
        .map_err(SinglendError::InvalidQuerySchema)
}

/// Invoke a handler, catching both returned errors and panics.
async fn guarded<T>(
    invoke: impl FnOnce() -> BoxFuture<'static, Result<T, BoxError>>,
) -> Result<T, SinglendError> {
    let outcome = match std::panic::catch_unwind(AssertUnwindSafe(invoke)) {
        Ok(future) => AssertUnwindSafe(future).catch_unwind().await,
        Err(payload) => Err(payload),
    };

    match outcome {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(SinglendError::from_handler_error(error)),
        Err(payload) => Err(SinglendError::from_panic(payload)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{Singlend, SinglendOptions};
    use axum::http::StatusCode;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn api(strict_schema: bool, route_calls: Arc<AtomicUsize>) -> Dispatcher {
        Singlend::with_options(SinglendOptions { strict_schema })
            .on(
                "getIcon",
                Schema::object(json!({})),
                |_q, r| async move { r.ok(json!({"iconUrl": "default.png"})) },
            )
            .group(
                Schema::object(json!({"id": {"type": "string"}})),
                |query, g| async move {
                    let id = query["id"].as_str().unwrap_or_default().to_string();
                    match id.strip_prefix('@') {
                        Some(rest) => g.next(rest.to_string()),
                        None => g.error(json!({"message": "Invalid id"})),
                    }
                },
                move |scope| {
                    scope.on(
                        "setIcon",
                        Schema::object(json!({"iconUrl": {"type": "string"}})),
                        move |query, id: String, r| {
                            route_calls.fetch_add(1, Ordering::SeqCst);
                            async move {
                                r.ok(json!({
                                    "message": format!("Set icon of {} to {}", id, query["iconUrl"].as_str().unwrap_or_default())
                                }))
                            }
                        },
                    )
                },
            )
            .into_dispatcher()
            .unwrap()
    }

    #[tokio::test]
    async fn test_plain_route() {
        let d = api(true, Arc::default());
        let reply = d.dispatch(br#"{"type":"getIcon","query":{}}"#).await.unwrap();
        assert_eq!(reply, Reply::ok(json!({"iconUrl": "default.png"})));
    }

    #[tokio::test]
    async fn test_group_passes_value_to_route() {
        let calls = Arc::new(AtomicUsize::new(0));
        let d = api(true, calls.clone());
        let reply = d
            .dispatch(br#"{"type":"setIcon","query":{"id":"@12345","iconUrl":"default.png"}}"#)
            .await
            .unwrap();
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.response, json!({"message": "Set icon of 12345 to default.png"}));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_group_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let d = api(true, calls.clone());
        let reply = d
            .dispatch(br#"{"type":"setIcon","query":{"id":"nope","iconUrl":"x"}}"#)
            .await
            .unwrap();
        assert_eq!(reply, Reply::error(json!({"message": "Invalid id"})));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_group_schema_failure() {
        let d = api(true, Arc::default());
        let err = d
            .dispatch(br#"{"type":"setIcon","query":{"iconUrl":"x"}}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, SinglendError::InvalidQuerySchema(_)));
    }

    #[tokio::test]
    async fn test_merged_schema_is_strict() {
        let calls = Arc::new(AtomicUsize::new(0));
        let d = api(true, calls.clone());
        let err = d
            .dispatch(br#"{"type":"setIcon","query":{"id":"@1","iconUrl":"x","extra":true}}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, SinglendError::InvalidQuerySchema(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let loose = api(false, Arc::default());
        assert!(loose
            .dispatch(br#"{"type":"setIcon","query":{"id":"@1","iconUrl":"x","extra":true}}"#)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_plain_route_strictness() {
        let strict = api(true, Arc::default());
        let err = strict
            .dispatch(br#"{"type":"getIcon","query":{"extra":1}}"#)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let loose = api(false, Arc::default());
        assert!(loose.dispatch(br#"{"type":"getIcon","query":{"extra":1}}"#).await.is_ok());
    }

    #[tokio::test]
    async fn test_mounted_entries_follow_parent_strictness() {
        let loose_sub = || {
            Singlend::with_options(SinglendOptions { strict_schema: false })
                .on("x", Schema::object(json!({"a": {"type": "string"}})), |_q, r| async move {
                    r.ok(json!(null))
                })
                .group(
                    Schema::object(json!({"id": {"type": "string"}})),
                    |_q, g| async move { g.next(()) },
                    |scope| {
                        scope.on("y", Schema::object(json!({"a": {"type": "string"}})), |_q, _v, r| async move {
                            r.ok(json!(null))
                        })
                    },
                )
        };
        let body_x = br#"{"type":"x","query":{"a":"1","extra":1}}"#;
        let body_y = br#"{"type":"y","query":{"id":"1","a":"1","extra":1}}"#;

        let strict = Singlend::new().mount([loose_sub()]).into_dispatcher().unwrap();
        assert!(strict.strict_schema());
        assert!(matches!(
            strict.dispatch(body_x).await.unwrap_err(),
            SinglendError::InvalidQuerySchema(_)
        ));
        assert!(matches!(
            strict.dispatch(body_y).await.unwrap_err(),
            SinglendError::InvalidQuerySchema(_)
        ));

        let loose = Singlend::with_options(SinglendOptions { strict_schema: false })
            .mount([Singlend::new().mount([loose_sub()])])
            .into_dispatcher()
            .unwrap();
        assert!(!loose.strict_schema());
        assert!(loose.dispatch(body_x).await.is_ok());
        assert!(loose.dispatch(body_y).await.is_ok());
    }

    #[tokio::test]
    async fn test_group_response_with_custom_status() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let d = Singlend::new()
            .group(
                Schema::any(),
                |_q, g| async move { g.response(json!({"message": "locked"}), StatusCode::FORBIDDEN) },
                move |scope| {
                    scope.on("inner", Schema::any(), move |_q, _v: (), r| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        async move { r.ok(json!(1)) }
                    })
                },
            )
            .into_dispatcher()
            .unwrap();

        let reply = d.dispatch(br#"{"type":"inner","query":{}}"#).await.unwrap();
        assert_eq!(reply.status, StatusCode::FORBIDDEN);
        assert_eq!(reply.response, json!({"message": "locked"}));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unknown_type() {
        let d = api(true, Arc::default());
        let err = d.dispatch(br#"{"type":"GetIcon","query":{}}"#).await.unwrap_err();
        assert!(matches!(err, SinglendError::NotFoundQueryType));
    }

    #[tokio::test]
    async fn test_handler_error_and_panic() {
        let d = Singlend::new()
            .on("fails", Schema::any(), |_q, _r| async move {
                Err::<Reply, _>(std::io::Error::other("disk on fire"))
            })
            .on("known", Schema::any(), |_q, _r| async move {
                Err::<Reply, _>(SinglendError::NotFoundQueryType)
            })
            .on("panics", Schema::any(), |_q, r| async move {
                if r.ok(json!(null)).status.is_success() {
                    panic!("handler exploded");
                }
                r.ok(json!(null))
            })
            .into_dispatcher()
            .unwrap();

        match d.dispatch(br#"{"type":"fails","query":null}"#).await.unwrap_err() {
            SinglendError::InternalServerError { message, .. } => assert_eq!(message, "disk on fire"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            d.dispatch(br#"{"type":"known","query":null}"#).await.unwrap_err(),
            SinglendError::NotFoundQueryType
        ));
        match d.dispatch(br#"{"type":"panics","query":null}"#).await.unwrap_err() {
            SinglendError::InternalServerError { message, .. } => assert_eq!(message, "Unknown error"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_group_handler_error() {
        let d = Singlend::new()
            .group(
                Schema::any(),
                |_q, _g: crate::dispatch::GroupRespond<()>| async move {
                    Err::<crate::dispatch::GroupReply<()>, _>("no session")
                },
                |scope| scope.on("inner", Schema::any(), |_q, _v, r| async move { r.ok(json!(1)) }),
            )
            .into_dispatcher()
            .unwrap();
        let err = d.dispatch(br#"{"type":"inner","query":{}}"#).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "no session");
    }

    #[test]
    fn test_invalid_schema_fails_at_freeze() {
        let result = Singlend::new()
            .on("bad", Schema::new(json!({"type": 12})), |_q, r| async move { r.ok(json!(null)) })
            .into_dispatcher();
        assert!(result.is_err());
    }

    #[test]
    fn test_non_object_group_keeps_route_schema() {
        let group = Schema::any();
        let route = Schema::object(json!({"a": {"type": "string"}}));
        assert_eq!(grouped_route_schema(&group, &route, true), route);
        let merged = grouped_route_schema(&Schema::object(json!({"b": {}})), &route, false);
        assert!(merged.definition()["properties"].get("b").is_some());
        assert!(merged.definition().get("additionalProperties").is_none());
    }
}
