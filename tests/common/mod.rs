//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use singlend::config::ServerConfig;
use singlend::{HttpServer, Schema, Singlend, SinglendError, SinglendOptions};

pub const PATH: &str = "/api/singlend";

/// Profile API used across the integration suites.
///
/// `route_calls` counts invocations of `setIcon`.
pub fn profile_api(strict_schema: bool, route_calls: Arc<AtomicUsize>) -> Singlend {
    let icons = Singlend::with_options(SinglendOptions { strict_schema }).on(
        "getIcon",
        Schema::object(json!({})),
        |_query, r| async move { r.ok(json!({ "iconUrl": "default.png" })) },
    );

    Singlend::with_options(SinglendOptions { strict_schema })
        .group(
            Schema::object(json!({ "id": { "type": "string" } })),
            |query, g| async move {
                match query["id"].as_str().and_then(|id| id.strip_prefix('@')) {
                    Some(id) => g.next(id.to_string()),
                    None => g.error(json!({ "message": "Invalid id" })),
                }
            },
            move |scope| {
                scope.on(
                    "setIcon",
                    Schema::object(json!({ "iconUrl": { "type": "string" } })),
                    move |query, id: String, r| {
                        route_calls.fetch_add(1, Ordering::SeqCst);
                        async move {
                            let icon = query["iconUrl"].as_str().unwrap_or_default();
                            r.ok(json!({ "message": format!("Set icon of {id} to {icon}") }))
                        }
                    },
                )
            },
        )
        .on(
            "setBackgroundColor",
            Schema::object(json!({
                "backgroundColor": { "type": "string", "minLength": 7, "maxLength": 7 }
            })),
            |query, r| async move {
                let color = query["backgroundColor"].as_str().unwrap_or_default();
                if !color.starts_with('#') {
                    return r.error(json!({ "message": "Invalid background color" }));
                }
                r.ok(json!({ "message": format!("Set background color to {color}") }))
            },
        )
        .on("fail", Schema::any(), |_query, _r| async move {
            Err::<singlend::Reply, _>(std::io::Error::other("disk full"))
        })
        .on("failKnown", Schema::any(), |_query, _r| async move {
            Err::<singlend::Reply, _>(SinglendError::NotFoundQueryType)
        })
        .on("explode", Schema::any(), |query, r| async move {
            if query.is_object() {
                panic!("handler exploded");
            }
            r.ok(json!({}))
        })
        .mount([icons])
}

/// Router built exactly as the server binary builds it.
pub fn router(strict_schema: bool) -> Router {
    router_with_calls(strict_schema, Arc::new(AtomicUsize::new(0)))
}

pub fn router_with_calls(strict_schema: bool, route_calls: Arc<AtomicUsize>) -> Router {
    let mut config = ServerConfig::default();
    config.endpoint.strict_schema = strict_schema;
    HttpServer::new(config, profile_api(strict_schema, route_calls))
        .expect("profile api freezes")
        .router()
}

/// Send a raw body to the endpoint and return the status and body text.
pub async fn send_raw(router: &Router, method: Method, body: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method(method)
        .uri(PATH)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

/// POST a `{type, query}` envelope and parse the JSON reply.
pub async fn send(router: &Router, type_name: &str, query: Value) -> (StatusCode, Value) {
    let body = json!({ "type": type_name, "query": query }).to_string();
    let (status, text) = send_raw(router, Method::POST, &body).await;
    let value = serde_json::from_str(&text)
        .unwrap_or_else(|_| panic!("expected JSON reply, got {text:?}"));
    (status, value)
}
