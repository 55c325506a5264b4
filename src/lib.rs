//! Multiple operations on a single endpoint.
//!
//! A request body `{"type": "...", "query": ...}` is dispatched to the route
//! registered under that `type`, after validating `query` against the route's
//! JSON Schema. Routes may sit inside a group whose handler runs first and
//! either answers directly or forwards a value to the route.
//!
//! ```ignore
//! use serde_json::json;
//! use singlend::{Schema, Singlend};
//!
//! let api = Singlend::new()
//!     .group(
//!         Schema::object(json!({"id": {"type": "string"}})),
//!         |query, g| async move {
//!             match query["id"].as_str().and_then(|id| id.strip_prefix('@')) {
//!                 Some(id) => g.next(id.to_string()),
//!                 None => g.error(json!({"message": "Invalid id"})),
//!             }
//!         },
//!         |scope| {
//!             scope.on(
//!                 "setIcon",
//!                 Schema::object(json!({"iconUrl": {"type": "string"}})),
//!                 |query, id, r| async move {
//!                     r.ok(json!({"message": format!("Set icon of {id} to {}", query["iconUrl"])}))
//!                 },
//!             )
//!         },
//!     );
//!
//! let app = axum::Router::new()
//!     .route("/api/singlend", axum::routing::any(|| async { "next" }))
//!     .route_layer(axum::middleware::from_fn_with_state(
//!         api.middleware(Default::default())?,
//!         singlend::singlend_middleware,
//!     ));
//! ```

pub mod config;
pub mod dispatch;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod schema;

pub use dispatch::{BoxError, Dispatcher, GroupReply, GroupRespond, Reply, Respond, SinglendError};
pub use http::{singlend_middleware, HttpServer, MiddlewareOptions, SinglendState};
pub use lifecycle::Shutdown;
pub use routing::{GroupScope, Singlend, SinglendOptions};
pub use schema::Schema;
