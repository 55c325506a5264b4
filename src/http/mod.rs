//! HTTP binding subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layers: request ID, trace, limits, timeout)
//!     → middleware (method allow-list)
//!         ├─ intercepted → dispatch::Dispatcher → JSON reply
//!         └─ otherwise  → next handler
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod server;

pub use middleware::{singlend_middleware, MiddlewareOptions, SinglendState};
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{HttpServer, ServerError};
