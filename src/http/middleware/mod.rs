//! Middleware attaching a dispatcher to an axum router.

pub mod dispatch;

pub use dispatch::{singlend_middleware, MiddlewareOptions, SinglendState};
