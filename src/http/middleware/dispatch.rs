//! Dispatch middleware.
//! Intercepts allowed methods on the mounted path; everything else passes through.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};

use crate::dispatch::{Dispatcher, DEFAULT_MAX_BODY_BYTES};

/// Options applied where the middleware is attached.
#[derive(Debug, Clone)]
pub struct MiddlewareOptions {
    /// Methods the middleware intercepts.
    pub methods: Vec<Method>,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
}

impl Default for MiddlewareOptions {
    fn default() -> Self {
        Self {
            methods: vec![Method::POST],
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// State required by [`singlend_middleware`].
#[derive(Debug, Clone)]
pub struct SinglendState {
    dispatcher: Dispatcher,
    methods: Arc<[Method]>,
}

impl SinglendState {
    pub fn new(dispatcher: Dispatcher, methods: Vec<Method>) -> Self {
        Self {
            dispatcher,
            methods: methods.into(),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Returns true if requests with `method` are dispatched.
    pub fn intercepts(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }
}

/// Attach with `axum::middleware::from_fn_with_state(state, singlend_middleware)`.
pub async fn singlend_middleware(
    State(state): State<SinglendState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.intercepts(request.method()) {
        tracing::trace!(method = %request.method(), "Method not intercepted, passing through");
        return next.run(request).await;
    }

    state.dispatcher.handle(request).await
}
