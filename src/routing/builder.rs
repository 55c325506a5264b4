//! Fluent registration API.
//!
//! # Responsibilities
//! - Register plain routes (`on`), groups (`group`) and sub-routers (`mount`)
//! - Type-erase user handlers into registry entries
//! - Freeze the finished registry into a dispatcher
//!
//! # Design Decisions
//! - Builders are consumed and returned by value, so each registry has one owner
//! - `group` hands its callback a fresh `GroupScope` sharing the strict setting;
//!   the scope is consumed when the callback returns
//! - Duplicate `type` strings are accepted; the resolver picks the first
//! - Strictness belongs to the builder that freezes the registry; mounted
//!   entries do not carry their own

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures_util::FutureExt;
use serde_json::Value;

use super::route::{Carried, Entry, Group, GroupOutcome, GroupedHandler, HandlerResult, Registry, Route};
use crate::dispatch::{BoxError, Dispatcher, GroupReply, GroupRespond, Reply, Respond, SinglendError};
use crate::http::middleware::{MiddlewareOptions, SinglendState};
use crate::schema::{Schema, SchemaError};

/// Anything a route handler may resolve to.
pub trait IntoHandlerResult {
    fn into_handler_result(self) -> HandlerResult;
}

impl IntoHandlerResult for Reply {
    fn into_handler_result(self) -> HandlerResult {
        Ok(self)
    }
}

impl<E: Into<BoxError>> IntoHandlerResult for Result<Reply, E> {
    fn into_handler_result(self) -> HandlerResult {
        self.map_err(Into::into)
    }
}

/// Anything a group handler may resolve to.
pub trait IntoGroupResult<V> {
    fn into_group_result(self) -> Result<GroupReply<V>, BoxError>;
}

impl<V> IntoGroupResult<V> for GroupReply<V> {
    fn into_group_result(self) -> Result<GroupReply<V>, BoxError> {
        Ok(self)
    }
}

impl<V, E: Into<BoxError>> IntoGroupResult<V> for Result<GroupReply<V>, E> {
    fn into_group_result(self) -> Result<GroupReply<V>, BoxError> {
        self.map_err(Into::into)
    }
}

/// Builder options.
#[derive(Debug, Clone, Copy)]
pub struct SinglendOptions {
    /// Reject undeclared keys in object-shaped query schemas.
    pub strict_schema: bool,
}

impl Default for SinglendOptions {
    fn default() -> Self {
        Self { strict_schema: true }
    }
}

/// Registry builder for one endpoint.
///
/// ```ignore
/// let api = Singlend::new()
///     .on("getIcon", Schema::object(json!({})), |_query, r| async move {
///         r.ok(json!({"iconUrl": "default.png"}))
///     });
/// ```
#[derive(Debug, Clone, Default)]
pub struct Singlend {
    options: SinglendOptions,
    registry: Registry,
}

impl Singlend {
    /// Create a builder in strict-schema mode.
    pub fn new() -> Self {
        Self::with_options(SinglendOptions::default())
    }

    pub fn with_options(options: SinglendOptions) -> Self {
        Self {
            options,
            registry: Registry::new(),
        }
    }

    pub fn strict_schema(&self) -> bool {
        self.options.strict_schema
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn into_registry(self) -> Registry {
        self.registry
    }

    /// Register a plain route answering to `type_name`.
    pub fn on<F, Fut>(mut self, type_name: impl Into<String>, schema: Schema, handler: F) -> Self
    where
        F: Fn(Value, Respond) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoHandlerResult,
    {
        let handler = Arc::new(move |query: Value, respond: Respond| {
            handler(query, respond)
                .map(IntoHandlerResult::into_handler_result)
                .boxed()
        });

        self.registry.push(Entry::Route(Route {
            type_name: type_name.into(),
            schema,
            handler,
        }));
        self
    }

    /// Register a group: `handler` runs before any route `children` registers
    /// and either answers directly or forwards a `V` to the route.
    pub fn group<V, G, GFut, C>(mut self, schema: Schema, handler: G, children: C) -> Self
    where
        V: Send + 'static,
        G: Fn(Value, GroupRespond<V>) -> GFut + Send + Sync + 'static,
        GFut: Future + Send + 'static,
        GFut::Output: IntoGroupResult<V>,
        C: FnOnce(GroupScope<V>) -> GroupScope<V>,
    {
        let scope = children(GroupScope::new(self.options.strict_schema));

        let handler = Arc::new(move |query: Value| {
            handler(query, GroupRespond::new())
                .map(|output| {
                    output.into_group_result().map(|reply| match reply {
                        GroupReply::Next(value) => GroupOutcome::Next(Box::new(value) as Carried),
                        GroupReply::Reply(reply) => GroupOutcome::Reply(reply),
                    })
                })
                .boxed()
        });

        self.registry.push(Entry::Group(Group {
            routes: scope.routes,
            schema,
            handler,
        }));
        self
    }

    /// Append every entry of `others`, in order.
    pub fn mount(mut self, others: impl IntoIterator<Item = Singlend>) -> Self {
        for other in others {
            self.registry.append(other.registry);
        }
        self
    }

    /// Freeze the registry into a dispatcher. Strictness is this builder's
    /// setting, whichever builder registered a mounted entry.
    pub fn into_dispatcher(self) -> Result<Dispatcher, SchemaError> {
        Dispatcher::new(self.registry, self.options.strict_schema)
    }

    /// Freeze the registry into middleware state for the host router.
    pub fn middleware(self, options: MiddlewareOptions) -> Result<SinglendState, SchemaError> {
        let dispatcher = self
            .into_dispatcher()?
            .with_max_body_bytes(options.max_body_bytes);
        Ok(SinglendState::new(dispatcher, options.methods))
    }
}

/// Builder handed to a `group` callback. Routes registered here receive the
/// value the group forwards.
pub struct GroupScope<V> {
    strict_schema: bool,
    routes: Vec<Route<GroupedHandler>>,
    _value: PhantomData<fn() -> V>,
}

impl<V: Send + 'static> GroupScope<V> {
    fn new(strict_schema: bool) -> Self {
        Self {
            strict_schema,
            routes: Vec::new(),
            _value: PhantomData,
        }
    }

    pub fn strict_schema(&self) -> bool {
        self.strict_schema
    }

    /// Register a route that runs after the group handler called `next`.
    pub fn on<F, Fut>(mut self, type_name: impl Into<String>, schema: Schema, handler: F) -> Self
    where
        F: Fn(Value, V, Respond) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoHandlerResult,
    {
        let handler = Arc::new(move |query: Value, value: Carried, respond: Respond| {
            match value.downcast::<V>() {
                Ok(value) => handler(query, *value, respond)
                    .map(IntoHandlerResult::into_handler_result)
                    .boxed(),
                Err(_) => {
                    let error: BoxError =
                        Box::new(SinglendError::internal("group value has an unexpected type"));
                    futures_util::future::ready(Err(error)).boxed()
                }
            }
        });

        self.routes.push(Route {
            type_name: type_name.into(),
            schema,
            handler,
        });
        self
    }
}
