//! Registry entries.
//!
//! # Responsibilities
//! - Represent a plain route, a grouped route and a group
//! - Hold the ordered, append-only list of entries
//!
//! # Design Decisions
//! - Handlers are type-erased once at registration into `Arc<dyn Fn>`
//! - A group holds grouped routes only, so nesting is capped at one level
//! - The value a group forwards travels as `Box<dyn Any>` and is downcast by
//!   the grouped handler that was registered with the same `V`

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::dispatch::{BoxError, Reply, Respond};
use crate::schema::Schema;

/// Value forwarded from a group handler to its inner route.
pub type Carried = Box<dyn Any + Send>;

pub type HandlerResult = Result<Reply, BoxError>;

/// Outcome of a group handler after type erasure.
pub enum GroupOutcome {
    Next(Carried),
    Reply(Reply),
}

/// Route handler reached without a group: `(query, respond)`.
pub type PlainHandler = Arc<dyn Fn(Value, Respond) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Route handler reached through a group: `(query, value, respond)`.
pub type GroupedHandler =
    Arc<dyn Fn(Value, Carried, Respond) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Group pre-handler: `(query) -> next(value) | reply`.
pub type GroupHandler =
    Arc<dyn Fn(Value) -> BoxFuture<'static, Result<GroupOutcome, BoxError>> + Send + Sync>;

/// A leaf operation.
#[derive(Clone)]
pub struct Route<H> {
    pub(crate) type_name: String,
    pub(crate) schema: Schema,
    pub(crate) handler: H,
}

impl<H> Route<H> {
    /// The dispatch key.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }
}

impl<H> fmt::Debug for Route<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("type_name", &self.type_name)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// A pre-handling stage wrapping one level of routes.
#[derive(Clone)]
pub struct Group {
    pub(crate) routes: Vec<Route<GroupedHandler>>,
    pub(crate) schema: Schema,
    pub(crate) handler: GroupHandler,
}

impl Group {
    pub fn routes(&self) -> &[Route<GroupedHandler>] {
        &self.routes
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn handler(&self) -> &GroupHandler {
        &self.handler
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("routes", &self.routes)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// One slot of a registry.
#[derive(Debug, Clone)]
pub enum Entry {
    Route(Route<PlainHandler>),
    Group(Group),
}

/// Ordered list of routes and groups. Append-only.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Vec<Entry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    pub(crate) fn append(&mut self, other: Registry) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every route `type`, in registration order, including group children.
    /// Shadowed duplicates are listed again.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().flat_map(|entry| -> Box<dyn Iterator<Item = &str> + '_> {
            match entry {
                Entry::Route(route) => Box::new(std::iter::once(route.type_name())),
                Entry::Group(group) => Box::new(group.routes.iter().map(|r| r.type_name())),
            }
        })
    }
}
