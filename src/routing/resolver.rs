//! Route lookup by `type`.
//!
//! # Responsibilities
//! - Map a `type` string to a plain route or a (group, route) pair
//! - Return an explicit no-match
//!
//! # Design Decisions
//! - Exact, case-sensitive comparison
//! - Linear scan in registration order; first match wins, so later
//!   duplicates are shadowed
//! - A group is searched one level deep, only through its own routes

use super::route::{Entry, Group, GroupedHandler, PlainHandler, Registry, Route};

/// Where a `type` leads.
#[derive(Debug, Clone, Copy)]
pub enum ResolvedTarget<'a> {
    Route(&'a Route<PlainHandler>),
    Grouped(&'a Group, &'a Route<GroupedHandler>),
}

impl<'a> ResolvedTarget<'a> {
    pub fn type_name(&self) -> &'a str {
        match self {
            ResolvedTarget::Route(route) => route.type_name(),
            ResolvedTarget::Grouped(_, route) => route.type_name(),
        }
    }
}

/// Find the first entry answering to `type_name`.
pub fn resolve<'a>(registry: &'a Registry, type_name: &str) -> Option<ResolvedTarget<'a>> {
    registry.entries().iter().find_map(|entry| match entry {
        Entry::Route(route) if route.type_name == type_name => Some(ResolvedTarget::Route(route)),
        Entry::Route(_) => None,
        Entry::Group(group) => group
            .routes
            .iter()
            .find(|route| route.type_name == type_name)
            .map(|route| ResolvedTarget::Grouped(group, route)),
    })
}
