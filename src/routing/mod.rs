//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (at startup):
//!     Singlend::on / group / mount
//!     → route.rs (Entry::Route | Entry::Group, append-only)
//!     → Registry (frozen inside a Dispatcher)
//!
//! Lookup (per request):
//!     type string
//!     → resolver.rs (first match, one group level deep)
//!     → ResolvedTarget::Route | ResolvedTarget::Grouped | None
//! ```
//!
//! # Design Decisions
//! - Registry is immutable once frozen (shared without locks)
//! - Exact, case-sensitive `type` matching
//! - Deterministic: the same `type` always resolves to the same target
//! - First match wins; duplicates are silently shadowed

pub mod builder;
pub mod resolver;
pub mod route;

pub use builder::{GroupScope, IntoGroupResult, IntoHandlerResult, Singlend, SinglendOptions};
pub use resolver::{resolve, ResolvedTarget};
pub use route::{
    Carried, Entry, Group, GroupHandler, GroupOutcome, GroupedHandler, HandlerResult, PlainHandler,
    Registry, Route,
};
