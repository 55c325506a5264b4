//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Request body bytes
//!     → envelope.rs (parse {type, query})
//!     → routing::resolve (route | group + route | not found)
//!     → [group handler: next(value) | early reply]
//!     → schema validation (effective schema per target)
//!     → route handler (query [, value], respond)
//!     → reply.rs (status + JSON body) or error.rs (SinglendError)
//! ```
//!
//! # Design Decisions
//! - One linear protocol per request; no shared mutable state
//! - Every failure is a `SinglendError` value, never a thrown exception
//! - Handler panics are caught at the dispatcher boundary

pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod reply;

pub use dispatcher::{Dispatcher, DEFAULT_MAX_BODY_BYTES};
pub use envelope::Envelope;
pub use error::{BoxError, SinglendError};
pub use reply::{GroupReply, GroupRespond, Reply, Respond};
