//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher / server produce:
//!     → logging.rs (structured log events, request-id spans)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows into every dispatch span
//! - Metrics are cheap (atomic increments) and recorded even when no
//!   exporter is installed
//! - Metric labels are bounded (status, failure kind), never the `type`

pub mod logging;
pub mod metrics;
