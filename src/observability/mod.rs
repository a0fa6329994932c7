//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Entry point and lifecycle produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!     → tracing.rs (request spans with correlation IDs)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Metrics endpoint (Prometheus scrape, when METRICS_ADDRESS is set)
//! ```
//!
//! # Design Decisions
//! - Request ID flows from the request-id layer into every span
//! - Secret material is never a log field

pub mod logging;
pub mod metrics;
pub mod tracing;
