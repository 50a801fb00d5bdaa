//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher and normalizer produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through the adapter's trace span
//! - Without an installed recorder, metric calls are no-ops

pub mod logging;
pub mod metrics;
