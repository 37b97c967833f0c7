//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatch code produces:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (try/query counters, latency histograms)
//!
//! Consumers:
//!     → Log output (stderr, stdout, file; console or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every log line of a dispatch call
//! - Metrics are cheap (atomic increments) and recorded even with no exporter

pub mod logging;
pub mod metrics;
