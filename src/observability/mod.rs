//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline and server produce:
//!     → logging.rs (structured log events, `proxy` span per request)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through every log line of a request
//! - Metrics are cheap (no-op until a recorder is installed)

pub mod logging;
pub mod metrics;
