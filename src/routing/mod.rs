//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (ordered scan of registered routes)
//!     → template.rs (match path template, capture parameters)
//!     → Return: route + RouteParams, or 404
//!
//! Route Registration (at startup):
//!     template + resolver + options
//!     → Compile path template
//!     → Bind options to their client
//!     → Freeze as immutable route table
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (segment comparison only)
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by registration)

pub mod router;
pub mod template;

pub use router::ProxyRoutes;
pub use template::{PathTemplate, RouteParams, UpstreamTemplate};
