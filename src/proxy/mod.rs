//! Forwarding pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! inbound request + route params
//!     → resolver.rs (params / context → upstream Uri)
//!     → hooks.rs Intercept ──── response? ──────────────┐
//!     → pipeline.rs build outgoing (headers, forwarded)  │
//!     → hooks.rs BeforeSend                              │
//!     → transport (named or default client)              │
//!     → hooks.rs AfterReceive                            │
//!     → writer.rs ◀──────────────────────────────────────┘
//!
//! any failure along the way
//!     → hooks.rs HandleFailure, or the default status (502 / 500)
//!     → writer.rs
//! ```
//!
//! # Design Decisions
//! - Exactly one response is written per request
//! - Upstream 4xx/5xx are responses, not failures
//! - Hook shapes (sync or async) are normalized once, at registration
//! - Unknown client names fail at bind time, never per request

pub mod context;
pub mod hooks;
pub mod message;
pub mod options;
pub mod pipeline;
pub mod resolver;
pub(crate) mod writer;

pub use context::ProxyContext;
pub use hooks::{AfterReceive, BeforeSend, HandleFailure, Intercept};
pub use message::{IncomingResponse, OutgoingRequest};
pub use options::{BoundOptions, ProxyOptions};
pub use pipeline::Proxy;
pub use resolver::{parse_upstream, IntoUpstreamUri, UriResolver};
