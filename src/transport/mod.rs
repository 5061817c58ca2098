//! Transport dispatcher subsystem.
//!
//! # Data Flow
//! ```text
//! OutgoingRequest (after BeforeSend)
//!     → registry.rs (named or default client, resolved at bind time)
//!     → client.rs (reqwest call, response head deadline)
//!     → IncomingResponse (any status) | TransportError (no response)
//! ```
//!
//! # Design Decisions
//! - Clients are process-wide and immutable after startup; shared read-only
//! - Connection pooling is the client's own concern
//! - 4xx/5xx are valid responses, only "no response at all" is an error
//! - Redirects are never followed; the caller sees the upstream's 3xx

pub mod client;
pub mod registry;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::proxy::message::{IncomingResponse, OutgoingRequest};

pub use client::ReqwestTransport;
pub use registry::ClientRegistry;

/// Something that can carry a request upstream and bring back a response.
#[async_trait]
pub trait HttpTransport: Send + Sync + std::fmt::Debug {
    async fn send(&self, request: OutgoingRequest) -> Result<IncomingResponse, TransportError>;
}
