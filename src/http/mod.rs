//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, connect info, middleware)
//!     → request.rs (assign / propagate request ID)
//!     → routing (match template) → proxy pipeline
//!     → headers.rs (hop-by-hop stripping, forwarding headers)
//!     → Send to client
//! ```

pub mod headers;
pub mod request;
pub mod server;

pub use request::{MakeRequestUuid, RequestIdExt, X_REQUEST_ID};
pub use server::HttpServer;
