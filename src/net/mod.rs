//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → axum::serve with connect info (ConnectionInfo: remote + local address)
//!     → AddressProvider reads it back per request
//!     → ProxyContext.connection → forwarded headers
//! ```
//!
//! # Design Decisions
//! - Connection metadata comes from the hosting layer, never global state
//! - The address source is injectable so tests can fake client addresses

pub mod address;

pub use address::{AddressProvider, ConnectInfoProvider, ConnectionInfo};
