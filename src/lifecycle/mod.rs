//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Init logging/metrics → Build routes → Listen
//!
//! Shutdown (shutdown.rs):
//!     SIGTERM/SIGINT → broadcast → Stop accepting → Drain requests → Exit
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready)
//! - In-flight requests finish before the server returns

pub mod shutdown;

pub use shutdown::Shutdown;
