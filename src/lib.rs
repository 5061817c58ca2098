//! Route-driven HTTP forwarding proxy.
//!
//! Requests matching a registered path template are forwarded to an upstream
//! URI computed from the route parameters (and optionally the request), with
//! hooks to short-circuit, rewrite the outgoing request, rewrite the
//! response, or produce a custom failure response.
//!
//! ```text
//!   Client Request
//!   ──────────────▶ http::server ──▶ routing::ProxyRoutes ──▶ proxy::Proxy
//!                   (request id,      (template match,         (resolve, hooks,
//!                    tracing)          RouteParams)             transport)
//!                                                                   │
//!   Client Response                                                 ▼
//!   ◀────────────── proxy::writer ◀──────────────────── transport::ClientRegistry
//!                                                         (named reqwest clients)
//! ```

// Core subsystems
pub mod error;
pub mod proxy;
pub mod routing;
pub mod transport;

// Serving
pub mod config;
pub mod http;
pub mod net;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::ProxyConfig;
pub use error::{BoxError, ConfigError, ProxyError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use proxy::{
    BoundOptions, IncomingResponse, OutgoingRequest, Proxy, ProxyContext, ProxyOptions,
    UriResolver,
};
pub use routing::{ProxyRoutes, RouteParams};
pub use transport::{ClientRegistry, HttpTransport, ReqwestTransport};
