//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,

    /// Transport used when a route names no client.
    pub default_client: ClientConfig,

    /// Named transports selectable per route.
    pub clients: Vec<ClientConfig>,

    /// Proxy routes declared in configuration.
    pub routes: Vec<RouteConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum inbound request body size; `None` leaves bodies unbounded.
    pub max_request_body_bytes: Option<usize>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_request_body_bytes: None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Outbound HTTP client settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Name routes use to select this client. Ignored for `default_client`.
    pub name: String,

    /// Total time allowed to obtain the upstream response head, in milliseconds.
    pub timeout_ms: u64,

    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,

    /// How long idle pooled connections are kept, in seconds.
    pub pool_idle_timeout_secs: Option<u64>,

    /// Maximum idle pooled connections per upstream host.
    pub pool_max_idle_per_host: Option<usize>,

    /// Skip upstream certificate verification.
    pub accept_invalid_certs: bool,
}

impl ClientConfig {
    /// A client config with the given name and default settings.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            timeout_ms: 100_000,
            connect_timeout_ms: None,
            pool_idle_timeout_secs: Some(90),
            pool_max_idle_per_host: None,
            accept_invalid_certs: false,
        }
    }
}

/// A proxy route declared in configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging.
    #[serde(default)]
    pub name: String,

    /// Path template, e.g. `/api/posts/{postId}` or `/files/{**rest}`.
    pub path: String,

    /// Upstream URI template filled from the path captures,
    /// e.g. `https://jsonplaceholder.typicode.com/posts/{postId}`.
    pub upstream: String,

    /// Named client to send with; the default client when absent.
    #[serde(default)]
    pub client: Option<String>,

    /// Inject X-Forwarded-* / Forwarded headers.
    #[serde(default = "default_forwarded_headers")]
    pub forwarded_headers: bool,
}

fn default_forwarded_headers() -> bool {
    true
}

impl RouteConfig {
    pub fn new(path: impl Into<String>, upstream: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            path: path.into(),
            upstream: upstream.into(),
            client: None,
            forwarded_headers: true,
        }
    }
}
