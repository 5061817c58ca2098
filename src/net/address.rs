//! Connection metadata for proxied requests.
//!
//! # Responsibilities
//! - Capture remote and local socket addresses at accept time
//! - Expose them to the pipeline through a pluggable provider

use axum::extract::connect_info::{ConnectInfo, Connected};
use axum::http::request::Parts;
use axum::serve::IncomingStream;
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Addresses of the connection a request arrived on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Caller's address.
    pub remote_addr: Option<SocketAddr>,
    /// Address the proxy accepted the connection on.
    pub local_addr: Option<SocketAddr>,
}

impl ConnectionInfo {
    pub fn new(remote_addr: SocketAddr, local_addr: SocketAddr) -> Self {
        Self {
            remote_addr: Some(remote_addr),
            local_addr: Some(local_addr),
        }
    }
}

impl Connected<IncomingStream<'_, TcpListener>> for ConnectionInfo {
    fn connect_info(stream: IncomingStream<'_, TcpListener>) -> Self {
        Self {
            remote_addr: Some(*stream.remote_addr()),
            local_addr: stream.io().local_addr().ok(),
        }
    }
}

/// Source of connection metadata for a request.
pub trait AddressProvider: Send + Sync + std::fmt::Debug {
    fn connection_info(&self, parts: &Parts) -> ConnectionInfo;
}

/// Reads whatever connect info the server attached to the request.
///
/// Understands both `ConnectInfo<ConnectionInfo>` and the plain
/// `ConnectInfo<SocketAddr>` axum installs by default.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectInfoProvider;

impl AddressProvider for ConnectInfoProvider {
    fn connection_info(&self, parts: &Parts) -> ConnectionInfo {
        if let Some(ConnectInfo(info)) = parts.extensions.get::<ConnectInfo<ConnectionInfo>>() {
            return *info;
        }
        if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
            return ConnectionInfo {
                remote_addr: Some(*addr),
                local_addr: None,
            };
        }
        ConnectionInfo::default()
    }
}
