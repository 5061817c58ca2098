//! Shared utilities for integration testing.

#![allow(dead_code)]

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::request::Parts;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use rand::Rng;
use serde_json::{json, Map, Value};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use route_proxy::net::{AddressProvider, ConnectionInfo};
use route_proxy::{HttpServer, ProxyConfig, Shutdown};

/// A mock upstream on a loopback port.
///
/// - `/slow` answers after 500ms
/// - `/status/{code}` answers with that status and body `status {code}`
/// - anything else echoes the request back as JSON
pub struct Upstream {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl Upstream {
    pub async fn start() -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/slow", get(slow))
            .route("/status/{code}", any(status))
            .fallback(echo)
            .with_state(hits.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, hits }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Number of requests the upstream has received.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn echo(State(hits): State<Arc<AtomicUsize>>, request: Request<Body>) -> Json<Value> {
    hits.fetch_add(1, Ordering::SeqCst);
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();

    let headers: Map<String, Value> = parts
        .headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                Value::String(value.to_str().unwrap_or_default().to_string()),
            )
        })
        .collect();

    Json(json!({
        "method": parts.method.as_str(),
        "path": parts.uri.path(),
        "query": parts.uri.query(),
        "headers": headers,
        "body": String::from_utf8_lossy(&body),
    }))
}

async fn slow(State(hits): State<Arc<AtomicUsize>>) -> &'static str {
    hits.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(500)).await;
    "finally"
}

async fn status(State(hits): State<Arc<AtomicUsize>>, Path(code): Path<u16>) -> Response {
    hits.fetch_add(1, Ordering::SeqCst);
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, format!("status {code}")).into_response()
}

/// A running proxy; dropping it stops the server.
pub struct TestProxy {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Serve `router` behind the standard middleware on a loopback port.
pub async fn spawn_proxy(router: Router) -> TestProxy {
    spawn_server(HttpServer::with_router(ProxyConfig::default(), router)).await
}

pub async fn spawn_server(server: HttpServer) -> TestProxy {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();

    tokio::spawn(async move {
        server.run(listener, signal).await.unwrap();
    });

    TestProxy { addr, shutdown }
}

/// An address nothing is listening on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub async fn json_body(response: reqwest::Response) -> Value {
    let text = response.text().await.unwrap();
    serde_json::from_str(&text).unwrap()
}

/// Reports the same caller address for every request.
#[derive(Debug, Clone, Copy)]
pub struct FixedAddress(pub SocketAddr);

impl AddressProvider for FixedAddress {
    fn connection_info(&self, _parts: &Parts) -> ConnectionInfo {
        ConnectionInfo {
            remote_addr: Some(self.0),
            local_addr: None,
        }
    }
}

/// Reports a random public-looking IPv4 caller for every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomAddresses;

impl AddressProvider for RandomAddresses {
    fn connection_info(&self, _parts: &Parts) -> ConnectionInfo {
        let mut rng = rand::thread_rng();
        let ip = Ipv4Addr::new(
            rng.gen_range(11..=99),
            rng.gen(),
            rng.gen(),
            rng.gen_range(1..=254),
        );
        ConnectionInfo {
            remote_addr: Some(SocketAddr::new(IpAddr::V4(ip), rng.gen_range(1024..=65535))),
            local_addr: None,
        }
    }
}
