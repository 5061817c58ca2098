//! reqwest-backed upstream client.
//!
//! # Responsibilities
//! - Build a pooled client per `ClientConfig`
//! - Stream the outgoing body up and the response body back
//! - Enforce the response head deadline
//! - Classify failures (timeout, connect, body, request)

use async_trait::async_trait;
use axum::body::{Body, HttpBody};
use std::time::Duration;
use tokio::time;

use crate::config::ClientConfig;
use crate::error::{ConfigError, TransportError, TransportErrorKind};
use crate::proxy::message::{IncomingResponse, OutgoingRequest};
use crate::transport::HttpTransport;

/// A named upstream client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    name: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Build a client from configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .pool_idle_timeout(config.pool_idle_timeout_secs.map(Duration::from_secs));

        if let Some(ms) = config.connect_timeout_ms {
            builder = builder.connect_timeout(Duration::from_millis(ms));
        }
        if let Some(max) = config.pool_max_idle_per_host {
            builder = builder.pool_max_idle_per_host(max);
        }

        let client = builder.build().map_err(|source| ConfigError::Client {
            name: config.name.clone(),
            source,
        })?;

        Ok(Self {
            name: config.name.clone(),
            client,
            timeout: config.timeout(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: OutgoingRequest) -> Result<IncomingResponse, TransportError> {
        let (method, uri, headers, body) = request.into_parts();

        let mut builder = self
            .client
            .request(method, uri.to_string())
            .headers(headers);
        if body.size_hint().exact() != Some(0) {
            builder = builder.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        // The deadline covers the response head only; the body streams afterwards.
        let response = match time::timeout(self.timeout, builder.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(classify(e)),
            Err(elapsed) => {
                return Err(TransportError::new(TransportErrorKind::Timeout, elapsed));
            }
        };

        tracing::trace!(
            client = %self.name,
            upstream = %uri,
            status = %response.status(),
            "Upstream responded"
        );

        let status = response.status();
        let version = response.version();
        let headers = response.headers().clone();
        let body = Body::from_stream(response.bytes_stream());

        let mut incoming = IncomingResponse::new(status, headers, body);
        incoming.version = version;
        Ok(incoming)
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    let kind = if error.is_timeout() {
        TransportErrorKind::Timeout
    } else if error.is_connect() {
        TransportErrorKind::Connect
    } else if error.is_body() {
        TransportErrorKind::Body
    } else {
        TransportErrorKind::Request
    };
    TransportError::new(kind, error)
}
