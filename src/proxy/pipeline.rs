//! Proxy orchestrator.
//!
//! # Responsibilities
//! - Sequence resolution, hooks, and the transport call for one request
//! - Build the outgoing request from the inbound one
//! - Contain every failure and turn it into exactly one response
//! - Record per-request logs and metrics
//!
//! # Design Decisions
//! - Each stage owns its values; nothing is shared across requests but
//!   the read-only client registry and options
//! - Forwarding headers are added before `BeforeSend`, so the hook wins
//! - Dropping the returned future cancels the upstream call

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, StatusCode, Uri};
use axum::response::Response;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

use crate::error::{ConfigError, ProxyError};
use crate::http::headers::{append_forwarded, strip_hop_by_hop, ForwardedFor};
use crate::http::request::{request_id_or_new, X_REQUEST_ID};
use crate::net::{AddressProvider, ConnectInfoProvider};
use crate::observability::metrics;
use crate::proxy::context::ProxyContext;
use crate::proxy::message::OutgoingRequest;
use crate::proxy::options::{BoundOptions, ProxyOptions};
use crate::proxy::resolver::{IntoUpstreamUri, Resolve};
use crate::proxy::writer::{self, Terminal};
use crate::routing::RouteParams;
use crate::transport::ClientRegistry;

/// Where a request is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Resolving,
    Intercepting,
    Sending,
    Receiving,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Resolving => "resolving",
            Stage::Intercepting => "intercepting",
            Stage::Sending => "sending",
            Stage::Receiving => "receiving",
        };
        f.write_str(name)
    }
}

/// How the upstream URI is obtained for one request.
pub(crate) enum Target<'a> {
    /// A route's resolver, run against the context.
    Resolver(&'a Resolve),
    /// A URI the caller already produced.
    Direct(Result<Uri, crate::error::BoxError>),
}

/// The forwarding engine. Cheap to clone; clones share the client registry.
#[derive(Debug, Clone)]
pub struct Proxy {
    inner: Arc<Inner>,
}

#[derive(Debug, Clone)]
struct Inner {
    clients: ClientRegistry,
    addresses: Arc<dyn AddressProvider>,
}

impl Proxy {
    pub fn new(clients: ClientRegistry) -> Self {
        Self {
            inner: Arc::new(Inner {
                clients,
                addresses: Arc::new(ConnectInfoProvider),
            }),
        }
    }

    /// Replace where connection metadata comes from.
    pub fn with_address_provider(mut self, provider: impl AddressProvider + 'static) -> Self {
        Arc::make_mut(&mut self.inner).addresses = Arc::new(provider);
        self
    }

    pub fn clients(&self) -> &ClientRegistry {
        &self.inner.clients
    }

    /// Resolve the options' client name now, so it cannot fail per request.
    pub fn bind(&self, options: ProxyOptions) -> Result<BoundOptions, ConfigError> {
        BoundOptions::bind(options, &self.inner.clients)
    }

    /// Proxy `request` to `upstream` from inside any handler.
    pub async fn forward(
        &self,
        request: Request<Body>,
        upstream: impl IntoUpstreamUri,
        options: &BoundOptions,
    ) -> Response {
        let target = Target::Direct(upstream.into_upstream_uri());
        self.execute(request, target, RouteParams::new(), options.clone(), None)
            .await
    }

    pub(crate) async fn execute(
        &self,
        request: Request<Body>,
        target: Target<'_>,
        params: RouteParams,
        options: BoundOptions,
        route: Option<Arc<str>>,
    ) -> Response {
        let started = Instant::now();
        let (parts, body) = request.into_parts();
        let connection = self.inner.addresses.connection_info(&parts);
        let request_id = request_id_or_new(&parts);

        let mut ctx = ProxyContext::new(parts, body, request_id, connection, params, options);
        if let Some(route) = route {
            ctx = ctx.with_route(route);
        }

        let span = tracing::info_span!(
            "proxy",
            request_id = %ctx.request_id(),
            method = %ctx.method(),
            path = %ctx.uri().path(),
            route = ctx.route().unwrap_or("-")
        );

        async move {
            let mut stage = Stage::Resolving;
            let terminal = match drive(&mut ctx, target, &mut stage).await {
                Ok(terminal) => terminal,
                Err(error) => Terminal::Failed(recover(&mut ctx, stage, error).await),
            };

            let outcome = terminal.outcome();
            let response = writer::write(terminal);

            metrics::record_request(
                ctx.method().as_str(),
                response.status().as_u16(),
                outcome,
                started,
            );
            tracing::info!(
                status = response.status().as_u16(),
                outcome,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Request completed"
            );
            response
        }
        .instrument(span)
        .await
    }
}

async fn drive(
    ctx: &mut ProxyContext,
    target: Target<'_>,
    stage: &mut Stage,
) -> Result<Terminal, ProxyError> {
    let bound = ctx.options().clone();
    let options = bound.options();

    let upstream = match target {
        Target::Resolver(resolve) => resolve.call(ctx).await?,
        Target::Direct(result) => result.map_err(ProxyError::RouteResolution)?,
    };
    tracing::debug!(upstream = %upstream, "Resolved upstream");

    *stage = Stage::Intercepting;
    if let Some(intercept) = options.intercept() {
        if let Some(response) = intercept.call(ctx).await? {
            tracing::debug!("Request intercepted");
            return Ok(Terminal::Intercepted(response));
        }
    }

    *stage = Stage::Sending;
    let mut outgoing = build_outgoing(ctx, upstream, options.should_add_forwarded_headers());
    if let Some(before_send) = options.before_send() {
        outgoing = before_send.call(ctx, outgoing).await?;
    }

    let target_uri = outgoing.uri.clone();
    let incoming = bound.transport().send(outgoing).await.map_err(|e| {
        metrics::record_upstream_error(e.kind);
        e
    })?;
    tracing::debug!(upstream = %target_uri, status = incoming.status.as_u16(), "Upstream responded");

    *stage = Stage::Receiving;
    let incoming = match options.after_receive() {
        Some(after_receive) => after_receive.call(ctx, incoming).await?,
        None => incoming,
    };

    Ok(Terminal::Forwarded(incoming))
}

/// Copy the inbound request onto `upstream`, minus what must not travel.
fn build_outgoing(ctx: &mut ProxyContext, upstream: Uri, add_forwarded: bool) -> OutgoingRequest {
    let mut headers = ctx.headers().clone();
    strip_hop_by_hop(&mut headers);
    // The transport derives Host from the upstream URI.
    headers.remove(header::HOST);

    if let Ok(value) = HeaderValue::from_str(ctx.request_id()) {
        headers.insert(X_REQUEST_ID, value);
    }

    if add_forwarded {
        append_forwarded(
            &mut headers,
            ForwardedFor {
                client: ctx.remote_addr().map(|addr| addr.ip()),
                proto: ctx.scheme(),
                host: ctx.host(),
            },
        );
    }

    let mut outgoing =
        OutgoingRequest::new(ctx.method().clone(), upstream).with_body(ctx.take_body());
    outgoing.headers = headers;
    outgoing
}

async fn recover(ctx: &mut ProxyContext, stage: Stage, error: ProxyError) -> Response {
    let handler = ctx.options().options().handle_failure().cloned();

    match handler {
        Some(handler) => {
            tracing::warn!(
                stage = %stage,
                kind = error.kind(),
                error = %error,
                "Proxy request failed, running failure handler"
            );
            match handler.call(ctx, error).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!(error = %e, "Failure handler failed");
                    writer::failure_response(StatusCode::INTERNAL_SERVER_ERROR)
                }
            }
        }
        None => {
            tracing::error!(
                stage = %stage,
                kind = error.kind(),
                error = %error,
                "Proxy request failed"
            );
            writer::failure_response(error.status_code())
        }
    }
}
