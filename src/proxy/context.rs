//! Per-request proxy state.
//!
//! A `ProxyContext` lives for exactly one request. The pipeline owns it and
//! lends it to resolvers and hooks one stage at a time.

use axum::body::Body;
use axum::http::request::Parts;
use axum::http::{header, Extensions, HeaderMap, Method, Uri, Version};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::net::ConnectionInfo;
use crate::proxy::options::BoundOptions;
use crate::routing::RouteParams;

/// Everything the pipeline knows about the request it is proxying.
#[derive(Debug)]
pub struct ProxyContext {
    request_id: String,
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    connection: ConnectionInfo,
    params: RouteParams,
    route: Option<Arc<str>>,
    options: BoundOptions,
    extensions: Extensions,
    body: Option<Body>,
}

impl ProxyContext {
    pub(crate) fn new(
        parts: Parts,
        body: Body,
        request_id: String,
        connection: ConnectionInfo,
        params: RouteParams,
        options: BoundOptions,
    ) -> Self {
        Self {
            request_id,
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            connection,
            params,
            route: None,
            options,
            extensions: parts.extensions,
            body: Some(body),
        }
    }

    pub(crate) fn with_route(mut self, route: Arc<str>) -> Self {
        self.route = Some(route);
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The inbound request URI (usually origin-form: path and query).
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn connection(&self) -> &ConnectionInfo {
        &self.connection
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.connection.remote_addr
    }

    pub fn params(&self) -> &RouteParams {
        &self.params
    }

    /// Template of the matched route, if the request came through the route table.
    pub fn route(&self) -> Option<&str> {
        self.route.as_deref()
    }

    pub fn options(&self) -> &BoundOptions {
        &self.options
    }

    /// Inbound request extensions; free for hooks to stash request-local data.
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Host the caller addressed: `Host` header, else the URI authority.
    pub fn host(&self) -> Option<&str> {
        self.headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .or_else(|| self.uri.authority().map(|authority| authority.as_str()))
    }

    /// Scheme the caller used.
    pub fn scheme(&self) -> &str {
        self.uri.scheme_str().unwrap_or("http")
    }

    /// Take the inbound body; the outgoing request gets it exactly once.
    pub(crate) fn take_body(&mut self) -> Body {
        self.body.take().unwrap_or_else(Body::empty)
    }
}
