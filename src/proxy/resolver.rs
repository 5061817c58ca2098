//! Upstream URI resolution.
//!
//! # Responsibilities
//! - Accept the four resolver shapes: params or context+params, sync or async
//! - Normalize them to one async signature when a route is registered
//! - Validate the produced URI (absolute, http/https, has a host)
//!
//! # Design Decisions
//! - Every shape is equivalent in effect; only the calling convention differs
//! - Resolution failures and panics become `ProxyError::RouteResolution`

use axum::http::Uri;
use futures_util::future::{self, FutureExt};
use std::future::Future;
use std::sync::Arc;
use url::Url;

use crate::error::{BoxError, InvalidUpstream, ProxyError};
use crate::proxy::context::ProxyContext;
use crate::proxy::hooks::{guard, HookFuture};
use crate::routing::{RouteParams, UpstreamTemplate};

/// Values a resolver may return.
pub trait IntoUpstreamUri {
    fn into_upstream_uri(self) -> Result<Uri, BoxError>;
}

impl IntoUpstreamUri for Uri {
    fn into_upstream_uri(self) -> Result<Uri, BoxError> {
        parse_upstream(&self.to_string()).map_err(Into::into)
    }
}

impl IntoUpstreamUri for Url {
    fn into_upstream_uri(self) -> Result<Uri, BoxError> {
        parse_upstream(self.as_str()).map_err(Into::into)
    }
}

impl IntoUpstreamUri for String {
    fn into_upstream_uri(self) -> Result<Uri, BoxError> {
        parse_upstream(&self).map_err(Into::into)
    }
}

impl IntoUpstreamUri for &str {
    fn into_upstream_uri(self) -> Result<Uri, BoxError> {
        parse_upstream(self).map_err(Into::into)
    }
}

impl<T, E> IntoUpstreamUri for Result<T, E>
where
    T: IntoUpstreamUri,
    E: Into<BoxError>,
{
    fn into_upstream_uri(self) -> Result<Uri, BoxError> {
        self.map_err(Into::into)?.into_upstream_uri()
    }
}

/// Parse and validate an absolute http(s) upstream URI.
pub fn parse_upstream(raw: &str) -> Result<Uri, InvalidUpstream> {
    let invalid = |reason: String| InvalidUpstream {
        uri: raw.to_string(),
        reason,
    };

    let mut url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(invalid(format!(
                "unsupported scheme `{other}`: only http and https are allowed"
            )))
        }
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    // Fragments are never sent upstream.
    url.set_fragment(None);

    Uri::try_from(url.as_str()).map_err(|e| invalid(e.to_string()))
}

type ParamsFn = dyn Fn(&RouteParams) -> Result<Uri, BoxError> + Send + Sync;
type ParamsAsyncFn = dyn Fn(&RouteParams) -> HookFuture<Uri> + Send + Sync;
type ContextFn = dyn Fn(&mut ProxyContext, &RouteParams) -> Result<Uri, BoxError> + Send + Sync;
type ContextAsyncFn = dyn Fn(&ProxyContext, &RouteParams) -> HookFuture<Uri> + Send + Sync;

/// A user-supplied way of turning route parameters into an upstream URI.
#[derive(Clone)]
pub enum UriResolver {
    /// `(params) -> uri`
    Params(Arc<ParamsFn>),
    /// `(params) -> async uri`
    ParamsAsync(Arc<ParamsAsyncFn>),
    /// `(context, params) -> uri`
    Context(Arc<ContextFn>),
    /// `(context, params) -> async uri`
    ContextAsync(Arc<ContextAsyncFn>),
}

impl UriResolver {
    pub fn from_params<F, U>(f: F) -> Self
    where
        F: Fn(&RouteParams) -> U + Send + Sync + 'static,
        U: IntoUpstreamUri,
    {
        Self::Params(Arc::new(move |params: &RouteParams| {
            f(params).into_upstream_uri()
        }))
    }

    pub fn from_params_async<F, Fut>(f: F) -> Self
    where
        F: Fn(&RouteParams) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoUpstreamUri,
    {
        Self::ParamsAsync(Arc::new(move |params: &RouteParams| {
            f(params).map(IntoUpstreamUri::into_upstream_uri).boxed()
        }))
    }

    pub fn from_context<F, U>(f: F) -> Self
    where
        F: Fn(&mut ProxyContext, &RouteParams) -> U + Send + Sync + 'static,
        U: IntoUpstreamUri,
    {
        Self::Context(Arc::new(
            move |ctx: &mut ProxyContext, params: &RouteParams| f(ctx, params).into_upstream_uri(),
        ))
    }

    pub fn from_context_async<F, Fut>(f: F) -> Self
    where
        F: Fn(&ProxyContext, &RouteParams) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoUpstreamUri,
    {
        Self::ContextAsync(Arc::new(move |ctx: &ProxyContext, params: &RouteParams| {
            f(ctx, params).map(IntoUpstreamUri::into_upstream_uri).boxed()
        }))
    }

    /// Always the same upstream.
    pub fn fixed(uri: Uri) -> Self {
        Self::from_params(move |_: &RouteParams| uri.clone())
    }

    /// Fill an upstream template from the route parameters.
    pub fn template(template: UpstreamTemplate) -> Self {
        Self::from_params(move |params: &RouteParams| template.render(params))
    }

    pub(crate) fn normalize(self) -> Resolve {
        let resolve: Arc<ResolveFn> = match self {
            UriResolver::Params(f) => Arc::new(move |_: &mut ProxyContext, params: &RouteParams| {
                future::ready(f(params)).boxed()
            }),
            UriResolver::ParamsAsync(f) => {
                Arc::new(move |_: &mut ProxyContext, params: &RouteParams| f(params))
            }
            UriResolver::Context(f) => Arc::new(move |ctx: &mut ProxyContext, params: &RouteParams| {
                future::ready(f(ctx, params)).boxed()
            }),
            UriResolver::ContextAsync(f) => {
                Arc::new(move |ctx: &mut ProxyContext, params: &RouteParams| f(&*ctx, params))
            }
        };
        Resolve(resolve)
    }
}

impl std::fmt::Debug for UriResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shape = match self {
            UriResolver::Params(_) => "Params",
            UriResolver::ParamsAsync(_) => "ParamsAsync",
            UriResolver::Context(_) => "Context",
            UriResolver::ContextAsync(_) => "ContextAsync",
        };
        write!(f, "UriResolver::{shape}(..)")
    }
}

type ResolveFn = dyn Fn(&mut ProxyContext, &RouteParams) -> HookFuture<Uri> + Send + Sync;

/// A resolver in its single internal form.
#[derive(Clone)]
pub(crate) struct Resolve(Arc<ResolveFn>);

impl std::fmt::Debug for Resolve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Resolve(..)")
    }
}

impl Resolve {
    pub(crate) async fn call(&self, ctx: &mut ProxyContext) -> Result<Uri, ProxyError> {
        let params = ctx.params().clone();
        guard(|| (self.0)(ctx, &params))
            .await
            .map_err(ProxyError::RouteResolution)
    }
}
