//! Route table and axum integration.
//!
//! # Responsibilities
//! - Store compiled proxy routes in registration order
//! - Look up the matching route for a request path
//! - Dispatch matches into the pipeline, answer 404 otherwise
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) template scan (acceptable for typical route counts)
//! - First registered match wins
//! - Paths are matched after dot-segment removal
//! - Options are bound to a client at registration, so a bad client name
//!   fails here and never while serving

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::sync::Arc;
use std::time::Instant;

use crate::config::RouteConfig;
use crate::error::ConfigError;
use crate::observability::metrics;
use crate::proxy::options::{BoundOptions, ProxyOptions};
use crate::proxy::pipeline::{Proxy, Target};
use crate::proxy::resolver::{Resolve, UriResolver};
use crate::routing::template::{normalize_path, PathTemplate, RouteParams, UpstreamTemplate};

/// One registered proxy route.
#[derive(Debug)]
pub(crate) struct RouteBinding {
    name: Arc<str>,
    template: PathTemplate,
    resolve: Resolve,
    options: BoundOptions,
}

/// Ordered set of proxy routes sharing one `Proxy`.
#[derive(Debug)]
pub struct ProxyRoutes {
    proxy: Proxy,
    routes: Vec<RouteBinding>,
}

impl ProxyRoutes {
    pub fn new(proxy: Proxy) -> Self {
        Self {
            proxy,
            routes: Vec::new(),
        }
    }

    /// Build routes declared in configuration.
    pub fn from_config(proxy: Proxy, routes: &[RouteConfig]) -> Result<Self, ConfigError> {
        routes.iter().try_fold(Self::new(proxy), |table, route| {
            let mut options =
                ProxyOptions::new().with_should_add_forwarded_headers(route.forwarded_headers);
            if let Some(client) = &route.client {
                options = options.with_http_client_name(client.clone());
            }
            let resolver = UriResolver::template(UpstreamTemplate::parse(&route.upstream)?);
            let name = (!route.name.is_empty()).then(|| route.name.as_str());
            table.register(&route.path, name, resolver, options)
        })
    }

    /// Register a route with default options.
    pub fn route(self, template: &str, resolver: UriResolver) -> Result<Self, ConfigError> {
        self.register(template, None, resolver, ProxyOptions::default())
    }

    /// Register a route with its own hooks and client.
    pub fn route_with(
        self,
        template: &str,
        resolver: UriResolver,
        options: ProxyOptions,
    ) -> Result<Self, ConfigError> {
        self.register(template, None, resolver, options)
    }

    fn register(
        mut self,
        template: &str,
        name: Option<&str>,
        resolver: UriResolver,
        options: ProxyOptions,
    ) -> Result<Self, ConfigError> {
        let template = PathTemplate::parse(template)?;
        let options = self.proxy.bind(options)?;
        let name: Arc<str> = Arc::from(name.unwrap_or(template.as_str()));

        tracing::debug!(
            route = %name,
            template = %template,
            client = options.options().http_client_name().unwrap_or("default"),
            "Registered proxy route"
        );

        self.routes.push(RouteBinding {
            name,
            template,
            resolve: resolver.normalize(),
            options,
        });
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// The first route whose template matches `path`.
    pub(crate) fn find(&self, path: &str) -> Option<(&RouteBinding, RouteParams)> {
        let path = normalize_path(path);
        self.routes
            .iter()
            .find_map(|route| route.template.matches(&path).map(|params| (route, params)))
    }

    /// An axum router that proxies every method on every matched path.
    ///
    /// The table is installed as the fallback, so it composes with other
    /// routers via `merge` as long as they have no fallback of their own.
    pub fn into_router(self) -> Router {
        Router::new().fallback(dispatch).with_state(Arc::new(self))
    }
}

async fn dispatch(State(table): State<Arc<ProxyRoutes>>, request: Request<Body>) -> Response {
    let started = Instant::now();

    match table.find(request.uri().path()) {
        Some((route, params)) => {
            let options = route.options.clone();
            let name = route.name.clone();
            table
                .proxy
                .execute(request, Target::Resolver(&route.resolve), params, options, Some(name))
                .await
        }
        None => {
            tracing::debug!(
                method = %request.method(),
                path = %request.uri().path(),
                "No route matched"
            );
            metrics::record_request(request.method().as_str(), 404, "unmatched", started);
            (StatusCode::NOT_FOUND, "No matching route found").into_response()
        }
    }
}
