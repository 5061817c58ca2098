//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the client registry and proxy routes from configuration
//! - Wire up middleware (tracing, request ID, body limit)
//! - Bind server to listener with connection metadata
//! - Stop gracefully when the shutdown broadcast fires

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::error::ConfigError;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::net::ConnectionInfo;
use crate::proxy::Proxy;
use crate::routing::ProxyRoutes;
use crate::transport::ClientRegistry;

/// HTTP server for the reverse proxy.
#[derive(Debug)]
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a server serving the routes declared in `config`.
    pub fn new(config: ProxyConfig) -> Result<Self, ConfigError> {
        let clients = ClientRegistry::from_config(&config.default_client, &config.clients)?;
        let routes = ProxyRoutes::from_config(Proxy::new(clients), &config.routes)?;

        tracing::info!(
            routes = routes.len(),
            clients = config.clients.len(),
            "Proxy routes loaded"
        );

        Ok(Self::with_router(config, routes.into_router()))
    }

    /// Serve an application router (for example one built with
    /// `ProxyRoutes`) behind the standard middleware stack.
    pub fn with_router(config: ProxyConfig, router: Router) -> Self {
        let router = Self::build_router(&config, router);
        Self { router, config }
    }

    /// Wrap the application router in all middleware layers.
    fn build_router(config: &ProxyConfig, router: Router) -> Router {
        let router = match config.listener.max_request_body_bytes {
            Some(limit) => router.layer(RequestBodyLimitLayer::new(limit)),
            None => router,
        };

        router
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<ConnectionInfo>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The router with all layers applied.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}
