//! Per-route proxy options.
//!
//! `ProxyOptions` is a plain value: every `with_*` call consumes the value
//! and returns the updated one, so a shared base can be cloned and
//! specialised without affecting other routes.

use axum::response::Response;
use std::future::Future;
use std::sync::Arc;

use crate::error::{BoxError, ConfigError, ProxyError};
use crate::proxy::context::ProxyContext;
use crate::proxy::hooks::{AfterReceive, BeforeSend, HandleFailure, Intercept};
use crate::proxy::message::{IncomingResponse, OutgoingRequest};
use crate::transport::{ClientRegistry, HttpTransport};

/// Hooks and transport settings for proxied requests.
#[derive(Debug, Clone)]
pub struct ProxyOptions {
    intercept: Option<Intercept>,
    before_send: Option<BeforeSend>,
    after_receive: Option<AfterReceive>,
    handle_failure: Option<HandleFailure>,
    http_client_name: Option<Arc<str>>,
    add_forwarded_headers: bool,
}

impl Default for ProxyOptions {
    fn default() -> Self {
        Self {
            intercept: None,
            before_send: None,
            after_receive: None,
            handle_failure: None,
            http_client_name: None,
            add_forwarded_headers: true,
        }
    }
}

impl ProxyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Short-circuit with the returned response, skipping upstream entirely.
    pub fn with_intercept<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut ProxyContext) -> Result<Option<Response>, BoxError> + Send + Sync + 'static,
    {
        self.intercept = Some(Intercept::new(f));
        self
    }

    pub fn with_intercept_async<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(&ProxyContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Response>, BoxError>> + Send + 'static,
    {
        self.intercept = Some(Intercept::from_async(f));
        self
    }

    /// Mutate the outgoing request right before it is sent.
    pub fn with_before_send<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut ProxyContext, &mut OutgoingRequest) -> Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.before_send = Some(BeforeSend::new(f));
        self
    }

    pub fn with_before_send_async<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(&ProxyContext, OutgoingRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<OutgoingRequest, BoxError>> + Send + 'static,
    {
        self.before_send = Some(BeforeSend::from_async(f));
        self
    }

    /// Mutate the upstream response before it is written to the caller.
    pub fn with_after_receive<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut ProxyContext, &mut IncomingResponse) -> Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.after_receive = Some(AfterReceive::new(f));
        self
    }

    pub fn with_after_receive_async<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(&ProxyContext, IncomingResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<IncomingResponse, BoxError>> + Send + 'static,
    {
        self.after_receive = Some(AfterReceive::from_async(f));
        self
    }

    /// Produce the response when resolution, a hook, or the transport fails.
    pub fn with_handle_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut ProxyContext, &ProxyError) -> Result<Response, BoxError> + Send + Sync + 'static,
    {
        self.handle_failure = Some(HandleFailure::new(f));
        self
    }

    pub fn with_handle_failure_async<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(&ProxyContext, ProxyError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, BoxError>> + Send + 'static,
    {
        self.handle_failure = Some(HandleFailure::from_async(f));
        self
    }

    /// Send through the named client instead of the default one.
    pub fn with_http_client_name(mut self, name: impl Into<String>) -> Self {
        self.http_client_name = Some(Arc::from(name.into()));
        self
    }

    pub fn with_should_add_forwarded_headers(mut self, add: bool) -> Self {
        self.add_forwarded_headers = add;
        self
    }

    pub fn intercept(&self) -> Option<&Intercept> {
        self.intercept.as_ref()
    }

    pub fn before_send(&self) -> Option<&BeforeSend> {
        self.before_send.as_ref()
    }

    pub fn after_receive(&self) -> Option<&AfterReceive> {
        self.after_receive.as_ref()
    }

    pub fn handle_failure(&self) -> Option<&HandleFailure> {
        self.handle_failure.as_ref()
    }

    pub fn http_client_name(&self) -> Option<&str> {
        self.http_client_name.as_deref()
    }

    pub fn should_add_forwarded_headers(&self) -> bool {
        self.add_forwarded_headers
    }
}

/// Options whose client name has been resolved against a registry.
#[derive(Debug, Clone)]
pub struct BoundOptions {
    options: ProxyOptions,
    transport: Arc<dyn HttpTransport>,
}

impl BoundOptions {
    pub(crate) fn bind(options: ProxyOptions, clients: &ClientRegistry) -> Result<Self, ConfigError> {
        let transport = clients.resolve(options.http_client_name())?;
        Ok(Self { options, transport })
    }

    pub fn options(&self) -> &ProxyOptions {
        &self.options
    }

    pub(crate) fn transport(&self) -> &Arc<dyn HttpTransport> {
        &self.transport
    }
}
