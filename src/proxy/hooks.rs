//! Hook chain contracts.
//!
//! # Responsibilities
//! - Accept sync and async hook shapes from callers
//! - Normalize every shape to one internal async signature at build time
//! - Turn hook errors and panics into pipeline errors
//!
//! # Design Decisions
//! - Sync hooks borrow the context mutably and mutate values in place
//! - Async hooks get `&ProxyContext` and must return a `'static` future, so
//!   anything they need from the context is cloned before the `async` block
//! - Values move through async hooks by ownership and come back as output

use axum::response::Response;
use futures_util::future::{self, BoxFuture, FutureExt};
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::{BoxError, HookStage, Panicked, ProxyError};
use crate::proxy::context::ProxyContext;
use crate::proxy::message::{IncomingResponse, OutgoingRequest};

pub(crate) type HookFuture<T> = BoxFuture<'static, Result<T, BoxError>>;

type InterceptFn = dyn Fn(&mut ProxyContext) -> HookFuture<Option<Response>> + Send + Sync;
type BeforeSendFn = dyn Fn(&mut ProxyContext, OutgoingRequest) -> HookFuture<OutgoingRequest> + Send + Sync;
type AfterReceiveFn =
    dyn Fn(&mut ProxyContext, IncomingResponse) -> HookFuture<IncomingResponse> + Send + Sync;
type HandleFailureFn = dyn Fn(&mut ProxyContext, ProxyError) -> HookFuture<Response> + Send + Sync;

/// Runs first; returning a response short-circuits the pipeline.
#[derive(Clone)]
pub struct Intercept(Arc<InterceptFn>);

impl Intercept {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut ProxyContext) -> Result<Option<Response>, BoxError> + Send + Sync + 'static,
    {
        Self(Arc::new(move |ctx: &mut ProxyContext| future::ready(f(ctx)).boxed()))
    }

    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(&ProxyContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Response>, BoxError>> + Send + 'static,
    {
        Self(Arc::new(move |ctx: &mut ProxyContext| f(&*ctx).boxed()))
    }

    pub(crate) async fn call(&self, ctx: &mut ProxyContext) -> Result<Option<Response>, ProxyError> {
        guard(|| (self.0)(ctx))
            .await
            .map_err(|source| hook_error(HookStage::Intercept, source))
    }
}

/// Final say over the outgoing request.
#[derive(Clone)]
pub struct BeforeSend(Arc<BeforeSendFn>);

impl BeforeSend {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut ProxyContext, &mut OutgoingRequest) -> Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    {
        Self(Arc::new(move |ctx: &mut ProxyContext, mut request: OutgoingRequest| {
            future::ready(f(ctx, &mut request).map(|()| request)).boxed()
        }))
    }

    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(&ProxyContext, OutgoingRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<OutgoingRequest, BoxError>> + Send + 'static,
    {
        Self(Arc::new(move |ctx: &mut ProxyContext, request: OutgoingRequest| {
            f(&*ctx, request).boxed()
        }))
    }

    pub(crate) async fn call(
        &self,
        ctx: &mut ProxyContext,
        request: OutgoingRequest,
    ) -> Result<OutgoingRequest, ProxyError> {
        guard(|| (self.0)(ctx, request))
            .await
            .map_err(|source| hook_error(HookStage::BeforeSend, source))
    }
}

/// Rewrites the upstream response before it is written.
#[derive(Clone)]
pub struct AfterReceive(Arc<AfterReceiveFn>);

impl AfterReceive {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut ProxyContext, &mut IncomingResponse) -> Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    {
        Self(Arc::new(move |ctx: &mut ProxyContext, mut response: IncomingResponse| {
            future::ready(f(ctx, &mut response).map(|()| response)).boxed()
        }))
    }

    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(&ProxyContext, IncomingResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<IncomingResponse, BoxError>> + Send + 'static,
    {
        Self(Arc::new(move |ctx: &mut ProxyContext, response: IncomingResponse| {
            f(&*ctx, response).boxed()
        }))
    }

    pub(crate) async fn call(
        &self,
        ctx: &mut ProxyContext,
        response: IncomingResponse,
    ) -> Result<IncomingResponse, ProxyError> {
        guard(|| (self.0)(ctx, response))
            .await
            .map_err(|source| hook_error(HookStage::AfterReceive, source))
    }
}

/// Produces the response when any earlier stage failed.
#[derive(Clone)]
pub struct HandleFailure(Arc<HandleFailureFn>);

impl HandleFailure {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut ProxyContext, &ProxyError) -> Result<Response, BoxError> + Send + Sync + 'static,
    {
        Self(Arc::new(move |ctx: &mut ProxyContext, error: ProxyError| {
            future::ready(f(ctx, &error)).boxed()
        }))
    }

    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(&ProxyContext, ProxyError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, BoxError>> + Send + 'static,
    {
        Self(Arc::new(move |ctx: &mut ProxyContext, error: ProxyError| {
            f(&*ctx, error).boxed()
        }))
    }

    /// Errors here are terminal for the request; the caller writes a bare 500.
    pub(crate) async fn call(
        &self,
        ctx: &mut ProxyContext,
        error: ProxyError,
    ) -> Result<Response, BoxError> {
        guard(|| (self.0)(ctx, error)).await
    }
}

macro_rules! opaque_debug {
    ($($hook:ident),*) => {
        $(impl fmt::Debug for $hook {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(concat!(stringify!($hook), "(..)"))
            }
        })*
    };
}

opaque_debug!(Intercept, BeforeSend, AfterReceive, HandleFailure);

fn hook_error(stage: HookStage, source: BoxError) -> ProxyError {
    ProxyError::HookExecution { stage, source }
}

/// Invoke a user callback, catching panics from both the call itself and
/// the future it returns.
pub(crate) async fn guard<T, F>(invoke: F) -> Result<T, BoxError>
where
    F: FnOnce() -> HookFuture<T>,
{
    let future = panic::catch_unwind(AssertUnwindSafe(invoke)).map_err(panic_error)?;
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(panic_error(payload)),
    }
}

fn panic_error(payload: Box<dyn Any + Send>) -> BoxError {
    let message = if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    };
    Box::new(Panicked(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn guard_passes_values_through() {
        let value = guard(|| future::ready(Ok::<_, BoxError>(7)).boxed()).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn guard_catches_sync_panic() {
        let err = guard::<(), _>(|| panic!("divide by zero")).await.unwrap_err();
        assert_eq!(err.to_string(), "panicked: divide by zero");
    }

    #[tokio::test]
    async fn guard_catches_async_panic() {
        let err = guard::<(), _>(|| {
            async {
                let denominator = "0".parse::<i32>().unwrap();
                if denominator == 0 {
                    panic!("attempt to divide by {}", denominator);
                }
                Ok::<(), BoxError>(())
            }
            .boxed()
        })
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "panicked: attempt to divide by 0");
    }
}
