//! Response writer.
//!
//! # Responsibilities
//! - Turn the single terminal outcome of a request into the client response
//! - Copy upstream status and headers, minus hop-by-hop headers
//! - Hand the upstream body through as a stream, never buffering it
//!
//! # Design Decisions
//! - `write` consumes the terminal value, so a second write is unrepresentable

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::Response;

use crate::http::headers::strip_hop_by_hop;
use crate::proxy::message::IncomingResponse;

/// How a request ended. Exactly one is produced per request.
#[derive(Debug)]
pub(crate) enum Terminal {
    /// The intercept hook answered; upstream was never contacted.
    Intercepted(Response),
    /// Upstream answered (possibly rewritten by the after-receive hook).
    Forwarded(IncomingResponse),
    /// A stage failed; this is the failure hook's or the default response.
    Failed(Response),
}

impl Terminal {
    pub(crate) fn outcome(&self) -> &'static str {
        match self {
            Terminal::Intercepted(_) => "intercepted",
            Terminal::Forwarded(_) => "forwarded",
            Terminal::Failed(_) => "failed",
        }
    }
}

pub(crate) fn write(terminal: Terminal) -> Response {
    match terminal {
        Terminal::Intercepted(response) | Terminal::Failed(response) => response,
        Terminal::Forwarded(incoming) => {
            let (status, mut headers, body) = incoming.into_parts();
            strip_hop_by_hop(&mut headers);

            let mut response = Response::new(body);
            *response.status_mut() = status;
            *response.headers_mut() = headers;
            response
        }
    }
}

/// Bare failure response with no body.
pub(crate) fn failure_response(status: StatusCode) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::{self, HeaderMap, HeaderValue};

    #[tokio::test]
    async fn forwarded_response_mirrors_upstream() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("x-upstream", HeaderValue::from_static("yes"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        let incoming = IncomingResponse::new(StatusCode::NOT_FOUND, headers, Body::from("{}"));

        let response = write(Terminal::Forwarded(incoming));

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["x-upstream"], "yes");
        assert!(!response.headers().contains_key(header::CONNECTION));
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"{}");
    }

    #[tokio::test]
    async fn failure_response_has_no_body() {
        let response = failure_response(StatusCode::BAD_GATEWAY);
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }
}
