//! Mutable request/response values exchanged with upstream.
//!
//! Both values move through the pipeline by ownership: one stage holds them
//! at a time, and hooks receive them exclusively for mutation.

use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderValue};
use axum::http::{Method, StatusCode, Uri, Version};

/// The request about to be sent upstream.
#[derive(Debug)]
pub struct OutgoingRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    body: Body,
}

impl OutgoingRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Body::empty(),
        }
    }

    pub(crate) fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Replace the body; the old `Content-Length` no longer applies.
    pub fn set_body(&mut self, body: impl Into<Body>) {
        self.headers.remove(header::CONTENT_LENGTH);
        self.body = body.into();
    }

    pub fn into_parts(self) -> (Method, Uri, HeaderMap, Body) {
        (self.method, self.uri, self.headers, self.body)
    }
}

/// The response obtained from upstream (any status, including 4xx/5xx).
#[derive(Debug)]
pub struct IncomingResponse {
    pub status: StatusCode,
    pub version: Version,
    pub headers: HeaderMap,
    body: Body,
}

impl IncomingResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Body) -> Self {
        Self {
            status,
            version: Version::HTTP_11,
            headers,
            body,
        }
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Replace the body; the upstream `Content-Length` no longer applies.
    pub fn set_body(&mut self, body: impl Into<Body>) {
        self.headers.remove(header::CONTENT_LENGTH);
        self.body = body.into();
    }

    /// Replace the body with UTF-8 text, resetting `Content-Type` to match.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.headers.remove(header::CONTENT_ENCODING);
        self.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        self.set_body(text.into());
    }

    pub fn into_parts(self) -> (StatusCode, HeaderMap, Body) {
        (self.status, self.headers, self.body)
    }
}
