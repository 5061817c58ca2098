//! Error taxonomy for the proxy.
//!
//! # Design Decisions
//! - Request-time failures (`ProxyError`) never escape the pipeline; they are
//!   handed to the failure hook or mapped to a default status.
//! - Configuration failures (`ConfigError`) surface at registration/startup,
//!   never while serving a request.

use axum::http::StatusCode;
use std::fmt;

use crate::config::validation::ValidationError;

/// Boxed error returned by user-supplied resolvers and hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Pipeline stage whose hook failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    Intercept,
    BeforeSend,
    AfterReceive,
    HandleFailure,
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HookStage::Intercept => "intercept",
            HookStage::BeforeSend => "before_send",
            HookStage::AfterReceive => "after_receive",
            HookStage::HandleFailure => "handle_failure",
        };
        f.write_str(name)
    }
}

/// A failure raised while serving one proxied request.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The resolver failed or produced something that is not an upstream URI.
    #[error("route resolution failed: {0}")]
    RouteResolution(#[source] BoxError),

    /// No response could be obtained from upstream.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A user hook returned an error or panicked.
    #[error("{stage} hook failed: {source}")]
    HookExecution {
        stage: HookStage,
        #[source]
        source: BoxError,
    },
}

impl ProxyError {
    /// Status written when no failure hook is configured.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Transport(_) => StatusCode::BAD_GATEWAY,
            ProxyError::RouteResolution(_) | ProxyError::HookExecution { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::RouteResolution(_) => "route_resolution",
            ProxyError::Transport(_) => "transport",
            ProxyError::HookExecution { .. } => "hook_execution",
        }
    }
}

/// Why the transport failed to produce a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    Body,
    Request,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::Body => "body",
            TransportErrorKind::Request => "request",
        };
        f.write_str(name)
    }
}

/// Upstream call failed before any response arrived.
#[derive(Debug, thiserror::Error)]
#[error("upstream {kind} error: {source}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    #[source]
    pub source: BoxError,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, source: impl Into<BoxError>) -> Self {
        Self {
            kind,
            source: source.into(),
        }
    }
}

/// A resolver or hook panicked; the payload message is preserved.
#[derive(Debug, thiserror::Error)]
#[error("panicked: {0}")]
pub struct Panicked(pub String);

/// An upstream URI that cannot be used.
#[derive(Debug, thiserror::Error)]
#[error("invalid upstream uri `{uri}`: {reason}")]
pub struct InvalidUpstream {
    pub uri: String,
    pub reason: String,
}

/// Startup-time misconfiguration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown http client `{0}`")]
    UnknownClient(String),

    #[error("http client `{0}` registered twice")]
    DuplicateClient(String),

    #[error("invalid path template `{template}`: {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("invalid upstream template `{template}`: {reason}")]
    InvalidUpstream { template: String, reason: String },

    #[error("failed to build http client `{name}`: {source}")]
    Client {
        name: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_statuses() {
        let transport = ProxyError::from(TransportError::new(
            TransportErrorKind::Timeout,
            "deadline elapsed",
        ));
        assert_eq!(transport.status_code(), StatusCode::BAD_GATEWAY);

        let hook = ProxyError::HookExecution {
            stage: HookStage::BeforeSend,
            source: "boom".into(),
        };
        assert_eq!(hook.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(hook.to_string(), "before_send hook failed: boom");

        let resolution = ProxyError::RouteResolution("nope".into());
        assert_eq!(resolution.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resolution.kind(), "route_resolution");
    }

    #[test]
    fn validation_error_lists_everything() {
        let err = ConfigError::Validation(vec![
            ValidationError::new("clients[0].name", "must not be empty"),
            ValidationError::new("routes[1].client", "unknown client `x`"),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: clients[0].name: must not be empty, routes[1].client: unknown client `x`"
        );
    }
}
