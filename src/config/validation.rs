//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference existing clients)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check that route templates compile and agree with each other
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{ClientConfig, ProxyConfig};
use crate::routing::{PathTemplate, UpstreamTemplate};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// One problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `routes[2].client`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("`{}` is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_request_body_bytes == Some(0) {
        errors.push(ValidationError::new(
            "listener.max_request_body_bytes",
            "must be greater than 0",
        ));
    }

    let observability = &config.observability;
    if !LOG_LEVELS.contains(&observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level `{}`", observability.log_level),
        ));
    }
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("`{}` is not a socket address", observability.metrics_address),
        ));
    }

    check_client("default_client", &config.default_client, &mut errors);

    let mut names = HashSet::new();
    for (i, client) in config.clients.iter().enumerate() {
        let field = format!("clients[{i}]");
        check_client(&field, client, &mut errors);
        if client.name.is_empty() {
            errors.push(ValidationError::new(format!("{field}.name"), "must not be empty"));
        } else if !names.insert(client.name.as_str()) {
            errors.push(ValidationError::new(
                format!("{field}.name"),
                format!("duplicate client `{}`", client.name),
            ));
        }
    }

    let mut route_names = HashSet::new();
    for (i, route) in config.routes.iter().enumerate() {
        let field = format!("routes[{i}]");

        if !route.name.is_empty() && !route_names.insert(route.name.as_str()) {
            errors.push(ValidationError::new(
                format!("{field}.name"),
                format!("duplicate route `{}`", route.name),
            ));
        }

        let path = PathTemplate::parse(&route.path);
        if let Err(e) = &path {
            errors.push(ValidationError::new(format!("{field}.path"), e.to_string()));
        }
        match UpstreamTemplate::parse(&route.upstream) {
            Ok(upstream) => {
                if let Ok(path) = &path {
                    let captures: HashSet<_> = path.captures().collect();
                    for name in upstream.placeholders() {
                        if !captures.contains(name) {
                            errors.push(ValidationError::new(
                                format!("{field}.upstream"),
                                format!("placeholder `{name}` is not captured by the path"),
                            ));
                        }
                    }
                }
            }
            Err(e) => {
                errors.push(ValidationError::new(format!("{field}.upstream"), e.to_string()))
            }
        }

        if let Some(client) = &route.client {
            if !names.contains(client.as_str()) {
                errors.push(ValidationError::new(
                    format!("{field}.client"),
                    format!("unknown client `{client}`"),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_client(field: &str, client: &ClientConfig, errors: &mut Vec<ValidationError>) {
    if client.timeout_ms == 0 {
        errors.push(ValidationError::new(
            format!("{field}.timeout_ms"),
            "must be greater than 0",
        ));
    }
    if client.connect_timeout_ms == Some(0) {
        errors.push(ValidationError::new(
            format!("{field}.connect_timeout_ms"),
            "must be greater than 0",
        ));
    }
}
