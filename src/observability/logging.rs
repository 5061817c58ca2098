//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Pick pretty or JSON output from configuration
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level when set
//! - JSON format for production, pretty format for development

use tracing::Subscriber;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::{LogFormat, ObservabilityConfig};

/// Install the global subscriber. A second call is a no-op.
pub fn init(config: &ObservabilityConfig) {
    if subscriber(config).try_init().is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

fn subscriber(config: &ObservabilityConfig) -> Box<dyn Subscriber + Send + Sync> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.log_level)));

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => Box::new(registry.with(tracing_subscriber::fmt::layer().json())),
        LogFormat::Pretty => Box::new(registry.with(tracing_subscriber::fmt::layer())),
    }
}

fn default_directives(level: &str) -> String {
    format!("route_proxy={level},tower_http={level}")
}
