//! Named client registry.
//!
//! # Responsibilities
//! - Hold the default client and every named client
//! - Resolve a client name once, at bind time
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Unknown names are configuration errors, not request failures

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::error::ConfigError;
use crate::transport::{HttpTransport, ReqwestTransport};

/// The default transport plus named alternatives.
#[derive(Debug, Clone)]
pub struct ClientRegistry {
    default: Arc<dyn HttpTransport>,
    named: HashMap<String, Arc<dyn HttpTransport>>,
}

impl ClientRegistry {
    /// A registry whose default client is `transport`.
    pub fn new(transport: impl HttpTransport + 'static) -> Self {
        Self {
            default: Arc::new(transport),
            named: HashMap::new(),
        }
    }

    /// Build reqwest clients for the default and every named entry.
    pub fn from_config(
        default: &ClientConfig,
        clients: &[ClientConfig],
    ) -> Result<Self, ConfigError> {
        let mut registry = Self::new(ReqwestTransport::from_config(default)?);
        for config in clients {
            let transport = ReqwestTransport::from_config(config)?;
            registry = registry.with_client(config.name.clone(), transport)?;
        }
        Ok(registry)
    }

    /// Register a named client.
    pub fn with_client(
        mut self,
        name: impl Into<String>,
        transport: impl HttpTransport + 'static,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        if self.named.contains_key(&name) {
            return Err(ConfigError::DuplicateClient(name));
        }
        tracing::debug!(client = %name, "Registered http client");
        self.named.insert(name, Arc::new(transport));
        Ok(self)
    }

    /// The client for `name`, or the default client when `name` is `None`.
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<dyn HttpTransport>, ConfigError> {
        match name {
            None => Ok(Arc::clone(&self.default)),
            Some(name) => self
                .named
                .get(name)
                .cloned()
                .ok_or_else(|| ConfigError::UnknownClient(name.to_string())),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.named.contains_key(name)
    }
}
