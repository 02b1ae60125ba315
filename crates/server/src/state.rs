//! Application state shared across handlers.

use crate::metrics::MetricsObserver;
use depot_core::config::AppConfig;
use depot_core::{OrganizationTable, TokenSigner};
use depot_registry::Registry;
use depot_storage::Sink;
use std::sync::Arc;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// The registry engine over the configured sink.
    pub registry: Registry,
    /// Hostname to organization mapping.
    pub organizations: Arc<OrganizationTable>,
    /// Login token signer.
    pub signer: Arc<TokenSigner>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Fails when the configuration is invalid. Logs warnings for default
    /// credentials.
    pub fn new(config: AppConfig, sink: Arc<dyn Sink>) -> depot_core::Result<Self> {
        config.validate().map_err(depot_core::Error::Config)?;
        let organizations = config.organization_table()?;

        if config.auth.uses_default_key() {
            tracing::warn!(
                "Server is running with the default login key. Set auth.key to a custom value"
            );
        }
        if config.auth.uses_default_secret() {
            tracing::warn!(
                "Server is running with the default token secret. Set auth.secret to a custom value"
            );
        }

        let mut registry = Registry::new(sink)
            .with_limits(config.limits.clone())
            .with_max_concurrent_writes(config.server.max_concurrent_writes);
        if config.server.metrics_enabled {
            registry = registry.with_observer(Arc::new(MetricsObserver));
        }

        Ok(Self {
            signer: Arc::new(TokenSigner::new(&config.auth.secret)),
            organizations: Arc::new(organizations),
            config: Arc::new(config),
            registry,
        })
    }

    /// The sink behind the registry.
    pub fn sink(&self) -> &Arc<dyn Sink> {
        self.registry.sink()
    }
}
