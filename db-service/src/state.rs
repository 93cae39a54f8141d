//! Application state.

use std::sync::Arc;

use common::config::AppConfig;
use common::errors::AppResult;

use crate::registry::ConnectionRegistry;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: AppConfig,
    /// Registry of saved configurations and live adapters.
    pub registry: Arc<ConnectionRegistry>,
}

impl AppState {
    /// Connects the registry to the configuration store and builds the state.
    pub async fn new(config: AppConfig) -> AppResult<Self> {
        let registry = Arc::new(ConnectionRegistry::connect(&config).await?);
        Ok(Self { config, registry })
    }
}
