//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::adapters::{http_client, HttpShareBackend, MediaServerCatalog};
use crate::config::Config;
use share_link_core::ports::{MediaCatalog, ShareBackend};
use share_link_core::BatchOrchestrator;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
/// Nothing in here is mutated by request handling.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub backend: Arc<dyn ShareBackend>,
    pub catalog: Arc<dyn MediaCatalog>,
    pub batch: BatchOrchestrator,
    /// Cancelled when the server shuts down; batches stop starting new children.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Wires the given ports together with the configured defaults.
    pub fn new(
        config: Arc<Config>,
        backend: Arc<dyn ShareBackend>,
        catalog: Arc<dyn MediaCatalog>,
    ) -> Self {
        let batch = BatchOrchestrator::new(
            backend.clone(),
            catalog.clone(),
            config.defaults,
            config.batch_concurrency,
        );
        Self {
            config,
            backend,
            catalog,
            batch,
            shutdown: CancellationToken::new(),
        }
    }

    /// Builds the HTTP adapters described by `config` and wires them up.
    pub fn from_config(config: Arc<Config>) -> Result<Self, reqwest::Error> {
        let client = http_client(config.http_timeout)?;
        let backend = Arc::new(HttpShareBackend::new(client.clone(), config.backend.clone()));
        let catalog = Arc::new(MediaServerCatalog::new(client, config.catalog.clone()));
        Ok(Self::new(config, backend, catalog))
    }
}
