//! Ingest service lifecycle
//!
//! Owns the registry for the lifetime of the service: built at start,
//! sweep task stopped at shutdown.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::registry::{CameraStreamRegistry, RegistryConfig};
use crate::server::dispatch::Dispatcher;
use crate::server::handler::LifecycleHandlers;
use crate::session::ConnectionTable;

/// Running ingest service
///
/// Must be started from within a tokio runtime.
pub struct IngestService {
    registry: Arc<CameraStreamRegistry>,
    handlers: Arc<LifecycleHandlers>,
    sweep_task: Option<JoinHandle<()>>,
}

impl IngestService {
    /// Build the registry and handlers and start the liveness sweep
    pub fn start(config: RegistryConfig) -> Self {
        let registry = Arc::new(CameraStreamRegistry::with_config(config));
        let connections = Arc::new(ConnectionTable::new());
        let handlers = Arc::new(LifecycleHandlers::new(
            Arc::clone(&registry),
            Arc::clone(&connections),
        ));

        let sweep_task = registry.spawn_sweep_task(connections);
        match registry.config().sweep_interval {
            Some(interval) => tracing::info!(
                sweep_interval_ms = interval.as_millis() as u64,
                "Ingest service started"
            ),
            None => tracing::info!("Ingest service started, liveness sweep disabled"),
        }

        Self {
            registry,
            handlers,
            sweep_task,
        }
    }

    /// Get the camera stream registry
    pub fn registry(&self) -> &Arc<CameraStreamRegistry> {
        &self.registry
    }

    /// Get the lifecycle handlers
    pub fn handlers(&self) -> &Arc<LifecycleHandlers> {
        &self.handlers
    }

    /// Create a dispatcher feeding the lifecycle handlers
    pub fn dispatcher(&self) -> Dispatcher<LifecycleHandlers> {
        Dispatcher::new(Arc::clone(&self.handlers))
    }

    /// Stop the service
    ///
    /// Sessions still admitted are discarded with the registry.
    pub async fn shutdown(mut self) {
        if let Some(task) = self.sweep_task.take() {
            task.abort();
        }
        let remaining = self.registry.session_count().await;
        tracing::info!(remaining_sessions = remaining, "Ingest service stopped");
    }
}

impl Drop for IngestService {
    fn drop(&mut self) {
        if let Some(task) = self.sweep_task.take() {
            task.abort();
        }
    }
}
