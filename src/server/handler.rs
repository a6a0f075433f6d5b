//! Gateway lifecycle handlers
//!
//! `GatewayHandler` is the callback contract an ingestion gateway drives.
//! `LifecycleHandlers` implements it on top of the camera stream registry.

use std::future::Future;
use std::sync::Arc;

use crate::registry::{CameraStreamRegistry, ReleaseOutcome, StreamPath};
use crate::session::{ConnectionHandle, ConnectionTable};

/// Callbacks for Gateway lifecycle notifications
///
/// Events for one connection arrive in order; events for different
/// connections may run concurrently. Every method has a permissive default.
pub trait GatewayHandler: Send + Sync + 'static {
    /// Called when a connection is opened. Return false to refuse it.
    fn on_connection_opened(
        &self,
        _connection: &ConnectionHandle,
    ) -> impl Future<Output = bool> + Send {
        async { true }
    }

    /// Called when a connection asks to publish. Return false to deny.
    fn on_publish_requested(
        &self,
        _connection: &ConnectionHandle,
        _stream_path: &str,
    ) -> impl Future<Output = bool> + Send {
        async { true }
    }

    /// Called when a publish ends
    fn on_publish_ended(
        &self,
        _connection: &ConnectionHandle,
        _stream_path: &str,
    ) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Called when a connection closes
    fn on_connection_closed(
        &self,
        _connection: &ConnectionHandle,
    ) -> impl Future<Output = ()> + Send {
        async {}
    }
}

/// Registry-backed lifecycle handlers
pub struct LifecycleHandlers {
    registry: Arc<CameraStreamRegistry>,
    connections: Arc<ConnectionTable>,
}

impl LifecycleHandlers {
    pub fn new(registry: Arc<CameraStreamRegistry>, connections: Arc<ConnectionTable>) -> Self {
        Self {
            registry,
            connections,
        }
    }

    /// Get the registry these handlers drive
    pub fn registry(&self) -> &Arc<CameraStreamRegistry> {
        &self.registry
    }

    /// Get the connection table
    pub fn connections(&self) -> &Arc<ConnectionTable> {
        &self.connections
    }

    async fn release_for(&self, connection: &ConnectionHandle, camera_id: &str) {
        match self.registry.release_owned(camera_id, connection).await {
            ReleaseOutcome::Released(_) | ReleaseOutcome::NotFound => {
                self.connections.stop_publishing(connection, camera_id).await;
            }
            // Registry already logged the mismatch
            ReleaseOutcome::NotOwner { .. } => {}
        }
    }
}

impl GatewayHandler for LifecycleHandlers {
    async fn on_connection_opened(&self, connection: &ConnectionHandle) -> bool {
        tracing::info!(connection = %connection, "Connection opened");
        self.connections.open(connection).await;
        true
    }

    async fn on_publish_requested(
        &self,
        connection: &ConnectionHandle,
        stream_path: &str,
    ) -> bool {
        let path = match StreamPath::parse(stream_path) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(connection = %connection, error = %e, "Publish denied");
                return false;
            }
        };
        tracing::info!(connection = %connection, path = %path, "Publish requested");

        // Track the connection before admitting so the sweep never sees an
        // admitted session whose connection is missing from the table
        self.connections.open(connection).await;

        let admitted = self.registry.admit(&path.camera_id, stream_path, connection.clone()).await;
        match admitted {
            Ok(_) => {
                self.connections.start_publishing(connection, &path.camera_id).await;
                true
            }
            Err(e) => {
                tracing::warn!(
                    connection = %connection,
                    camera_id = %path.camera_id,
                    error = %e,
                    "Publish denied"
                );
                false
            }
        }
    }

    async fn on_publish_ended(&self, connection: &ConnectionHandle, stream_path: &str) {
        match StreamPath::parse(stream_path) {
            Ok(path) => {
                tracing::info!(connection = %connection, path = %path, "Publish ended");
                self.release_for(connection, &path.camera_id).await;
            }
            Err(e) => {
                tracing::warn!(connection = %connection, error = %e, "Publish end ignored");
            }
        }
    }

    async fn on_connection_closed(&self, connection: &ConnectionHandle) {
        let Some(state) = self.connections.close(connection).await else {
            tracing::debug!(connection = %connection, "Close for unknown connection");
            return;
        };

        if state.cameras.is_empty() {
            tracing::info!(connection = %connection, "Connection closed");
            return;
        }

        for camera_id in &state.cameras {
            tracing::warn!(
                connection = %connection,
                camera_id = %camera_id,
                "Connection closed while publishing"
            );
            self.release_for(connection, camera_id).await;
        }
    }
}
