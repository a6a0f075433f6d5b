//! Table of open Gateway connections

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;

use super::handle::ConnectionHandle;
use super::state::ConnectionState;
use crate::registry::LivenessProbe;

/// Open connections keyed by handle
///
/// Entries are removed on close, so the table doubles as the live
/// connection set for the registry's liveness sweep.
#[derive(Default)]
pub struct ConnectionTable {
    connections: RwLock<HashMap<ConnectionHandle, ConnectionState>>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an opened connection
    pub async fn open(&self, handle: &ConnectionHandle) {
        self.connections
            .write()
            .await
            .entry(handle.clone())
            .or_insert_with(|| ConnectionState::new(handle.clone()));
    }

    /// Record an admitted publish
    pub async fn start_publishing(&self, handle: &ConnectionHandle, camera_id: &str) {
        let mut connections = self.connections.write().await;
        connections
            .entry(handle.clone())
            .or_insert_with(|| ConnectionState::new(handle.clone()))
            .start_publishing(camera_id.to_string());
    }

    /// Record the end of one camera's publish
    pub async fn stop_publishing(&self, handle: &ConnectionHandle, camera_id: &str) {
        if let Some(state) = self.connections.write().await.get_mut(handle) {
            state.stop_publishing(camera_id);
        }
    }

    /// Remove a connection, returning its final state
    pub async fn close(&self, handle: &ConnectionHandle) -> Option<ConnectionState> {
        let mut state = self.connections.write().await.remove(handle)?;
        state.close();
        Some(state)
    }

    /// Get a connection's state
    pub async fn get(&self, handle: &ConnectionHandle) -> Option<ConnectionState> {
        self.connections.read().await.get(handle).cloned()
    }

    /// Handles of every open connection
    pub async fn live_handles(&self) -> HashSet<ConnectionHandle> {
        self.connections.read().await.keys().cloned().collect()
    }

    /// Number of open connections
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}

impl LivenessProbe for ConnectionTable {
    async fn live_connections(&self) -> HashSet<ConnectionHandle> {
        self.live_handles().await
    }
}
