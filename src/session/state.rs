//! Connection state machine
//!
//! Tracks a Gateway connection from open to close, and which cameras it
//! publishes while it is publishing. One connection may publish several
//! streams at once.

use std::collections::BTreeSet;

use super::handle::ConnectionHandle;

/// Connection lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// Connection opened, nothing published
    Opened,
    /// Connection owns at least one admitted camera stream
    Publishing,
    /// Connection closed
    Closed,
}

/// Per-connection state
#[derive(Debug, Clone)]
pub struct ConnectionState {
    /// Gateway connection handle
    pub handle: ConnectionHandle,

    /// Current phase
    pub phase: ConnectionPhase,

    /// Cameras this connection currently publishes
    pub cameras: BTreeSet<String>,
}

impl ConnectionState {
    /// Create a new connection state
    pub fn new(handle: ConnectionHandle) -> Self {
        Self {
            handle,
            phase: ConnectionPhase::Opened,
            cameras: BTreeSet::new(),
        }
    }

    /// Record an admitted publish
    pub fn start_publishing(&mut self, camera_id: String) {
        if self.phase != ConnectionPhase::Closed {
            self.phase = ConnectionPhase::Publishing;
            self.cameras.insert(camera_id);
        }
    }

    /// Record the end of one camera's publish
    ///
    /// Other cameras published on the same connection are unaffected.
    pub fn stop_publishing(&mut self, camera_id: &str) {
        if self.phase == ConnectionPhase::Publishing {
            self.cameras.remove(camera_id);
            if self.cameras.is_empty() {
                self.phase = ConnectionPhase::Opened;
            }
        }
    }

    /// Close the connection
    pub fn close(&mut self) {
        self.phase = ConnectionPhase::Closed;
    }

    /// Check if the connection publishes `camera_id`
    pub fn publishes(&self, camera_id: &str) -> bool {
        self.cameras.contains(camera_id)
    }

    /// Check if the connection is publishing
    pub fn is_publishing(&self) -> bool {
        self.phase == ConnectionPhase::Publishing
    }

    /// Check if the connection is still open
    pub fn is_open(&self) -> bool {
        self.phase != ConnectionPhase::Closed
    }
}
