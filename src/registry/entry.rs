//! Session record and state types
//!
//! This module defines the per-camera state stored in the registry.

use std::time::{Duration, Instant};

use crate::session::ConnectionHandle;

/// State of a camera stream session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Publish accepted and still open
    Admitted,
    /// Publish ended; the session is no longer in the registry
    Closed,
}

/// One admitted publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraStreamSession {
    /// Registry-assigned session ID, unique per admission
    pub session_id: u64,

    /// Camera identifier extracted from the stream path
    pub camera_id: String,

    /// Full path as presented by the publishing client
    pub stream_path: String,

    /// Gateway connection that owns the publish (correlation only)
    pub connection: ConnectionHandle,

    /// When the session was admitted
    pub started_at: Instant,

    /// Current state
    pub state: SessionState,
}

impl CameraStreamSession {
    pub(super) fn admitted(
        session_id: u64,
        camera_id: String,
        stream_path: String,
        connection: ConnectionHandle,
    ) -> Self {
        Self {
            session_id,
            camera_id,
            stream_path,
            connection,
            started_at: Instant::now(),
            state: SessionState::Admitted,
        }
    }

    /// Time since admission
    pub fn age(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Handle identifying this session
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            session_id: self.session_id,
            camera_id: self.camera_id.clone(),
            connection: self.connection.clone(),
        }
    }

    /// Consume the record and mark it closed
    pub(super) fn close(mut self) -> Self {
        self.state = SessionState::Closed;
        self
    }
}

/// Handle returned by a successful admission
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionHandle {
    /// Registry-assigned session ID
    pub session_id: u64,
    /// Camera the session streams for
    pub camera_id: String,
    /// Owning Gateway connection
    pub connection: ConnectionHandle,
}

/// Result of an owner-checked release
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The session was closed and removed
    Released(CameraStreamSession),
    /// No admitted session for the camera
    NotFound,
    /// The camera is owned by a different connection; nothing changed
    NotOwner { owner: ConnectionHandle },
}
