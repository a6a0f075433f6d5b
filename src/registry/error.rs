//! Registry error types
//!
//! Error types for path resolution and admission.

use crate::session::ConnectionHandle;

/// What is wrong with a rejected stream path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathDefect {
    /// Path does not start with `/`
    MissingLeadingSlash,
    /// Fewer than three segments (count found)
    TooFewSegments(usize),
    /// More than three segments (count found)
    TooManySegments(usize),
    /// Camera identifier segment is empty
    EmptyCameraId,
    /// Application or namespace segment is empty
    EmptySegment,
}

impl std::fmt::Display for PathDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathDefect::MissingLeadingSlash => write!(f, "missing leading slash"),
            PathDefect::TooFewSegments(n) => write!(f, "expected 3 segments, found {}", n),
            PathDefect::TooManySegments(n) => write!(f, "expected 3 segments, found {}", n),
            PathDefect::EmptyCameraId => write!(f, "empty camera id"),
            PathDefect::EmptySegment => write!(f, "empty segment"),
        }
    }
}

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Stream path does not match `/<application>/<namespace>/<camera_id>`
    InvalidPath { path: String, defect: PathDefect },
    /// Camera already has an admitted session
    DuplicateStream {
        camera_id: String,
        incumbent: ConnectionHandle,
        rejected: ConnectionHandle,
    },
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::InvalidPath { path, defect } => {
                write!(f, "Invalid stream path {:?}: {}", path, defect)
            }
            RegistryError::DuplicateStream {
                camera_id,
                incumbent,
                rejected,
            } => write!(
                f,
                "Camera {} already streaming on connection {} (rejected {})",
                camera_id, incumbent, rejected
            ),
        }
    }
}

impl std::error::Error for RegistryError {}
