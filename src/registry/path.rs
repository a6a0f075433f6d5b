//! Stream path resolution
//!
//! Publishing clients present paths shaped `/<application>/<namespace>/<camera_id>`.
//! The camera identifier is the third segment.

use super::error::{PathDefect, RegistryError};

/// Number of segments a valid stream path carries after the leading slash
pub const STREAM_PATH_SEGMENTS: usize = 3;

/// A validated stream path split into its segments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamPath {
    /// Application name (e.g., "live")
    pub app: String,
    /// Namespace within the application (e.g., "stream")
    pub namespace: String,
    /// Camera identifier
    pub camera_id: String,
}

impl StreamPath {
    /// Create a stream path from its segments
    pub fn new(
        app: impl Into<String>,
        namespace: impl Into<String>,
        camera_id: impl Into<String>,
    ) -> Self {
        Self {
            app: app.into(),
            namespace: namespace.into(),
            camera_id: camera_id.into(),
        }
    }

    /// Parse a raw stream path
    ///
    /// A trailing query (`?token=...`) is ignored and never kept, not even in
    /// the error. Every segment must be non-empty and there must be exactly
    /// three of them.
    pub fn parse(raw: &str) -> Result<Self, RegistryError> {
        let path = without_query(raw);
        let invalid = |defect| RegistryError::InvalidPath {
            path: path.to_string(),
            defect,
        };

        let rest = path
            .strip_prefix('/')
            .ok_or_else(|| invalid(PathDefect::MissingLeadingSlash))?;

        let segments: Vec<&str> = rest.split('/').collect();
        if segments.len() < STREAM_PATH_SEGMENTS {
            return Err(invalid(PathDefect::TooFewSegments(segments.len())));
        }
        if segments.len() > STREAM_PATH_SEGMENTS {
            return Err(invalid(PathDefect::TooManySegments(segments.len())));
        }
        if segments[2].is_empty() {
            return Err(invalid(PathDefect::EmptyCameraId));
        }
        if segments[0].is_empty() || segments[1].is_empty() {
            return Err(invalid(PathDefect::EmptySegment));
        }

        Ok(Self::new(segments[0], segments[1], segments[2]))
    }
}

impl std::fmt::Display for StreamPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}/{}/{}", self.app, self.namespace, self.camera_id)
    }
}

/// Strip the query suffix, which may carry publish credentials
pub fn without_query(raw: &str) -> &str {
    raw.split_once('?').map_or(raw, |(path, _)| path)
}

/// Extract the camera identifier from a raw stream path
pub fn resolve_camera_id(raw: &str) -> Result<String, RegistryError> {
    StreamPath::parse(raw).map(|path| path.camera_id)
}
