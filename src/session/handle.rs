//! Gateway connection identifiers

/// Opaque identifier the Gateway assigns to a connection
///
/// Used for logging and correlation only; nothing dereferences it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionHandle(String);

impl ConnectionHandle {
    /// Create a handle from any Gateway-supplied identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionHandle {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ConnectionHandle {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for ConnectionHandle {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}
