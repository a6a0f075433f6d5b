//! Hook listener configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Default port for the hook listener
pub const DEFAULT_HOOK_PORT: u16 = 1936;

/// Hook listener configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent hook connections (0 = unlimited)
    pub max_connections: usize,

    /// Idle timeout (disconnect if no command received)
    pub idle_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_HOOK_PORT)),
            max_connections: 0, // Unlimited
            idle_timeout: Duration::from_secs(300),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set idle timeout
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }
}
