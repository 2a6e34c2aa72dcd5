//! Server configuration.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Port used when none is configured.
pub const DEFAULT_PORT: u16 = 8080;

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The address to bind to.
    pub addr: SocketAddr,
    /// The maximum number of concurrent connections.
    pub max_connections: usize,
    /// The largest request head accepted, in bytes.
    pub read_buffer_size: usize,
    /// How long a client may take to send its request head.
    pub request_timeout: Duration,
}

impl ServerConfig {
    /// Listen on every interface at `port`.
    pub fn with_port(port: u16) -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            ..Self::default()
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            max_connections: 1024,
            read_buffer_size: 8192,
            request_timeout: Duration::from_secs(30),
        }
    }
}
