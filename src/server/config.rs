//! Server configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::protocol::QuirksConfig;
use crate::registry::RegistryConfig;

/// Port used when `PORT` is unset or invalid
pub const DEFAULT_PORT: u16 = 3000;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Path of the WebSocket endpoint
    pub ws_path: String,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// Outbound messages queued per connection before new ones are dropped
    pub outbound_queue_capacity: usize,

    /// Largest accepted inbound message in bytes
    pub max_message_size: usize,

    /// Interval between server pings (None = never ping)
    pub ping_interval: Option<Duration>,

    /// Disconnect if nothing is received for this long (None = never)
    pub idle_timeout: Option<Duration>,

    /// Registry and frame cache settings
    pub registry: RegistryConfig,

    /// Client compatibility settings
    pub quirks: QuirksConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            ws_path: "/ws".to_string(),
            max_connections: 0, // Unlimited
            outbound_queue_capacity: 64,
            max_message_size: 16 * 1024 * 1024, // 16MB, frames are base64 images
            ping_interval: Some(Duration::from_secs(25)),
            idle_timeout: Some(Duration::from_secs(60)),
            registry: RegistryConfig::default(),
            quirks: QuirksConfig::default(),
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

    /// Create a config listening on all interfaces at `$PORT`
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        Self::with_addr(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the WebSocket endpoint path
    pub fn ws_path(mut self, path: impl Into<String>) -> Self {
        self.ws_path = path.into();
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the per-connection outbound queue capacity
    pub fn outbound_queue_capacity(mut self, capacity: usize) -> Self {
        // mpsc::channel panics on zero capacity
        self.outbound_queue_capacity = capacity.max(1);
        self
    }

    /// Set the largest accepted inbound message
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Set the ping interval (zero disables pings)
    pub fn ping_interval(mut self, interval: Duration) -> Self {
        // time::interval panics on a zero period
        self.ping_interval = (!interval.is_zero()).then_some(interval);
        self
    }

    /// Set idle timeout (zero disables it)
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Disable pings and the idle timeout
    pub fn disable_heartbeat(mut self) -> Self {
        self.ping_interval = None;
        self.idle_timeout = None;
        self
    }

    /// Set registry configuration
    pub fn registry(mut self, registry: RegistryConfig) -> Self {
        self.registry = registry;
        self
    }

    /// Set client quirks configuration
    pub fn quirks(mut self, quirks: QuirksConfig) -> Self {
        self.quirks = quirks;
        self
    }
}
