//! Connection context
//!
//! Read-only information about a connection, captured from the upgrade request.

use std::net::SocketAddr;

use crate::protocol::ClientRole;
use crate::registry::ConnectionId;

/// Context for one WebSocket connection
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    /// Unique connection ID
    pub connection_id: ConnectionId,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Role hint detected from the upgrade request
    pub role: ClientRole,

    /// `Referer` header of the upgrade request
    pub referer: Option<String>,

    /// `User-Agent` header of the upgrade request
    pub user_agent: Option<String>,
}

impl ConnectionContext {
    /// Create a context with a freshly generated connection id
    pub fn new(peer_addr: SocketAddr) -> Self {
        Self {
            connection_id: ConnectionId::generate(),
            peer_addr,
            role: ClientRole::Unknown,
            referer: None,
            user_agent: None,
        }
    }

    /// Attach the upgrade request headers and the role detected from them
    pub fn with_headers(
        mut self,
        referer: Option<String>,
        user_agent: Option<String>,
        role: ClientRole,
    ) -> Self {
        self.referer = referer;
        self.user_agent = user_agent;
        self.role = role;
        self
    }
}
