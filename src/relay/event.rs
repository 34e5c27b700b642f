//! Relay input and output types

use std::fmt;

use crate::protocol::{ClientEvent, ClientRole, ServerEvent};
use crate::registry::ConnectionId;

/// Everything the relay reacts to, per connection
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    /// Transport connection established
    Connect { role: ClientRole },
    /// A named event sent by the client
    Client(ClientEvent),
    /// Transport connection lost or closed
    Disconnect { reason: DisconnectReason },
}

impl From<ClientEvent> for RelayEvent {
    fn from(event: ClientEvent) -> Self {
        RelayEvent::Client(event)
    }
}

/// Why a connection went away
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Client sent a close frame
    ClientClosed,
    /// Stream ended without a close frame
    TransportClosed,
    /// Read or write failed
    TransportError(String),
    /// Nothing received within the idle timeout
    PingTimeout,
    /// Connection task ended without closing normally
    Aborted,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::ClientClosed => write!(f, "client namespace disconnect"),
            DisconnectReason::TransportClosed => write!(f, "transport close"),
            DisconnectReason::TransportError(e) => write!(f, "transport error: {}", e),
            DisconnectReason::PingTimeout => write!(f, "ping timeout"),
            DisconnectReason::Aborted => write!(f, "connection aborted"),
        }
    }
}

/// Who an outbound event is addressed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Exactly one connection
    Connection(ConnectionId),
    /// Every connected party
    All,
    /// Every connected party except one (the sender)
    AllExcept(ConnectionId),
}

/// An addressed event produced by the relay
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub target: Target,
    pub event: ServerEvent,
}

impl Outbound {
    /// Address an event to one connection
    pub fn to(id: &ConnectionId, event: ServerEvent) -> Self {
        Self {
            target: Target::Connection(id.clone()),
            event,
        }
    }

    /// Address an event to everyone
    pub fn all(event: ServerEvent) -> Self {
        Self {
            target: Target::All,
            event,
        }
    }

    /// Address an event to everyone but the sender
    pub fn all_except(id: &ConnectionId, event: ServerEvent) -> Self {
        Self {
            target: Target::AllExcept(id.clone()),
            event,
        }
    }
}
