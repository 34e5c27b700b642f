//! Broadcast relay
//!
//! The relay is the hub's state machine. It never touches the network: each
//! event from a connection is applied to the registry and frame cache, and the
//! result is a list of events addressed to one connection, to everyone, or to
//! everyone but the sender. The server turns those into queued WebSocket
//! messages.
//!
//! ```text
//!   (ConnectionId, RelayEvent) ──► Relay::handle() ──► Vec<Outbound>
//!                                      │                  │
//!                            DeviceRegistry           Target::Connection(id)
//!                            FrameStore               Target::All
//!                            peers                    Target::AllExcept(id)
//! ```

pub mod dispatch;
pub mod event;

pub use dispatch::Relay;
pub use event::{DisconnectReason, Outbound, RelayEvent, Target};
