//! Real-time relay hub between camera devices and observer dashboards
//!
//! Browser clients connect over a WebSocket and exchange named JSON events.
//! Capture pages register as devices and push frames; the admin dashboard
//! discovers devices, asks one to start streaming, and receives every frame
//! relayed through the hub. Nothing is persisted: the device list and the
//! latest frame per device live only as long as their connection.
//!
//! # Example
//! ```no_run
//! use camhub::{RelayServer, ServerConfig};
//!
//! # async fn example() -> camhub::error::Result<()> {
//! let server = RelayServer::new(ServerConfig::from_env());
//! server.run().await?;
//! # Ok(())
//! # }
//! ```
//!
//! The relay state machine can also be driven directly, without a network:
//!
//! ```
//! use camhub::protocol::{ClientEvent, ClientRole};
//! use camhub::registry::{ConnectionId, DeviceInfo};
//! use camhub::relay::{Relay, RelayEvent};
//!
//! let mut relay = Relay::new();
//! let phone = ConnectionId::from("phone");
//!
//! relay.handle(&phone, RelayEvent::Connect { role: ClientRole::Unknown });
//! let out = relay.handle(&phone, ClientEvent::RegisterDevice(DeviceInfo::named("Phone-A")).into());
//!
//! assert_eq!(out.len(), 1);
//! assert_eq!(relay.registry().list()[0].name, "Phone-A");
//! ```

pub mod error;
pub mod protocol;
pub mod registry;
pub mod relay;
pub mod server;
pub mod session;
pub mod stats;

pub use registry::{ConnectionId, Device, DeviceInfo, FrameSnapshot, RegistryConfig};
pub use relay::Relay;
pub use server::{RelayHub, RelayServer, ServerConfig};
