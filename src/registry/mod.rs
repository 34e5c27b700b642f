//! Device registry and latest-frame cache
//!
//! The registry is the transient state of the hub: which connections have
//! registered as camera devices, and (optionally) the last frame each of them
//! sent. Nothing here is persisted; entries live exactly as long as the
//! connection that created them.
//!
//! # Architecture
//!
//! ```text
//!                       Relay (owned state)
//!              ┌──────────────────────────────────┐
//!              │ DeviceRegistry                   │
//!              │   HashMap<ConnectionId, Device>  │
//!              │ Option<FrameStore>               │
//!              │   HashMap<ConnectionId, Frame>   │
//!              └────────────────┬─────────────────┘
//!                               │
//!        ┌──────────────────────┼──────────────────────┐
//!        ▼                      ▼                      ▼
//!   register-device        video-frame            disconnect
//!   registry.register()    frames.put()           registry.unregister()
//!                                                 frames.remove()
//! ```
//!
//! # Zero-Copy Frames
//!
//! `FrameData` wraps `bytes::Bytes`, so the cached snapshot and every copy
//! relayed to observers share the same allocation.

pub mod cache;
pub mod config;
pub mod device;
pub mod frame;
pub mod store;

pub use cache::FrameStore;
pub use config::RegistryConfig;
pub use device::{Device, DeviceInfo};
pub use frame::{ConnectionId, FrameData, FrameSnapshot};
pub use store::DeviceRegistry;
