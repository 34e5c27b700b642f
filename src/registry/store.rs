//! Device registry implementation
//!
//! The canonical mapping from live connection identity to device metadata.

use std::collections::HashMap;

use super::config::RegistryConfig;
use super::device::{Device, DeviceInfo};
use super::frame::ConnectionId;

/// Registry of currently connected devices
///
/// Not internally synchronized. The relay owns it and the server serializes
/// all access, so every `list()` is a consistent snapshot.
#[derive(Debug)]
pub struct DeviceRegistry {
    /// Map of connection id to (registration sequence, device)
    devices: HashMap<ConnectionId, (u64, Device)>,

    /// Next registration sequence number
    next_seq: u64,

    /// Configuration
    config: RegistryConfig,
}

impl DeviceRegistry {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            devices: HashMap::new(),
            next_seq: 0,
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a device for a connection
    ///
    /// Replaces any previous entry for the same connection. Missing or empty
    /// fields fall back to the configured placeholders.
    pub fn register(&mut self, id: &ConnectionId, info: DeviceInfo) -> Device {
        let device = Device::from_info(id.clone(), info, &self.config);
        // Re-registering keeps the original list position
        let (seq, replaced) = match self.devices.get(id) {
            Some((seq, _)) => (*seq, true),
            None => {
                self.next_seq += 1;
                (self.next_seq - 1, false)
            }
        };
        self.devices.insert(id.clone(), (seq, device.clone()));

        tracing::info!(
            connection_id = %id,
            name = %device.name,
            replaced = replaced,
            devices = self.devices.len(),
            "Device registered"
        );

        device
    }

    /// Unregister a connection's device
    ///
    /// Returns the removed device, or `None` if the connection never registered.
    pub fn unregister(&mut self, id: &ConnectionId) -> Option<Device> {
        let removed = self.devices.remove(id).map(|(_, device)| device);

        if let Some(ref device) = removed {
            tracing::info!(
                connection_id = %id,
                name = %device.name,
                devices = self.devices.len(),
                "Device unregistered"
            );
        }

        removed
    }

    /// Snapshot of all registered devices, oldest registration first
    pub fn list(&self) -> Vec<Device> {
        let mut entries: Vec<&(u64, Device)> = self.devices.values().collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, device)| device.clone()).collect()
    }

    /// Get a device by connection id
    pub fn get(&self, id: &ConnectionId) -> Option<&Device> {
        self.devices.get(id).map(|(_, device)| device)
    }

    /// Check whether a connection has registered a device
    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.devices.contains_key(id)
    }

    /// Number of registered devices
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether no devices are registered
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
