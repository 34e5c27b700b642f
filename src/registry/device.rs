//! Device entry types
//!
//! This module defines the per-connection device metadata stored in the registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::RegistryConfig;
use super::frame::ConnectionId;

/// Metadata supplied by a client in `register-device`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceInfo {
    /// Human-readable label
    pub name: Option<String>,
    /// Browser user agent
    pub user_agent: Option<String>,
}

impl DeviceInfo {
    /// Create device info with a name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            user_agent: None,
        }
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// A registered stream producer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Connection that registered this device
    pub id: ConnectionId,
    /// Human-readable label
    pub name: String,
    /// When the device (re-)registered
    pub registered_at: DateTime<Utc>,
    /// Always true while registered
    pub stream_active: bool,
    /// Browser user agent
    pub user_agent: String,
}

impl Device {
    /// Build a device from registration info
    ///
    /// Only missing or empty fields get placeholders; anything else is kept
    /// verbatim, whitespace included.
    pub(super) fn from_info(id: ConnectionId, info: DeviceInfo, config: &RegistryConfig) -> Self {
        let name = info
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| config.default_device_name.clone());
        let user_agent = info
            .user_agent
            .filter(|ua| !ua.is_empty())
            .unwrap_or_else(|| config.default_user_agent.clone());

        Self {
            id,
            name,
            registered_at: Utc::now(),
            stream_active: true,
            user_agent,
        }
    }
}
