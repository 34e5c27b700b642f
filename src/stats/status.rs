//! Health status report

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Point-in-time health report served on `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubStatus {
    /// Always "OK" while the process is serving
    pub status: &'static str,
    /// When the report was taken
    pub timestamp: DateTime<Utc>,
    /// Registered devices
    pub connected_devices: usize,
    /// Devices with a cached frame, absent when the cache is disabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_streams: Option<usize>,
}

impl HubStatus {
    /// Build a report stamped with the current time
    pub fn new(connected_devices: usize, active_streams: Option<usize>) -> Self {
        Self {
            status: "OK",
            timestamp: Utc::now(),
            connected_devices,
            active_streams,
        }
    }
}
