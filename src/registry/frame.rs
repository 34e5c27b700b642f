//! Connection identity and frame types
//!
//! This module defines the key used to address devices and connections, and the
//! frame payloads relayed from devices to observers.

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Identity of a live transport connection
///
/// Devices are keyed by the connection that registered them, so this is also
/// the device id seen by observers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Create a connection id from an existing string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random connection id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Opaque frame payload (typically a base64 data URL)
///
/// Backed by `Bytes` so the cached snapshot and every relayed copy share one
/// allocation. Always holds valid UTF-8 since it is only built from strings.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct FrameData(Bytes);

impl FrameData {
    /// Get the payload as a string slice
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for FrameData {
    fn from(s: String) -> Self {
        Self(Bytes::from(s))
    }
}

impl From<&'static str> for FrameData {
    fn from(s: &'static str) -> Self {
        Self(Bytes::from_static(s.as_bytes()))
    }
}

impl fmt::Debug for FrameData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Frames are large blobs, only show the size
        write!(f, "FrameData({} bytes)", self.0.len())
    }
}

impl Serialize for FrameData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FrameData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

/// The most recent frame received from a device
///
/// This is cheap to clone due to `Bytes` reference counting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSnapshot {
    /// Sending connection
    pub device_id: ConnectionId,
    /// Frame payload
    pub frame: FrameData,
    /// When the hub received the frame
    pub timestamp: DateTime<Utc>,
}

impl FrameSnapshot {
    /// Create a snapshot stamped with the current time
    pub fn now(device_id: ConnectionId, frame: FrameData) -> Self {
        Self {
            device_id,
            frame,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = ConnectionId::generate();
        let b = ConnectionId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn test_frame_data_shares_payload() {
        let frame = FrameData::from("data:image/jpeg;base64,AAAA".to_string());
        let copy = frame.clone();

        assert_eq!(copy.as_str(), "data:image/jpeg;base64,AAAA");
        assert_eq!(frame.0.as_ptr(), copy.0.as_ptr());
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let snapshot = FrameSnapshot::now(ConnectionId::from("d1"), FrameData::from("abc"));
        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["deviceId"], "d1");
        assert_eq!(json["frame"], "abc");
        assert!(json["timestamp"].is_string());
    }
}
