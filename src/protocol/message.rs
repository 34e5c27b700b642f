//! Event envelope parsing and serialization
//!
//! Every message on the wire is a JSON envelope naming an event and carrying
//! an optional payload:
//!
//! ```text
//! {"event": "register-device", "data": {"name": "Phone-A"}}
//! {"event": "request-view",    "data": "3f2c..."}
//! {"event": "video-frame",     "data": {"frame": "data:image/jpeg;base64,..."}}
//! {"event": "get-devices"}
//! ```
//!
//! Parsing is lenient: malformed payloads degrade to defaults rather than
//! rejecting the event. Only an unreadable envelope, an unknown event name, or
//! a targeted request without a target is an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::quirks::QuirksConfig;
use crate::registry::{ConnectionId, Device, DeviceInfo, FrameData, FrameSnapshot};

// Inbound
pub const EVENT_REGISTER_DEVICE: &str = "register-device";
pub const EVENT_REQUEST_VIEW: &str = "request-view";
pub const EVENT_VIDEO_FRAME: &str = "video-frame";
pub const EVENT_STREAM_DATA: &str = "stream-data";
pub const EVENT_GET_STREAM: &str = "get-stream";
pub const EVENT_GET_DEVICES: &str = "get-devices";

// Outbound
pub const EVENT_DEVICES_UPDATED: &str = "devices-updated";
pub const EVENT_START_STREAMING: &str = "start-streaming";

/// Raw envelope as received from a client
#[derive(Debug, Deserialize)]
struct RawEnvelope {
    event: String,
    #[serde(default)]
    data: Value,
}

/// An event sent by a client
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Announce this connection as a camera device
    RegisterDevice(DeviceInfo),
    /// Ask a device to start streaming
    RequestView(ConnectionId),
    /// A frame from this connection
    VideoFrame(FrameData),
    /// Ask for a device's latest cached frame
    GetStream(ConnectionId),
    /// Ask for the current device list
    GetDevices,
}

impl ClientEvent {
    /// Parse a text message into a client event
    pub fn parse(text: &str, quirks: &QuirksConfig) -> Result<Self, ProtocolError> {
        let raw: RawEnvelope = serde_json::from_str(text).map_err(ProtocolError::InvalidJson)?;
        Self::from_parts(&raw.event, raw.data, quirks)
    }

    /// Build a client event from an event name and its payload
    pub fn from_parts(event: &str, data: Value, quirks: &QuirksConfig) -> Result<Self, ProtocolError> {
        match quirks.canonical_event(event) {
            EVENT_REGISTER_DEVICE => Ok(ClientEvent::RegisterDevice(device_info(&data))),
            EVENT_REQUEST_VIEW => target_id(&data)
                .map(ClientEvent::RequestView)
                .ok_or(ProtocolError::MissingDeviceId(EVENT_REQUEST_VIEW)),
            EVENT_VIDEO_FRAME => Ok(ClientEvent::VideoFrame(frame_data(data, quirks))),
            EVENT_GET_STREAM => target_id(&data)
                .map(ClientEvent::GetStream)
                .ok_or(ProtocolError::MissingDeviceId(EVENT_GET_STREAM)),
            EVENT_GET_DEVICES => Ok(ClientEvent::GetDevices),
            other => Err(ProtocolError::UnknownEvent(other.to_string())),
        }
    }

    /// Event name for logging
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::RegisterDevice(_) => EVENT_REGISTER_DEVICE,
            ClientEvent::RequestView(_) => EVENT_REQUEST_VIEW,
            ClientEvent::VideoFrame(_) => EVENT_VIDEO_FRAME,
            ClientEvent::GetStream(_) => EVENT_GET_STREAM,
            ClientEvent::GetDevices => EVENT_GET_DEVICES,
        }
    }
}

/// Extract registration fields, ignoring anything that is not a string
fn device_info(data: &Value) -> DeviceInfo {
    let field = |name: &str| data.get(name).and_then(Value::as_str).map(str::to_string);

    DeviceInfo {
        name: field("name"),
        user_agent: field("userAgent"),
    }
}

/// Extract a target device id from a bare string or `{"deviceId": ...}`
fn target_id(data: &Value) -> Option<ConnectionId> {
    let id = match data {
        Value::String(s) => s.as_str(),
        Value::Object(map) => map.get("deviceId")?.as_str()?,
        _ => return None,
    };

    if id.is_empty() {
        None
    } else {
        Some(ConnectionId::new(id))
    }
}

/// Extract the frame payload
///
/// A bare string is taken as the frame itself. Non-string payloads are kept as
/// their JSON text so they are still relayed opaquely.
fn frame_data(data: Value, quirks: &QuirksConfig) -> FrameData {
    let value = match data {
        Value::Object(mut map) => quirks
            .frame_fields()
            .iter()
            .find_map(|field| map.remove(*field))
            .unwrap_or(Value::Null),
        other => other,
    };

    match value {
        Value::String(s) => FrameData::from(s),
        Value::Null => FrameData::default(),
        other => FrameData::from(other.to_string()),
    }
}

/// An event sent by the hub
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Full registry snapshot
    DevicesUpdated(Vec<Device>),
    /// Tell a device to start sending frames
    StartStreaming,
    /// A relayed or cached frame
    VideoFrame(FrameSnapshot),
}

impl ServerEvent {
    /// Serialize to the wire format
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::InvalidJson)
    }

    /// Event name for logging
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::DevicesUpdated(_) => EVENT_DEVICES_UPDATED,
            ServerEvent::StartStreaming => EVENT_START_STREAMING,
            ServerEvent::VideoFrame(_) => EVENT_VIDEO_FRAME,
        }
    }
}

/// Error type for wire messages
#[derive(Debug)]
pub enum ProtocolError {
    /// Message is not a valid JSON envelope
    InvalidJson(serde_json::Error),
    /// Event name is not part of the protocol
    UnknownEvent(String),
    /// A targeted request did not name a device
    MissingDeviceId(&'static str),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::InvalidJson(e) => write!(f, "Invalid message: {}", e),
            ProtocolError::UnknownEvent(name) => write!(f, "Unknown event: {}", name),
            ProtocolError::MissingDeviceId(event) => {
                write!(f, "Missing device id in {}", event)
            }
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProtocolError::InvalidJson(e) => Some(e),
            _ => None,
        }
    }
}
