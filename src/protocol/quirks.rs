//! Client compatibility quirks
//!
//! Two generations of browser clients exist in the field and they disagree on
//! naming. This module documents the differences and provides helpers for
//! normalizing them.
//!
//! # Known Quirks
//!
//! ## Legacy capture page
//! - Sends frames as `stream-data` instead of `video-frame`
//! - Puts the payload in a `data` field instead of `frame`
//! - Sends `register-device` with no payload at all
//!
//! ## Admin dashboard
//! - Never announces itself; the only hint is the `Referer` header of the
//!   upgrade request, which points at the admin page
//! - Sends `request-view`/`get-stream` with a bare id string, while newer
//!   builds wrap it as `{"deviceId": ...}`

use super::message::{EVENT_STREAM_DATA, EVENT_VIDEO_FRAME};

/// Frame payload field used by current clients
pub const FRAME_FIELD: &str = "frame";

/// Frame payload field used by legacy clients
pub const LEGACY_FRAME_FIELD: &str = "data";

/// Configuration for handling client quirks
#[derive(Debug, Clone)]
pub struct QuirksConfig {
    /// Accept `stream-data` as an alias of `video-frame`
    pub accept_legacy_events: bool,

    /// Accept `data` as an alias of the `frame` payload field
    pub accept_legacy_fields: bool,

    /// Substring of the `Referer` header that marks an observer, if any
    pub observer_referer_marker: Option<String>,
}

impl Default for QuirksConfig {
    fn default() -> Self {
        Self {
            // Default to lenient for maximum compatibility
            accept_legacy_events: true,
            accept_legacy_fields: true,
            observer_referer_marker: Some("admin".to_string()),
        }
    }
}

impl QuirksConfig {
    /// Strict mode - only canonical names, no referer sniffing
    pub fn strict() -> Self {
        Self {
            accept_legacy_events: false,
            accept_legacy_fields: false,
            observer_referer_marker: None,
        }
    }

    /// Map an inbound event name to its canonical form
    pub fn canonical_event<'a>(&self, name: &'a str) -> &'a str {
        if self.accept_legacy_events && name == EVENT_STREAM_DATA {
            EVENT_VIDEO_FRAME
        } else {
            name
        }
    }

    /// Payload fields to look for a frame in, in order of preference
    pub fn frame_fields(&self) -> &'static [&'static str] {
        if self.accept_legacy_fields {
            &[FRAME_FIELD, LEGACY_FRAME_FIELD]
        } else {
            &[FRAME_FIELD]
        }
    }

    /// Guess the role of a connecting client from its upgrade request
    pub fn detect_role(&self, referer: Option<&str>) -> ClientRole {
        match (&self.observer_referer_marker, referer) {
            (Some(marker), Some(referer)) => ClientRole::from_referer(referer, marker),
            _ => ClientRole::Unknown,
        }
    }
}

/// Detected client role
///
/// Only a hint: the relay never relies on it for correctness, it just lets an
/// observer see the device list without asking for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientRole {
    #[default]
    Unknown,
    Observer,
}

impl ClientRole {
    /// Detect role from the `Referer` header
    pub fn from_referer(referer: &str, marker: &str) -> Self {
        if !marker.is_empty() && referer.to_lowercase().contains(&marker.to_lowercase()) {
            ClientRole::Observer
        } else {
            ClientRole::Unknown
        }
    }

    /// Whether this client is believed to be an observer
    pub fn is_observer(&self) -> bool {
        *self == ClientRole::Observer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_detection() {
        assert_eq!(
            ClientRole::from_referer("https://hub.example.com/admin", "admin"),
            ClientRole::Observer
        );
        assert_eq!(
            ClientRole::from_referer("https://hub.example.com/ADMIN.html", "admin"),
            ClientRole::Observer
        );
        assert_eq!(
            ClientRole::from_referer("https://hub.example.com/", "admin"),
            ClientRole::Unknown
        );
        assert_eq!(
            ClientRole::from_referer("https://hub.example.com/", ""),
            ClientRole::Unknown
        );
    }

    #[test]
    fn test_canonical_event() {
        let config = QuirksConfig::default();
        assert_eq!(config.canonical_event("stream-data"), "video-frame");
        assert_eq!(config.canonical_event("video-frame"), "video-frame");
        assert_eq!(config.canonical_event("get-devices"), "get-devices");

        let strict = QuirksConfig::strict();
        assert_eq!(strict.canonical_event("stream-data"), "stream-data");
    }

    #[test]
    fn test_quirks_config_default() {
        let config = QuirksConfig::default();

        assert!(config.accept_legacy_events);
        assert!(config.accept_legacy_fields);
        assert_eq!(config.frame_fields(), &["frame", "data"]);
        assert_eq!(
            config.detect_role(Some("http://localhost:3000/admin")),
            ClientRole::Observer
        );
        assert_eq!(config.detect_role(None), ClientRole::Unknown);
    }

    #[test]
    fn test_quirks_config_strict() {
        let config = QuirksConfig::strict();

        assert!(!config.accept_legacy_events);
        assert!(!config.accept_legacy_fields);
        assert_eq!(config.frame_fields(), &["frame"]);
        assert_eq!(
            config.detect_role(Some("http://localhost:3000/admin")),
            ClientRole::Unknown
        );
    }
}
