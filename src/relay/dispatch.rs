//! Event dispatcher
//!
//! Routes each connection's events through the registry and frame cache and
//! returns the events to emit. Handlers for different connections commute:
//! none of them depends on the order in which other connections' events
//! arrive.

use std::collections::HashMap;

use crate::protocol::{ClientEvent, ClientRole, ServerEvent};
use crate::registry::{
    ConnectionId, DeviceInfo, DeviceRegistry, FrameData, FrameSnapshot, FrameStore, RegistryConfig,
};
use crate::stats::HubStatus;

use super::event::{DisconnectReason, Outbound, RelayEvent, Target};

/// Relay state: registered devices, cached frames and connected peers
#[derive(Debug)]
pub struct Relay {
    registry: DeviceRegistry,
    frames: Option<FrameStore>,
    peers: HashMap<ConnectionId, ClientRole>,
}

impl Relay {
    /// Create a relay with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a relay with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        let frames = config.frame_cache_enabled.then(FrameStore::new);

        Self {
            registry: DeviceRegistry::with_config(config),
            frames,
            peers: HashMap::new(),
        }
    }

    /// Apply one event from a connection
    pub fn handle(&mut self, from: &ConnectionId, event: RelayEvent) -> Vec<Outbound> {
        match event {
            RelayEvent::Connect { role } => self.on_connect(from, role),
            RelayEvent::Disconnect { reason } => self.on_disconnect(from, &reason),
            RelayEvent::Client(event) => {
                if !self.peers.contains_key(from) {
                    tracing::warn!(
                        connection_id = %from,
                        event = event.name(),
                        "Event from unknown connection ignored"
                    );
                    return Vec::new();
                }

                match event {
                    ClientEvent::RegisterDevice(info) => self.on_register(from, info),
                    ClientEvent::RequestView(target) => self.on_request_view(from, &target),
                    ClientEvent::VideoFrame(frame) => self.on_video_frame(from, frame),
                    ClientEvent::GetStream(target) => self.on_get_stream(from, &target),
                    ClientEvent::GetDevices => self.on_get_devices(from),
                }
            }
        }
    }

    fn on_connect(&mut self, id: &ConnectionId, role: ClientRole) -> Vec<Outbound> {
        self.peers.insert(id.clone(), role);

        tracing::debug!(connection_id = %id, role = ?role, peers = self.peers.len(), "Peer connected");

        // Courtesy snapshot; observers can always ask with get-devices
        if role.is_observer() {
            vec![Outbound::to(id, self.devices_updated())]
        } else {
            Vec::new()
        }
    }

    fn on_register(&mut self, id: &ConnectionId, info: DeviceInfo) -> Vec<Outbound> {
        self.registry.register(id, info);
        vec![Outbound::all(self.devices_updated())]
    }

    fn on_request_view(&mut self, from: &ConnectionId, target: &ConnectionId) -> Vec<Outbound> {
        if !self.registry.contains(target) {
            tracing::debug!(
                connection_id = %from,
                target = %target,
                "View requested for unknown device"
            );
            return Vec::new();
        }

        tracing::info!(connection_id = %from, target = %target, "Requesting stream from device");
        vec![Outbound::to(target, ServerEvent::StartStreaming)]
    }

    fn on_video_frame(&mut self, from: &ConnectionId, frame: FrameData) -> Vec<Outbound> {
        let snapshot = match self.frames.as_mut() {
            Some(frames) => frames.put(from, frame),
            None => FrameSnapshot::now(from.clone(), frame),
        };

        tracing::trace!(connection_id = %from, size = snapshot.frame.len(), "Relaying frame");
        vec![Outbound::all_except(from, ServerEvent::VideoFrame(snapshot))]
    }

    fn on_get_stream(&mut self, from: &ConnectionId, target: &ConnectionId) -> Vec<Outbound> {
        match self.frames.as_ref().and_then(|frames| frames.get(target)) {
            Some(snapshot) => vec![Outbound::to(from, ServerEvent::VideoFrame(snapshot.clone()))],
            None => Vec::new(),
        }
    }

    fn on_get_devices(&mut self, from: &ConnectionId) -> Vec<Outbound> {
        vec![Outbound::to(from, self.devices_updated())]
    }

    fn on_disconnect(&mut self, id: &ConnectionId, reason: &DisconnectReason) -> Vec<Outbound> {
        if self.peers.remove(id).is_none() {
            tracing::debug!(connection_id = %id, "Disconnect for unknown connection ignored");
            return Vec::new();
        }

        self.registry.unregister(id);
        if let Some(frames) = self.frames.as_mut() {
            frames.remove(id);
        }

        tracing::info!(
            connection_id = %id,
            reason = %reason,
            peers = self.peers.len(),
            cached_bytes = self.frames.as_ref().map_or(0, FrameStore::size_bytes),
            "Peer disconnected"
        );

        vec![Outbound::all(self.devices_updated())]
    }

    fn devices_updated(&self) -> ServerEvent {
        ServerEvent::DevicesUpdated(self.registry.list())
    }

    /// Resolve a target to the connections it currently covers
    pub fn recipients(&self, target: &Target) -> Vec<ConnectionId> {
        match target {
            Target::Connection(id) => self
                .peers
                .contains_key(id)
                .then(|| id.clone())
                .into_iter()
                .collect(),
            Target::All => self.peers.keys().cloned().collect(),
            Target::AllExcept(except) => self
                .peers
                .keys()
                .filter(|id| *id != except)
                .cloned()
                .collect(),
        }
    }

    /// Get the device registry
    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Get the frame cache, if enabled
    pub fn frames(&self) -> Option<&FrameStore> {
        self.frames.as_ref()
    }

    /// Check whether a connection is currently known
    pub fn is_connected(&self, id: &ConnectionId) -> bool {
        self.peers.contains_key(id)
    }

    /// Number of connected peers (devices and observers)
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Health report for the current state
    pub fn status(&self) -> HubStatus {
        HubStatus::new(self.registry.len(), self.frames.as_ref().map(FrameStore::len))
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Device;

    fn id(s: &str) -> ConnectionId {
        ConnectionId::from(s)
    }

    fn connect(relay: &mut Relay, conn: &str, role: ClientRole) -> Vec<Outbound> {
        relay.handle(&id(conn), RelayEvent::Connect { role })
    }

    fn send(relay: &mut Relay, conn: &str, event: ClientEvent) -> Vec<Outbound> {
        relay.handle(&id(conn), event.into())
    }

    fn disconnect(relay: &mut Relay, conn: &str) -> Vec<Outbound> {
        relay.handle(
            &id(conn),
            RelayEvent::Disconnect {
                reason: DisconnectReason::TransportClosed,
            },
        )
    }

    fn register(relay: &mut Relay, conn: &str, name: &str) -> Vec<Outbound> {
        send(relay, conn, ClientEvent::RegisterDevice(DeviceInfo::named(name)))
    }

    fn frame(data: &'static str) -> ClientEvent {
        ClientEvent::VideoFrame(FrameData::from(data))
    }

    /// Every (recipient, event) pair a batch of outbound events expands to
    fn deliveries(relay: &Relay, out: &[Outbound]) -> Vec<(ConnectionId, ServerEvent)> {
        out.iter()
            .flat_map(|o| {
                relay
                    .recipients(&o.target)
                    .into_iter()
                    .map(move |r| (r, o.event.clone()))
            })
            .collect()
    }

    fn names(devices: &[Device]) -> Vec<&str> {
        devices.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn test_observer_gets_list_on_connect() {
        let mut relay = Relay::new();
        connect(&mut relay, "d1", ClientRole::Unknown);
        register(&mut relay, "d1", "Phone-A");

        let out = connect(&mut relay, "o", ClientRole::Observer);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].target, Target::Connection(id("o")));
        match &out[0].event {
            ServerEvent::DevicesUpdated(devices) => assert_eq!(names(devices), vec!["Phone-A"]),
            other => panic!("unexpected event: {:?}", other),
        }

        assert!(connect(&mut relay, "d2", ClientRole::Unknown).is_empty());
    }

    #[test]
    fn test_register_broadcasts_full_list_to_everyone() {
        let mut relay = Relay::new();
        connect(&mut relay, "o", ClientRole::Observer);
        connect(&mut relay, "d1", ClientRole::Unknown);
        connect(&mut relay, "d2", ClientRole::Unknown);

        register(&mut relay, "d1", "Phone-A");
        let out = register(&mut relay, "d2", "Phone-B");

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].target, Target::All);
        assert_eq!(relay.recipients(&out[0].target).len(), 3);
        match &out[0].event {
            ServerEvent::DevicesUpdated(devices) => {
                assert_eq!(names(devices), vec!["Phone-A", "Phone-B"])
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_reregister_keeps_single_entry() {
        let mut relay = Relay::new();
        connect(&mut relay, "d1", ClientRole::Unknown);

        register(&mut relay, "d1", "Phone-A");
        register(&mut relay, "d1", "Phone-A2");

        let devices = relay.registry().list();
        assert_eq!(names(&devices), vec!["Phone-A2"]);
    }

    #[test]
    fn test_register_without_name_uses_placeholder() {
        let mut relay = Relay::new();
        connect(&mut relay, "d1", ClientRole::Unknown);
        send(&mut relay, "d1", ClientEvent::RegisterDevice(DeviceInfo::named("")));

        assert_eq!(relay.registry().list()[0].name, "Dispositivo Móvil");
    }

    #[test]
    fn test_request_view_targets_only_device() {
        let mut relay = Relay::new();
        connect(&mut relay, "o", ClientRole::Observer);
        connect(&mut relay, "d1", ClientRole::Unknown);
        connect(&mut relay, "d2", ClientRole::Unknown);
        register(&mut relay, "d1", "Phone-A");
        register(&mut relay, "d2", "Phone-B");

        let out = send(&mut relay, "o", ClientEvent::RequestView(id("d1")));

        assert_eq!(
            deliveries(&relay, &out),
            vec![(id("d1"), ServerEvent::StartStreaming)]
        );
    }

    #[test]
    fn test_request_view_unknown_device_is_silent() {
        let mut relay = Relay::new();
        connect(&mut relay, "o", ClientRole::Observer);
        connect(&mut relay, "d1", ClientRole::Unknown);

        // Connected but never registered
        assert!(send(&mut relay, "o", ClientEvent::RequestView(id("d1"))).is_empty());
        // Not connected at all
        assert!(send(&mut relay, "o", ClientEvent::RequestView(id("ghost"))).is_empty());
    }

    #[test]
    fn test_frame_goes_to_everyone_but_sender() {
        let mut relay = Relay::new();
        for conn in ["d1", "d2", "o1", "o2"] {
            connect(&mut relay, conn, ClientRole::Unknown);
        }
        register(&mut relay, "d1", "Phone-A");

        let out = send(&mut relay, "d1", frame("abc"));
        let delivered = deliveries(&relay, &out);

        let mut recipients: Vec<ConnectionId> = delivered.iter().map(|(r, _)| r.clone()).collect();
        recipients.sort();
        assert_eq!(recipients, vec![id("d2"), id("o1"), id("o2")]);

        for (_, event) in delivered {
            match event {
                ServerEvent::VideoFrame(snapshot) => {
                    assert_eq!(snapshot.device_id, id("d1"));
                    assert_eq!(snapshot.frame.as_str(), "abc");
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }
    }

    #[test]
    fn test_get_stream_before_and_after_frame() {
        let mut relay = Relay::new();
        connect(&mut relay, "d1", ClientRole::Unknown);
        connect(&mut relay, "o", ClientRole::Observer);

        assert!(send(&mut relay, "o", ClientEvent::GetStream(id("d1"))).is_empty());

        let relayed = send(&mut relay, "d1", frame("abc"));
        let relayed_ts = match &relayed[0].event {
            ServerEvent::VideoFrame(snapshot) => snapshot.timestamp,
            other => panic!("unexpected event: {:?}", other),
        };

        let out = send(&mut relay, "o", ClientEvent::GetStream(id("d1")));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].target, Target::Connection(id("o")));
        match &out[0].event {
            ServerEvent::VideoFrame(snapshot) => {
                assert_eq!(snapshot.frame.as_str(), "abc");
                assert_eq!(snapshot.timestamp, relayed_ts);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_get_stream_with_cache_disabled() {
        let mut relay = Relay::with_config(RegistryConfig::default().disable_frame_cache());
        connect(&mut relay, "d1", ClientRole::Unknown);
        connect(&mut relay, "o", ClientRole::Observer);

        // Frames are still relayed live
        let out = send(&mut relay, "d1", frame("abc"));
        assert_eq!(deliveries(&relay, &out).len(), 1);

        assert!(send(&mut relay, "o", ClientEvent::GetStream(id("d1"))).is_empty());
        assert!(relay.frames().is_none());
        assert_eq!(relay.status().active_streams, None);
    }

    #[test]
    fn test_get_devices_is_unicast() {
        let mut relay = Relay::new();
        connect(&mut relay, "d1", ClientRole::Unknown);
        connect(&mut relay, "o", ClientRole::Unknown);
        register(&mut relay, "d1", "Phone-A");

        let out = send(&mut relay, "o", ClientEvent::GetDevices);
        let delivered = deliveries(&relay, &out);

        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].0, id("o"));
    }

    #[test]
    fn test_disconnect_cleans_up_and_broadcasts() {
        let mut relay = Relay::new();
        connect(&mut relay, "d1", ClientRole::Unknown);
        connect(&mut relay, "d2", ClientRole::Unknown);
        register(&mut relay, "d1", "Phone-A");
        register(&mut relay, "d2", "Phone-B");
        send(&mut relay, "d1", frame("abc"));

        let out = disconnect(&mut relay, "d1");
        let delivered = deliveries(&relay, &out);

        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].0, id("d2"));
        match &delivered[0].1 {
            ServerEvent::DevicesUpdated(devices) => assert_eq!(names(devices), vec!["Phone-B"]),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(relay.registry().get(&id("d1")).is_none());
        assert!(relay.frames().unwrap().get(&id("d1")).is_none());
        assert!(!relay.is_connected(&id("d1")));
    }

    #[test]
    fn test_second_disconnect_is_noop() {
        let mut relay = Relay::new();
        connect(&mut relay, "d1", ClientRole::Unknown);
        connect(&mut relay, "o", ClientRole::Observer);
        register(&mut relay, "d1", "Phone-A");

        assert_eq!(disconnect(&mut relay, "d1").len(), 1);
        assert!(disconnect(&mut relay, "d1").is_empty());
        assert_eq!(relay.peer_count(), 1);
    }

    #[test]
    fn test_events_after_disconnect_are_ignored() {
        let mut relay = Relay::new();
        connect(&mut relay, "d1", ClientRole::Unknown);
        disconnect(&mut relay, "d1");

        assert!(register(&mut relay, "d1", "Zombie").is_empty());
        assert!(relay.registry().is_empty());
    }

    #[test]
    fn test_status_counts() {
        let mut relay = Relay::new();
        connect(&mut relay, "d1", ClientRole::Unknown);
        connect(&mut relay, "d2", ClientRole::Unknown);
        register(&mut relay, "d1", "Phone-A");
        register(&mut relay, "d2", "Phone-B");
        send(&mut relay, "d1", frame("abc"));

        let status = relay.status();
        assert_eq!(status.status, "OK");
        assert_eq!(status.connected_devices, 2);
        assert_eq!(status.active_streams, Some(1));
    }

    #[test]
    fn test_two_devices_one_observer_scenario() {
        let mut relay = Relay::new();
        connect(&mut relay, "D1", ClientRole::Unknown);
        connect(&mut relay, "D2", ClientRole::Unknown);
        connect(&mut relay, "O", ClientRole::Observer);
        register(&mut relay, "D1", "Phone-A");
        register(&mut relay, "D2", "Phone-B");

        assert_eq!(names(&relay.registry().list()), vec!["Phone-A", "Phone-B"]);

        let out = send(&mut relay, "D1", frame("abc"));
        let delivered = deliveries(&relay, &out);
        let to_observer: Vec<_> = delivered.iter().filter(|(r, _)| *r == id("O")).collect();
        assert_eq!(to_observer.len(), 1);
        match &to_observer[0].1 {
            ServerEvent::VideoFrame(snapshot) => {
                assert_eq!(snapshot.device_id, id("D1"));
                assert_eq!(snapshot.frame.as_str(), "abc");
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(delivered.iter().all(|(r, _)| *r != id("D1")));

        disconnect(&mut relay, "D1");
        assert_eq!(names(&relay.registry().list()), vec!["Phone-B"]);
        assert!(send(&mut relay, "O", ClientEvent::GetStream(id("D1"))).is_empty());
    }
}
