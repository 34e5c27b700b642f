//! Shared relay state and outbound delivery
//!
//! The relay and the per-connection outbound queues live behind a single lock.
//! Every event takes the write lock, runs its handler to completion, queues the
//! resulting messages and releases the lock, so handlers never interleave and
//! the device list is never observed half-updated.

use std::collections::HashMap;

use axum::extract::ws::Message;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;

use crate::protocol::ClientEvent;
use crate::registry::{ConnectionId, Device, RegistryConfig};
use crate::relay::{DisconnectReason, Outbound, Relay, RelayEvent};
use crate::session::ConnectionContext;
use crate::stats::{HubMetrics, HubStatus, ServerStats};

/// Queue of messages waiting to be written to one client
pub type Outbox = mpsc::Sender<Message>;

struct HubState {
    relay: Relay,
    outboxes: HashMap<ConnectionId, Outbox>,
}

/// Relay state shared by all connection tasks
pub struct RelayHub {
    state: RwLock<HubState>,
    metrics: HubMetrics,
}

impl RelayHub {
    /// Create a hub with the given registry configuration
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            state: RwLock::new(HubState {
                relay: Relay::with_config(config),
                outboxes: HashMap::new(),
            }),
            metrics: HubMetrics::new(),
        }
    }

    /// Add a connection to the hub
    pub async fn join(&self, ctx: &ConnectionContext, outbox: Outbox) {
        let mut state = self.state.write().await;
        state.outboxes.insert(ctx.connection_id.clone(), outbox);
        self.metrics.connection_opened();

        let out = state
            .relay
            .handle(&ctx.connection_id, RelayEvent::Connect { role: ctx.role });
        self.deliver(&state, out);
    }

    /// Apply an event sent by a connection
    pub async fn dispatch(&self, from: &ConnectionId, event: ClientEvent) {
        if matches!(event, ClientEvent::VideoFrame(_)) {
            self.metrics.frame_received();
        }

        let mut state = self.state.write().await;
        let out = state.relay.handle(from, RelayEvent::Client(event));
        self.deliver(&state, out);
    }

    /// Remove a connection from the hub
    ///
    /// Safe to call more than once; only the first call has any effect.
    pub async fn leave(&self, id: &ConnectionId, reason: DisconnectReason) {
        let mut state = self.state.write().await;
        if state.outboxes.remove(id).is_some() {
            self.metrics.connection_closed();
        }

        let out = state.relay.handle(id, RelayEvent::Disconnect { reason });
        self.deliver(&state, out);
    }

    /// Queue outbound events on their recipients' outboxes
    ///
    /// Never waits: a full or closed outbox drops the message for that
    /// recipient only.
    fn deliver(&self, state: &HubState, out: Vec<Outbound>) {
        for outbound in out {
            let recipients = state.relay.recipients(&outbound.target);
            if recipients.is_empty() {
                continue;
            }

            let text = match outbound.event.to_json() {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(event = outbound.event.name(), error = %e, "Failed to encode event");
                    continue;
                }
            };

            let mut sent = 0u64;
            for id in &recipients {
                let Some(outbox) = state.outboxes.get(id) else {
                    continue;
                };

                match outbox.try_send(Message::Text(text.clone())) {
                    Ok(()) => sent += 1,
                    Err(TrySendError::Full(_)) => {
                        self.metrics.message_dropped();
                        tracing::debug!(
                            connection_id = %id,
                            event = outbound.event.name(),
                            "Outbound queue full, message dropped"
                        );
                    }
                    Err(TrySendError::Closed(_)) => {
                        self.metrics.message_dropped();
                        tracing::debug!(connection_id = %id, "Outbound queue closed");
                    }
                }
            }

            self.metrics.messages_sent(sent);
            tracing::debug!(
                event = outbound.event.name(),
                target = ?outbound.target,
                recipients = recipients.len(),
                sent = sent,
                "Event delivered"
            );
        }
    }

    /// Snapshot of registered devices
    pub async fn devices(&self) -> Vec<Device> {
        self.state.read().await.relay.registry().list()
    }

    /// Number of connections joined to the hub
    pub async fn connection_count(&self) -> usize {
        self.state.read().await.relay.peer_count()
    }

    /// Health report
    pub async fn status(&self) -> HubStatus {
        self.state.read().await.relay.status()
    }

    /// Server counters
    pub fn stats(&self) -> ServerStats {
        self.metrics.snapshot()
    }

    pub(crate) fn metrics(&self) -> &HubMetrics {
        &self.metrics
    }
}

impl Default for RelayHub {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}
