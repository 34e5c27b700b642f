//! Per-connection handling
//!
//! Each upgraded WebSocket is split in two:
//! - Writer task: owns the sink and drains the connection's outbox
//! - Read loop: parses inbound events and dispatches them to the hub
//!
//! Whatever ends the read loop (close frame, error, idle timeout) produces a
//! single `leave` on the hub.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, OwnedSemaphorePermit};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::error::Result;
use crate::protocol::ClientEvent;
use crate::registry::ConnectionId;
use crate::relay::DisconnectReason;
use crate::server::config::ServerConfig;
use crate::server::hub::RelayHub;
use crate::server::listener::AppState;
use crate::session::{ConnectionContext, ConnectionState};

/// How long the writer may take to flush after the read side ends
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Stand-in for a disabled heartbeat timer
const NEVER: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// `GET /ws`: upgrade to the event channel
pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Response {
    // Check connection limit
    let permit = match state.connection_semaphore {
        Some(ref sem) => match sem.clone().try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                state.hub.metrics().connection_rejected();
                tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                return StatusCode::SERVICE_UNAVAILABLE.into_response();
            }
        },
        None => None,
    };

    let header_str = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let referer = header_str(header::REFERER);
    let user_agent = header_str(header::USER_AGENT);
    let role = state.config.quirks.detect_role(referer.as_deref());

    let ctx = ConnectionContext::new(peer_addr).with_headers(referer, user_agent, role);

    ws.max_message_size(state.config.max_message_size)
        .on_upgrade(move |socket| async move {
            let connection = Connection::new(ctx, state.config, state.hub);
            connection.run(socket, permit).await;
        })
}

/// Removes a joined connection from the hub if the task ends without doing so
///
/// Covers panics and cancellation of the connection task; `leave` on the hub
/// is idempotent, so a late duplicate is harmless.
pub(crate) struct LeaveGuard {
    hub: Arc<RelayHub>,
    id: ConnectionId,
    armed: bool,
}

impl LeaveGuard {
    pub(crate) fn new(hub: Arc<RelayHub>, id: ConnectionId) -> Self {
        Self { hub, id, armed: true }
    }

    /// Leave the hub now
    pub(crate) async fn leave(mut self, reason: DisconnectReason) {
        self.hub.leave(&self.id, reason).await;
        self.armed = false;
    }
}

impl Drop for LeaveGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::error!(connection_id = %self.id, "No runtime to clean up connection");
            return;
        };

        tracing::warn!(connection_id = %self.id, "Connection task ended without cleanup");
        let hub = Arc::clone(&self.hub);
        let id = self.id.clone();
        handle.spawn(async move {
            hub.leave(&id, DisconnectReason::Aborted).await;
        });
    }
}

/// A single client connection
pub(crate) struct Connection {
    ctx: ConnectionContext,
    state: ConnectionState,
    config: Arc<ServerConfig>,
    hub: Arc<RelayHub>,
}

impl Connection {
    pub(crate) fn new(ctx: ConnectionContext, config: Arc<ServerConfig>, hub: Arc<RelayHub>) -> Self {
        let state = ConnectionState::new(ctx.connection_id.clone());
        Self {
            ctx,
            state,
            config,
            hub,
        }
    }

    /// Run the connection until it closes
    ///
    /// The permit, if any, is held for the lifetime of the connection.
    pub(crate) async fn run(mut self, socket: WebSocket, _permit: Option<OwnedSemaphorePermit>) {
        let id = self.ctx.connection_id.clone();
        let (mut sink, mut stream) = socket.split();
        let (tx, mut rx) = mpsc::channel::<Message>(self.config.outbound_queue_capacity);

        tracing::info!(
            connection_id = %id,
            peer = %self.ctx.peer_addr,
            role = ?self.ctx.role,
            referer = self.ctx.referer.as_deref().unwrap_or("-"),
            user_agent = self.ctx.user_agent.as_deref().unwrap_or("-"),
            "Client connected"
        );

        // Spawn writer task: forwards queued messages to the socket
        let writer = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if sink.send(msg).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        self.hub.join(&self.ctx, tx.clone()).await;
        let guard = LeaveGuard::new(Arc::clone(&self.hub), id.clone());
        self.state.open();

        let reason = self.read_loop(&mut stream, &tx).await;

        if self.state.begin_close() {
            guard.leave(reason.clone()).await;
            self.state.finish_close();
        }

        // The hub dropped its sender in leave(); dropping ours ends the writer
        drop(tx);
        let abort = writer.abort_handle();
        if time::timeout(WRITER_DRAIN_TIMEOUT, writer).await.is_err() {
            abort.abort();
        }

        let stats = self.state.stats();
        tracing::info!(
            connection_id = %id,
            reason = %reason,
            duration_secs = stats.duration.as_secs(),
            messages = stats.messages_received,
            frames = stats.frames_received,
            bytes = stats.bytes_received,
            bitrate_bps = stats.bitrate(),
            "Client disconnected"
        );
    }

    async fn read_loop(
        &mut self,
        stream: &mut SplitStream<WebSocket>,
        tx: &mpsc::Sender<Message>,
    ) -> DisconnectReason {
        let ping_interval = self.config.ping_interval.filter(|d| !d.is_zero());
        let idle_interval = self.config.idle_timeout.filter(|d| !d.is_zero());
        let ping_enabled = ping_interval.is_some();
        let idle_enabled = idle_interval.is_some();
        let idle_timeout = idle_interval.unwrap_or(NEVER);

        let ping_every = ping_interval.unwrap_or(NEVER);
        let mut ping = time::interval_at(Instant::now() + ping_every, ping_every);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let deadline = Instant::from_std(self.state.last_activity) + idle_timeout;

            tokio::select! {
                msg = stream.next() => match msg {
                    None => return DisconnectReason::TransportClosed,
                    Some(Err(e)) => return DisconnectReason::TransportError(e.to_string()),
                    Some(Ok(Message::Close(_))) => return DisconnectReason::ClientClosed,
                    Some(Ok(Message::Text(text))) => {
                        self.state.on_message(text.len());
                        if let Err(e) = self.on_text(&text).await {
                            self.state.on_invalid();
                            tracing::debug!(
                                connection_id = %self.ctx.connection_id,
                                error = %e,
                                "Ignoring message"
                            );
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        self.state.touch();
                        tracing::debug!(
                            connection_id = %self.ctx.connection_id,
                            size = data.len(),
                            "Ignoring binary message"
                        );
                    }
                    // Pings are answered by axum; both count as activity
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => self.state.touch(),
                },
                _ = ping.tick(), if ping_enabled => {
                    if tx.try_send(Message::Ping(Vec::new())).is_err() {
                        tracing::trace!(connection_id = %self.ctx.connection_id, "Ping skipped, queue full");
                    }
                }
                _ = time::sleep_until(deadline), if idle_enabled => {
                    tracing::debug!(
                        connection_id = %self.ctx.connection_id,
                        idle_secs = self.state.idle_for().as_secs(),
                        "Idle timeout"
                    );
                    return DisconnectReason::PingTimeout;
                }
            }
        }
    }

    async fn on_text(&mut self, text: &str) -> Result<()> {
        let event = ClientEvent::parse(text, &self.config.quirks)?;

        tracing::trace!(
            connection_id = %self.ctx.connection_id,
            event = event.name(),
            "Event received"
        );

        if matches!(event, ClientEvent::VideoFrame(_)) {
            self.state.on_frame();
        }

        self.hub.dispatch(&self.ctx.connection_id, event).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use super::*;

    async fn joined_hub() -> (Arc<RelayHub>, ConnectionId) {
        let hub = Arc::new(RelayHub::default());
        let addr: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        let ctx = ConnectionContext::new(addr);
        let (tx, _rx) = mpsc::channel(4);
        hub.join(&ctx, tx).await;
        (hub, ctx.connection_id)
    }

    async fn wait_for_empty(hub: &RelayHub) {
        for _ in 0..100 {
            if hub.connection_count().await == 0 {
                return;
            }
            time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_leave_guard_cleans_up_after_panic() {
        let (hub, id) = joined_hub().await;
        let guard = LeaveGuard::new(Arc::clone(&hub), id);

        let task = tokio::spawn(async move {
            let _guard = guard;
            panic!("read loop failed");
        });
        assert!(task.await.is_err());

        wait_for_empty(&hub).await;
        assert_eq!(hub.connection_count().await, 0);
        assert_eq!(hub.stats().active_connections, 0);
    }

    #[tokio::test]
    async fn test_leave_guard_disarmed_after_leave() {
        let (hub, id) = joined_hub().await;
        let guard = LeaveGuard::new(Arc::clone(&hub), id);

        guard.leave(DisconnectReason::ClientClosed).await;

        assert_eq!(hub.connection_count().await, 0);
        assert_eq!(hub.stats().total_connections, 1);
    }
}
