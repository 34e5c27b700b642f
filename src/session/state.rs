//! Connection state machine
//!
//! Tracks a connection from upgrade to cleanup. Cleanup may be triggered by a
//! close frame, a read error, a failed write, or the idle timeout, possibly
//! more than one at once; `begin_close` lets exactly one of them win.

use std::time::{Duration, Instant};

use crate::registry::ConnectionId;
use crate::stats::ConnectionStats;

/// Connection lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// Upgraded, not yet joined to the hub
    Connected,
    /// Joined to the hub, exchanging events
    Open,
    /// Cleanup in progress
    Closing,
    /// Cleanup done
    Closed,
}

/// Complete connection state
#[derive(Debug)]
pub struct ConnectionState {
    /// Connection id
    pub id: ConnectionId,

    /// Current phase
    pub phase: ConnectionPhase,

    /// Connection start time
    pub connected_at: Instant,

    /// Time of the last message of any kind from the client
    pub last_activity: Instant,

    /// Text messages received
    pub messages_received: u64,

    /// Bytes received in text messages
    pub bytes_received: u64,

    /// Frames received
    pub frames_received: u64,

    /// Messages that failed to parse
    pub invalid_messages: u64,
}

impl ConnectionState {
    /// Create a new connection state
    pub fn new(id: ConnectionId) -> Self {
        let now = Instant::now();
        Self {
            id,
            phase: ConnectionPhase::Connected,
            connected_at: now,
            last_activity: now,
            messages_received: 0,
            bytes_received: 0,
            frames_received: 0,
            invalid_messages: 0,
        }
    }

    /// Transition to open once joined to the hub
    pub fn open(&mut self) {
        if self.phase == ConnectionPhase::Connected {
            self.phase = ConnectionPhase::Open;
        }
    }

    /// Record inbound activity (any frame, including pings and pongs)
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Record a text message
    pub fn on_message(&mut self, size: usize) {
        self.touch();
        self.messages_received += 1;
        self.bytes_received += size as u64;
    }

    /// Record a frame
    pub fn on_frame(&mut self) {
        self.frames_received += 1;
    }

    /// Record a message that failed to parse
    pub fn on_invalid(&mut self) {
        self.invalid_messages += 1;
    }

    /// Start closing
    ///
    /// Returns `true` only for the first caller; cleanup runs only then.
    pub fn begin_close(&mut self) -> bool {
        match self.phase {
            ConnectionPhase::Connected | ConnectionPhase::Open => {
                self.phase = ConnectionPhase::Closing;
                true
            }
            ConnectionPhase::Closing | ConnectionPhase::Closed => false,
        }
    }

    /// Mark cleanup done
    pub fn finish_close(&mut self) {
        self.phase = ConnectionPhase::Closed;
    }

    /// Time since the last inbound message
    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// Get connection duration
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Statistics for this connection so far
    pub fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            messages_received: self.messages_received,
            bytes_received: self.bytes_received,
            frames_received: self.frames_received,
            invalid_messages: self.invalid_messages,
            duration: self.duration(),
        }
    }
}
