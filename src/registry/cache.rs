//! Latest-frame cache
//!
//! Keeps only the most recent frame per device so an observer can ask for a
//! device's current picture without waiting for the next broadcast. This is a
//! cache, not a log: every new frame overwrites the previous one.

use std::collections::HashMap;

use super::frame::{ConnectionId, FrameData, FrameSnapshot};

/// Store of the latest frame per connection
#[derive(Debug, Default)]
pub struct FrameStore {
    frames: HashMap<ConnectionId, FrameSnapshot>,
}

impl FrameStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a frame for a connection, replacing any previous one
    ///
    /// Returns the stored snapshot, stamped with the current time.
    pub fn put(&mut self, id: &ConnectionId, frame: FrameData) -> FrameSnapshot {
        let snapshot = FrameSnapshot::now(id.clone(), frame);
        tracing::trace!(connection_id = %id, size = snapshot.frame.len(), "Frame cached");
        self.frames.insert(id.clone(), snapshot.clone());
        snapshot
    }

    /// Get the latest frame for a connection
    pub fn get(&self, id: &ConnectionId) -> Option<&FrameSnapshot> {
        self.frames.get(id)
    }

    /// Drop the cached frame for a connection
    pub fn remove(&mut self, id: &ConnectionId) -> Option<FrameSnapshot> {
        self.frames.remove(id)
    }

    /// Number of connections with a cached frame
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Total size of cached payloads in bytes
    pub fn size_bytes(&self) -> usize {
        self.frames.values().map(|s| s.frame.len()).sum()
    }
}
