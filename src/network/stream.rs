//! Publish/subscribe fan-out of timestamped audio chunks

use bytes::Bytes;
use tokio::sync::broadcast;

use crate::time::Timestamp;

/// One encoded chunk plus the instant its audio was captured
#[derive(Debug, Clone)]
pub struct SyncedChunk {
    pub bytes: Bytes,
    pub capture_time: Timestamp,
}

impl SyncedChunk {
    pub fn new(bytes: Bytes, capture_time: Timestamp) -> Self {
        Self {
            bytes,
            capture_time,
        }
    }
}

/// Broadcast channel carrying chunks to any number of subscribers.
///
/// Publishing never blocks; a subscriber that falls more than the channel
/// capacity behind skips ahead and is told how much it missed.
#[derive(Clone)]
pub struct SyncedChunkStream {
    tx: broadcast::Sender<SyncedChunk>,
}

impl SyncedChunkStream {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish a chunk to all current subscribers, returning how many
    /// received it
    pub fn publish(&self, chunk: SyncedChunk) -> usize {
        self.tx.send(chunk).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncedChunk> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
