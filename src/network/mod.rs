//! Network transport for synchronized audio streams
//!
//! One TCP byte stream per consumer. The producer side fans every encoded
//! chunk out to all connections, prefixing each with a synchronization
//! header; the consumer side reassembles frames across arbitrary read
//! boundaries.

pub mod client;
pub mod server;
pub mod stream;

pub use client::StreamClient;
pub use server::StreamServer;
pub use stream::{SyncedChunk, SyncedChunkStream};
