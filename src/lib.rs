//! # AAC LAN Streamer
//!
//! Low-latency streaming of AAC audio over a LAN, with enough inline timing
//! information for receivers to reconstruct the sender's capture clock.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────── PRODUCER ────────────────────────────┐
//! │  compressed packets ──▶ ADTS encoder (codec::encoder)            │
//! │                              │                                   │
//! │                              ▼                                   │
//! │  SyncedChunkStream (network::stream) ──▶ StreamServer            │
//! │        per connection: [SyncHeader][ADTS frames] over TCP        │
//! └──────────────────────────────┬───────────────────────────────────┘
//!                                │ LAN
//! ┌──────────────────────────────▼───────────────────────────────────┐
//! │  StreamClient (network::client) ──▶ ADTS decoder (streaming,     │
//! │        resynchronizing) ──▶ SyncResolver (sync) stamps packets   │
//! │                              │                                   │
//! │                              ▼                                   │
//! │  PlaybackTask (playback::task) ──▶ scheduler ──▶ OutputSink      │
//! │        fixed-size buffers, auto pause/resume, priming            │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Hardware capture and output stay outside this crate: producers hand in
//! already-encoded packets, and consumers receive sealed buffers through the
//! [`playback::OutputSink`] trait.

pub mod codec;
pub mod config;
pub mod error;
pub mod network;
pub mod playback;
pub mod sync;
pub mod time;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Default TCP port for audio streaming
    pub const DEFAULT_PORT: u16 = 5000;

    /// Socket read size on the consumer side
    pub const READ_CHUNK_SIZE: usize = 4096;

    /// Default playback buffer capacity in bytes
    pub const DEFAULT_BUFFER_CAPACITY: usize = 6144;

    /// Default number of buffers in the playback pool
    pub const DEFAULT_MAX_BUFFERS: usize = 32;

    /// Default count of sealed buffers required before playback starts
    pub const DEFAULT_MIN_BUFFERED: u32 = 3;

    /// Default capacity of the chunk fan-out channel
    pub const DEFAULT_BROADCAST_CAPACITY: usize = 64;

    /// Default ADTS sampling-frequency index (44.1 kHz)
    pub const DEFAULT_SAMPLE_RATE_INDEX: u8 = 4;

    /// Default ADTS channel configuration (stereo pair)
    pub const DEFAULT_CHANNEL_CONFIG: u8 = 2;
}
