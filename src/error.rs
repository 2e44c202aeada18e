//! Error types for the streaming core

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// ADTS codec errors
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Sub-frame of {0} bytes exceeds the 13-bit ADTS frame length")]
    FrameTooLarge(usize),

    #[error("Sub-frame descriptor ({offset}+{size}) exceeds packet data of {len} bytes")]
    DescriptorOutOfBounds { offset: u32, size: u32, len: usize },
}

/// Time-synchronization errors
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Sync header needs {expected} bytes, got {len}")]
    UndersizedHeader { len: usize, expected: usize },

    #[error("Sync header magic mismatch")]
    BadMagic,

    #[error("Unknown synchronization target {0}")]
    UnknownTarget(uuid::Uuid),
}

/// Playback scheduling errors
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("All {max} playback buffers are checked out")]
    PoolExhausted { max: usize },

    #[error("Payload of {len} bytes exceeds buffer capacity of {capacity}")]
    PayloadTooLarge { len: usize, capacity: usize },

    #[error("Output sink rejected operation: {0}")]
    SinkRejected(String),

    #[error("Playback task channel is closed")]
    ChannelClosed,

    #[error("Playback task terminated unexpectedly")]
    TaskFailed,

    #[error("Invalid playback configuration: {0}")]
    InvalidConfig(String),
}

/// Network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Socket bind failed: {0}")]
    BindFailed(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Connection closed")]
    Closed,
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;
