//! Synchronization header wire format
//!
//! Layout, 20 bytes, big-endian:
//!
//! ```text
//! bytes 0..4    magic "ASYN"
//! bytes 4..12   capture time, microseconds, sender clock
//! bytes 12..20  receiver clock guess, microseconds
//! ```
//!
//! The magic byte 0x41 cannot alias the 0xFFFx frame sync pattern, so the
//! decoder can probe for either at any stream position.

use crate::error::SyncError;
use crate::time::Timestamp;

/// Wire size of the header
pub const SYNC_HEADER_LEN: usize = 20;

/// Leading magic bytes
pub const SYNC_MAGIC: [u8; 4] = *b"ASYN";

/// Clock-alignment marker prefixed to each transmitted chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncHeader {
    /// Capture instant in the sender's clock domain
    pub capture_time: Timestamp,
    /// The sender's estimate of what the receiver's clock reads now
    pub receiver_guess: Timestamp,
}

impl SyncHeader {
    /// Serialize to the fixed wire layout
    pub fn encode(&self) -> [u8; SYNC_HEADER_LEN] {
        let mut out = [0u8; SYNC_HEADER_LEN];
        out[0..4].copy_from_slice(&SYNC_MAGIC);
        out[4..12].copy_from_slice(&self.capture_time.as_micros().to_be_bytes());
        out[12..20].copy_from_slice(&self.receiver_guess.as_micros().to_be_bytes());
        out
    }

    /// True when `bytes` begins with the header magic
    pub fn matches(bytes: &[u8]) -> bool {
        bytes.len() >= SYNC_MAGIC.len() && bytes[..SYNC_MAGIC.len()] == SYNC_MAGIC
    }

    /// Parse a header from the start of `bytes`
    pub fn parse(bytes: &[u8]) -> Result<Self, SyncError> {
        if bytes.len() < SYNC_HEADER_LEN {
            return Err(SyncError::UndersizedHeader {
                len: bytes.len(),
                expected: SYNC_HEADER_LEN,
            });
        }
        if !Self::matches(bytes) {
            return Err(SyncError::BadMagic);
        }

        let mut capture = [0u8; 8];
        capture.copy_from_slice(&bytes[4..12]);
        let mut guess = [0u8; 8];
        guess.copy_from_slice(&bytes[12..20]);

        Ok(Self {
            capture_time: Timestamp::from_micros(u64::from_be_bytes(capture)),
            receiver_guess: Timestamp::from_micros(u64::from_be_bytes(guess)),
        })
    }
}
