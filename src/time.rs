//! Wall-clock timestamps in microsecond resolution
//!
//! Capture times travel between machines, so they are absolute values on a
//! wall-clock timeline rather than process-local instants. Arithmetic is
//! saturating: a corrupted header must not panic the stream.

use std::time::{SystemTime, UNIX_EPOCH};

/// A point on a wall-clock timeline, in microseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    /// Current wall-clock time
    pub fn now() -> Self {
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);
        Timestamp(micros)
    }

    pub fn from_micros(micros: u64) -> Self {
        Timestamp(micros)
    }

    pub fn as_micros(self) -> u64 {
        self.0
    }

    /// Shift by a signed offset, saturating at the timeline bounds
    pub fn offset_by(self, micros: i64) -> Self {
        if micros >= 0 {
            Timestamp(self.0.saturating_add(micros as u64))
        } else {
            Timestamp(self.0.saturating_sub(micros.unsigned_abs()))
        }
    }

    /// Signed distance from `earlier` to `self` in microseconds
    pub fn micros_since(self, earlier: Timestamp) -> i64 {
        self.0 as i64 - earlier.0 as i64
    }
}
