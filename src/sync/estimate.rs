//! Per-target clock-domain offset estimation

use crate::time::Timestamp;

/// Fraction of an above-minimum sample that pulls the estimate upward,
/// expressed as a right shift
const DECAY_SHIFT: u32 = 8;

/// Offset filter between a remote clock domain and the local one.
///
/// Each observed sample is the delta between a local reading and the remote
/// side's prediction of it, so it carries the true domain offset plus path
/// latency. The filter tracks the minimum observed delta: over repeated
/// samples the minimum converges on the offset plus the shortest path, while
/// larger samples are queueing jitter. Samples above the minimum still pull
/// the estimate up by 1/256 of their excess, so the filter follows slow clock
/// drift instead of freezing on a stale minimum.
///
/// Outputs are clamped monotonic: a resolved instant is never earlier than
/// the previous one for the same target.
#[derive(Debug, Default)]
pub struct ClockEstimate {
    offset_micros: Option<i64>,
    floor: Option<Timestamp>,
    samples: u64,
}

impl ClockEstimate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in one observed remote-to-local delta
    pub fn observe(&mut self, delta_micros: i64) {
        self.samples += 1;
        self.offset_micros = Some(match self.offset_micros {
            None => delta_micros,
            Some(current) if delta_micros < current => delta_micros,
            Some(current) => current + ((delta_micros - current) >> DECAY_SHIFT),
        });
    }

    /// Current offset estimate, if any sample has been observed
    pub fn offset_micros(&self) -> Option<i64> {
        self.offset_micros
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Project a remote-domain instant into the local domain. Identity until
    /// the first sample arrives.
    pub fn project(&self, instant: Timestamp) -> Timestamp {
        instant.offset_by(self.offset_micros.unwrap_or(0))
    }

    /// Project and clamp so outputs never move backward
    pub fn resolve_monotonic(&mut self, instant: Timestamp) -> Timestamp {
        let projected = self.project(instant);
        let resolved = match self.floor {
            Some(floor) if projected < floor => floor,
            _ => projected,
        };
        self.floor = Some(resolved);
        resolved
    }
}
