//! Playback buffering and flow control
//!
//! Decoded packets accumulate into fixed-size buffers drawn from a reuse
//! pool; sealed buffers go to an output sink which reports them back once
//! consumed. The scheduler starts playback only after a safety margin of
//! buffers is queued and pauses before the queue runs dry.

pub mod buffer;
pub mod scheduler;
pub mod task;

pub use buffer::{BufferPool, PlaybackBuffer, SealedBuffer};
pub use scheduler::{BufferingState, OutputSink, PlaybackScheduler, SchedulerStats};
pub use task::{CompletionSender, PlaybackTask};
