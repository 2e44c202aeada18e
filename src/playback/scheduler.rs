//! Playback buffer scheduler
//!
//! State machine per output stream: buffers accumulate fills, seal to the
//! sink, and flow control keeps enough sealed buffers queued that the sink
//! never starves. All state here is single-writer; concurrent access goes
//! through [`crate::playback::task::PlaybackTask`].

use tracing::{debug, info};

use crate::codec::packet::EncodedPacket;
use crate::config::{PlaybackBehavior, PlaybackConfig};
use crate::error::PlaybackError;
use crate::playback::buffer::{BufferPool, PlaybackBuffer, SealedBuffer};
use crate::time::Timestamp;

/// Consumer of sealed buffers, the seam to hardware output.
///
/// Implementations report each buffer back through
/// [`crate::playback::task::CompletionSender`] (or directly via
/// [`PlaybackScheduler::buffer_consumed`]) once it has been consumed.
pub trait OutputSink: Send {
    /// Queue a sealed buffer for playback
    fn enqueue(&mut self, buffer: SealedBuffer) -> Result<(), PlaybackError>;

    /// Warm up before starting, without adding latency
    fn prime(&mut self) -> Result<(), PlaybackError>;

    /// Begin playback, optionally aligned to the capture instant
    fn start(&mut self, at: Option<Timestamp>) -> Result<(), PlaybackError>;

    /// Stop consuming until the next start
    fn pause(&mut self) -> Result<(), PlaybackError>;
}

/// Flow-control state owned by the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferingState {
    /// Sealed buffers queued at or being consumed by the sink
    pub buffered: u32,
    pub playing: bool,
    /// Sealed buffers required before playback (re)starts
    pub minimum_threshold: u32,
}

/// Scheduler statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct SchedulerStats {
    pub buffers_sealed: u64,
    pub bytes_submitted: u64,
    /// Times the stream paused because the queue nearly drained
    pub underruns: u32,
}

/// Accumulates decoded audio into pooled buffers and drives the sink
pub struct PlaybackScheduler<S: OutputSink> {
    sink: S,
    behavior: PlaybackBehavior,
    pool: BufferPool,
    current: Option<PlaybackBuffer>,
    state: BufferingState,
    /// First capture instant seen while accumulating, handed to the next
    /// start call
    start_time: Option<Timestamp>,
    stats: SchedulerStats,
}

impl<S: OutputSink> PlaybackScheduler<S> {
    pub fn new(sink: S, config: PlaybackConfig) -> Result<Self, PlaybackError> {
        if config.initial_minimum_buffered < 1 {
            return Err(PlaybackError::InvalidConfig(
                "initial_minimum_buffered must be at least 1".into(),
            ));
        }
        Ok(Self {
            sink,
            behavior: config.behavior,
            pool: BufferPool::new(config.buffer_capacity, config.max_buffers),
            current: None,
            state: BufferingState {
                buffered: 0,
                playing: false,
                minimum_threshold: config.initial_minimum_buffered,
            },
            start_time: None,
            stats: SchedulerStats::default(),
        })
    }

    /// Copy raw bytes into the open buffer, opening one if needed
    pub fn fill_with_raw(
        &mut self,
        payload: &[u8],
        capture_time: Option<Timestamp>,
    ) -> Result<(), PlaybackError> {
        if let Some(time) = capture_time {
            self.start_time.get_or_insert(time);
        }
        self.open_buffer(payload.len())?.write(payload)
    }

    /// Copy a packet's sub-frames into the open buffer, translating each
    /// descriptor to buffer-relative offsets
    pub fn fill_with_packets(&mut self, packet: &EncodedPacket) -> Result<(), PlaybackError> {
        if let Some(time) = packet.capture_time() {
            self.start_time.get_or_insert(time);
        }

        let needed: usize = packet.descriptions().iter().map(|pd| pd.size as usize).sum();
        let buffer = self.open_buffer(needed)?;
        for payload in packet.sub_frames() {
            buffer.write_sub_frame(payload)?;
        }
        Ok(())
    }

    fn open_buffer(&mut self, needed: usize) -> Result<&mut PlaybackBuffer, PlaybackError> {
        if needed > self.pool.buffer_capacity() {
            return Err(PlaybackError::PayloadTooLarge {
                len: needed,
                capacity: self.pool.buffer_capacity(),
            });
        }
        if self
            .current
            .as_ref()
            .map_or(false, |buffer| buffer.remaining() < needed)
        {
            self.seal()?;
        }
        if self.current.is_none() {
            self.current = Some(self.pool.checkout()?);
        }
        match self.current.as_mut() {
            Some(buffer) => Ok(buffer),
            None => Err(PlaybackError::PoolExhausted {
                max: self.pool.max_buffers(),
            }),
        }
    }

    /// Submit the open buffer to the sink and arm flow control.
    ///
    /// No-op when nothing has accumulated.
    pub fn seal(&mut self) -> Result<(), PlaybackError> {
        let buffer = match self.current.take() {
            Some(buffer) => buffer,
            None => return Ok(()),
        };
        if buffer.is_empty() {
            self.pool.checkin(buffer);
            return Ok(());
        }

        let sealed = SealedBuffer::new(buffer);
        self.stats.buffers_sealed += 1;
        self.stats.bytes_submitted += sealed.len() as u64;
        self.sink.enqueue(sealed)?;
        self.state.buffered += 1;

        if !self.state.playing && self.state.buffered > self.state.minimum_threshold {
            self.sink.prime()?;
            self.play()?;
        }
        Ok(())
    }

    /// Handle the sink finishing one sealed buffer
    pub fn buffer_consumed(&mut self, buffer: SealedBuffer) -> Result<(), PlaybackError> {
        self.pool.checkin(buffer.into_inner());
        if self.state.buffered > 0 {
            self.state.buffered -= 1;
        }

        match self.behavior {
            PlaybackBehavior::Unbounded => {
                // Pause before the queue runs dry and require one more
                // buffer of margin next time
                if self.state.buffered <= 1 && self.state.playing {
                    self.pause()?;
                    self.state.minimum_threshold += 1;
                    self.stats.underruns += 1;
                    info!(
                        minimum_threshold = self.state.minimum_threshold,
                        "paused to rebuffer"
                    );
                }
            }
            PlaybackBehavior::Bounded => {
                if self.state.buffered < 1 && self.state.playing {
                    self.pause()?;
                }
            }
        }
        Ok(())
    }

    /// Start the sink. No-op while already playing.
    pub fn play(&mut self) -> Result<(), PlaybackError> {
        if self.state.playing {
            return Ok(());
        }
        let at = self.start_time.take();
        self.sink.start(at)?;
        self.state.playing = true;
        debug!(?at, buffered = self.state.buffered, "playback started");
        Ok(())
    }

    /// Pause the sink. No-op while already paused.
    pub fn pause(&mut self) -> Result<(), PlaybackError> {
        if !self.state.playing {
            return Ok(());
        }
        self.sink.pause()?;
        self.state.playing = false;
        debug!(buffered = self.state.buffered, "playback paused");
        Ok(())
    }

    pub fn state(&self) -> BufferingState {
        self.state
    }

    /// Get statistics
    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, PartialEq, Eq, Clone, Copy)]
    enum SinkEvent {
        Enqueue { len: usize, sub_frames: usize },
        Prime,
        Start(Option<Timestamp>),
        Pause,
    }

    #[derive(Default)]
    struct SinkState {
        events: Vec<SinkEvent>,
        queued: Vec<SealedBuffer>,
    }

    /// Sink handle shared with the test so queued buffers can be completed
    /// manually
    #[derive(Clone, Default)]
    struct TestSink(Arc<Mutex<SinkState>>);

    impl TestSink {
        fn events(&self) -> Vec<SinkEvent> {
            self.0.lock().events.clone()
        }

        fn pop_queued(&self) -> Option<SealedBuffer> {
            let mut state = self.0.lock();
            if state.queued.is_empty() {
                None
            } else {
                Some(state.queued.remove(0))
            }
        }
    }

    impl OutputSink for TestSink {
        fn enqueue(&mut self, buffer: SealedBuffer) -> Result<(), PlaybackError> {
            self.0.lock().events.push(SinkEvent::Enqueue {
                len: buffer.len(),
                sub_frames: buffer.descriptions().len(),
            });
            self.0.lock().queued.push(buffer);
            Ok(())
        }

        fn prime(&mut self) -> Result<(), PlaybackError> {
            self.0.lock().events.push(SinkEvent::Prime);
            Ok(())
        }

        fn start(&mut self, at: Option<Timestamp>) -> Result<(), PlaybackError> {
            self.0.lock().events.push(SinkEvent::Start(at));
            Ok(())
        }

        fn pause(&mut self) -> Result<(), PlaybackError> {
            self.0.lock().events.push(SinkEvent::Pause);
            Ok(())
        }
    }

    fn config(behavior: PlaybackBehavior) -> PlaybackConfig {
        PlaybackConfig {
            behavior,
            initial_minimum_buffered: 3,
            buffer_capacity: 256,
            max_buffers: 16,
        }
    }

    fn scheduler(behavior: PlaybackBehavior) -> (PlaybackScheduler<TestSink>, TestSink) {
        let sink = TestSink::default();
        let scheduler = PlaybackScheduler::new(sink.clone(), config(behavior)).unwrap();
        (scheduler, sink)
    }

    fn seal_one(scheduler: &mut PlaybackScheduler<TestSink>, payload: &[u8]) {
        scheduler.fill_with_raw(payload, None).unwrap();
        scheduler.seal().unwrap();
    }

    #[test]
    fn test_playback_starts_past_threshold() {
        let (mut scheduler, sink) = scheduler(PlaybackBehavior::Unbounded);

        for _ in 0..3 {
            seal_one(&mut scheduler, b"chunk");
        }
        assert!(!scheduler.state().playing);

        seal_one(&mut scheduler, b"chunk");
        let state = scheduler.state();
        assert!(state.playing);
        assert_eq!(state.buffered, 4);

        // Prime comes right before start
        let events = sink.events();
        let prime_at = events.iter().position(|e| *e == SinkEvent::Prime).unwrap();
        assert!(matches!(events[prime_at + 1], SinkEvent::Start(_)));
    }

    #[test]
    fn test_unbounded_pauses_and_raises_threshold() {
        let (mut scheduler, sink) = scheduler(PlaybackBehavior::Unbounded);

        for _ in 0..4 {
            seal_one(&mut scheduler, b"chunk");
        }
        assert!(scheduler.state().playing);

        // Completions drain the queue down to one
        for _ in 0..3 {
            let buffer = sink.pop_queued().unwrap();
            scheduler.buffer_consumed(buffer).unwrap();
        }

        let state = scheduler.state();
        assert_eq!(state.buffered, 1);
        assert!(!state.playing);
        assert_eq!(state.minimum_threshold, 4);
        assert_eq!(scheduler.stats().underruns, 1);
        assert_eq!(sink.events().last(), Some(&SinkEvent::Pause));
    }

    #[test]
    fn test_bounded_pauses_only_when_empty() {
        let (mut scheduler, sink) = scheduler(PlaybackBehavior::Bounded);

        for _ in 0..4 {
            seal_one(&mut scheduler, b"chunk");
        }

        for _ in 0..3 {
            let buffer = sink.pop_queued().unwrap();
            scheduler.buffer_consumed(buffer).unwrap();
        }
        let state = scheduler.state();
        assert!(state.playing);
        assert_eq!(state.minimum_threshold, 3);

        let buffer = sink.pop_queued().unwrap();
        scheduler.buffer_consumed(buffer).unwrap();
        assert!(!scheduler.state().playing);
    }

    #[test]
    fn test_play_pause_idempotent() {
        let (mut scheduler, sink) = scheduler(PlaybackBehavior::Unbounded);

        scheduler.pause().unwrap();
        assert!(sink.events().is_empty());

        scheduler.play().unwrap();
        scheduler.play().unwrap();
        let starts = sink
            .events()
            .iter()
            .filter(|e| matches!(e, SinkEvent::Start(_)))
            .count();
        assert_eq!(starts, 1);

        scheduler.pause().unwrap();
        scheduler.pause().unwrap();
        let pauses = sink
            .events()
            .iter()
            .filter(|e| matches!(e, SinkEvent::Pause))
            .count();
        assert_eq!(pauses, 1);
    }

    #[test]
    fn test_first_capture_time_latched_into_start() {
        let (mut scheduler, sink) = scheduler(PlaybackBehavior::Unbounded);

        let first = Timestamp::from_micros(111);
        let later = Timestamp::from_micros(999);

        scheduler.fill_with_raw(b"a", Some(first)).unwrap();
        scheduler.seal().unwrap();
        scheduler.fill_with_raw(b"b", Some(later)).unwrap();
        scheduler.seal().unwrap();

        for _ in 0..2 {
            seal_one(&mut scheduler, b"c");
        }

        assert!(sink
            .events()
            .contains(&SinkEvent::Start(Some(first))));
    }

    #[test]
    fn test_packet_fill_translates_descriptors() {
        let (mut scheduler, sink) = scheduler(PlaybackBehavior::Unbounded);

        let packet = EncodedPacket::new(
            Bytes::from_static(b"aaabbbb"),
            vec![
                crate::codec::packet::PacketDescription::new(0, 3),
                crate::codec::packet::PacketDescription::new(3, 4),
            ],
            None,
        )
        .unwrap();

        scheduler.fill_with_packets(&packet).unwrap();
        scheduler.seal().unwrap();

        let buffer = sink.pop_queued().unwrap();
        assert_eq!(buffer.bytes(), b"aaabbbb");
        assert_eq!(buffer.descriptions().len(), 2);
        assert_eq!(buffer.descriptions()[1].offset, 3);
    }

    #[test]
    fn test_full_buffer_seals_before_next_fill() {
        let (mut scheduler, _sink) = scheduler(PlaybackBehavior::Unbounded);

        scheduler.fill_with_raw(&[0u8; 200], None).unwrap();
        // 200 + 100 exceeds the 256-byte capacity, first buffer seals
        scheduler.fill_with_raw(&[0u8; 100], None).unwrap();
        assert_eq!(scheduler.state().buffered, 1);
    }

    #[test]
    fn test_oversized_payload_fatal() {
        let (mut scheduler, _sink) = scheduler(PlaybackBehavior::Unbounded);
        assert!(matches!(
            scheduler.fill_with_raw(&[0u8; 512], None),
            Err(PlaybackError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn test_empty_seal_is_noop() {
        let (mut scheduler, sink) = scheduler(PlaybackBehavior::Unbounded);
        scheduler.seal().unwrap();
        assert!(sink.events().is_empty());
        assert_eq!(scheduler.state().buffered, 0);
    }
}
