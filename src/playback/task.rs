//! Single-owner playback task
//!
//! The scheduler's state is mutated from exactly one thread: fills arrive
//! from the decode loop and completions arrive from the sink's execution
//! context, both as typed messages on the same channel. Ordering on the
//! channel replaces locking around the buffering state.

use bytes::Bytes;
use crossbeam_channel::{unbounded, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::error;

use crate::codec::packet::EncodedPacket;
use crate::config::PlaybackConfig;
use crate::error::PlaybackError;
use crate::playback::buffer::SealedBuffer;
use crate::playback::scheduler::{BufferingState, OutputSink, PlaybackScheduler};
use crate::time::Timestamp;

enum PlaybackCommand {
    FillRaw {
        payload: Bytes,
        capture_time: Option<Timestamp>,
    },
    FillPackets(EncodedPacket),
    Completed(SealedBuffer),
    Flush,
    Shutdown,
}

/// Handle the output sink uses to report consumed buffers back to the task
#[derive(Clone)]
pub struct CompletionSender {
    tx: Sender<PlaybackCommand>,
}

impl CompletionSender {
    pub fn complete(&self, buffer: SealedBuffer) -> Result<(), PlaybackError> {
        self.tx
            .send(PlaybackCommand::Completed(buffer))
            .map_err(|_| PlaybackError::ChannelClosed)
    }
}

/// Owning thread around a [`PlaybackScheduler`]
pub struct PlaybackTask {
    tx: Sender<PlaybackCommand>,
    thread: Option<JoinHandle<Result<(), PlaybackError>>>,
    state: Arc<Mutex<BufferingState>>,
}

impl PlaybackTask {
    /// Spawn the task. The sink is built against a completion sender wired
    /// into the same command channel the fills use.
    pub fn spawn<S, F>(config: PlaybackConfig, build_sink: F) -> Result<Self, crate::Error>
    where
        S: OutputSink + 'static,
        F: FnOnce(CompletionSender) -> S,
    {
        let (tx, rx) = unbounded::<PlaybackCommand>();
        let sink = build_sink(CompletionSender { tx: tx.clone() });
        let mut scheduler = PlaybackScheduler::new(sink, config)?;

        let state = Arc::new(Mutex::new(scheduler.state()));
        let state_mirror = state.clone();

        let thread = thread::Builder::new()
            .name("playback-scheduler".to_string())
            .spawn(move || {
                for command in rx {
                    let result = match command {
                        PlaybackCommand::FillRaw {
                            payload,
                            capture_time,
                        } => scheduler
                            .fill_with_raw(&payload, capture_time)
                            .and_then(|_| scheduler.seal()),
                        PlaybackCommand::FillPackets(packet) => scheduler
                            .fill_with_packets(&packet)
                            .and_then(|_| scheduler.seal()),
                        PlaybackCommand::Completed(buffer) => {
                            scheduler.buffer_consumed(buffer)
                        }
                        PlaybackCommand::Flush => scheduler.seal(),
                        PlaybackCommand::Shutdown => break,
                    };
                    *state_mirror.lock() = scheduler.state();
                    if let Err(e) = result {
                        error!("playback stream failed: {e}");
                        return Err(e);
                    }
                }
                Ok(())
            })?;

        Ok(Self {
            tx,
            thread: Some(thread),
            state,
        })
    }

    /// Buffer raw bytes and seal them toward the sink
    pub fn fill_raw(
        &self,
        payload: Bytes,
        capture_time: Option<Timestamp>,
    ) -> Result<(), PlaybackError> {
        self.tx
            .send(PlaybackCommand::FillRaw {
                payload,
                capture_time,
            })
            .map_err(|_| PlaybackError::ChannelClosed)
    }

    /// Buffer a decoded packet and seal it toward the sink
    pub fn fill_packets(&self, packet: EncodedPacket) -> Result<(), PlaybackError> {
        self.tx
            .send(PlaybackCommand::FillPackets(packet))
            .map_err(|_| PlaybackError::ChannelClosed)
    }

    /// Seal whatever is accumulated, for the end of a bounded stream
    pub fn flush(&self) -> Result<(), PlaybackError> {
        self.tx
            .send(PlaybackCommand::Flush)
            .map_err(|_| PlaybackError::ChannelClosed)
    }

    /// Snapshot of the task's flow-control state
    pub fn state(&self) -> BufferingState {
        *self.state.lock()
    }

    /// Stop the task and surface any stream failure it hit
    pub fn close(mut self) -> Result<(), PlaybackError> {
        let _ = self.tx.send(PlaybackCommand::Shutdown);
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| PlaybackError::TaskFailed)?,
            None => Ok(()),
        }
    }
}

impl Drop for PlaybackTask {
    fn drop(&mut self) {
        let _ = self.tx.send(PlaybackCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
