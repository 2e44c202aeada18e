//! Fixed-capacity playback buffers and their reuse pool
//!
//! Buffers are checked out of the pool when accumulation starts, sealed and
//! handed to the sink, then checked back in once the sink reports them
//! consumed. The pool bounds memory for the stream: running out of buffers
//! is fatal rather than a silent drop.

use crate::codec::packet::PacketDescription;
use crate::error::PlaybackError;

/// One fixed-capacity output buffer being filled
#[derive(Debug)]
pub struct PlaybackBuffer {
    data: Box<[u8]>,
    used: usize,
    descriptions: Vec<PacketDescription>,
}

impl PlaybackBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            used: 0,
            descriptions: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.used
    }

    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Copy raw bytes at the write cursor
    pub fn write(&mut self, payload: &[u8]) -> Result<(), PlaybackError> {
        if payload.len() > self.remaining() {
            return Err(PlaybackError::PayloadTooLarge {
                len: payload.len(),
                capacity: self.capacity(),
            });
        }
        self.data[self.used..self.used + payload.len()].copy_from_slice(payload);
        self.used += payload.len();
        Ok(())
    }

    /// Copy one sub-frame and record its buffer-relative descriptor
    pub fn write_sub_frame(&mut self, payload: &[u8]) -> Result<(), PlaybackError> {
        let offset = self.used as u32;
        self.write(payload)?;
        self.descriptions
            .push(PacketDescription::new(offset, payload.len() as u32));
        Ok(())
    }

    /// Bytes written so far
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.used]
    }

    pub fn descriptions(&self) -> &[PacketDescription] {
        &self.descriptions
    }

    fn reset(&mut self) {
        self.used = 0;
        self.descriptions.clear();
    }
}

/// A buffer whose used length is final, on its way to the sink
#[derive(Debug)]
pub struct SealedBuffer {
    inner: PlaybackBuffer,
}

impl SealedBuffer {
    pub(crate) fn new(inner: PlaybackBuffer) -> Self {
        Self { inner }
    }

    pub fn len(&self) -> usize {
        self.inner.used()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        self.inner.bytes()
    }

    pub fn descriptions(&self) -> &[PacketDescription] {
        self.inner.descriptions()
    }

    pub(crate) fn into_inner(self) -> PlaybackBuffer {
        self.inner
    }
}

/// Reuse pool of identically sized buffers
#[derive(Debug)]
pub struct BufferPool {
    buffer_capacity: usize,
    max_buffers: usize,
    free: Vec<PlaybackBuffer>,
    outstanding: usize,
}

impl BufferPool {
    pub fn new(buffer_capacity: usize, max_buffers: usize) -> Self {
        Self {
            buffer_capacity,
            max_buffers,
            free: Vec::new(),
            outstanding: 0,
        }
    }

    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }

    pub fn max_buffers(&self) -> usize {
        self.max_buffers
    }

    /// Buffers currently checked out
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Take a buffer, reusing a returned one when available
    pub fn checkout(&mut self) -> Result<PlaybackBuffer, PlaybackError> {
        if self.outstanding >= self.max_buffers {
            return Err(PlaybackError::PoolExhausted {
                max: self.max_buffers,
            });
        }
        self.outstanding += 1;
        Ok(self
            .free
            .pop()
            .unwrap_or_else(|| PlaybackBuffer::new(self.buffer_capacity)))
    }

    /// Return a buffer for reuse
    pub fn checkin(&mut self, mut buffer: PlaybackBuffer) {
        buffer.reset();
        self.outstanding = self.outstanding.saturating_sub(1);
        self.free.push(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_advances_cursor() {
        let mut pool = BufferPool::new(16, 2);
        let mut buffer = pool.checkout().unwrap();

        buffer.write(b"abcd").unwrap();
        buffer.write(b"ef").unwrap();
        assert_eq!(buffer.used(), 6);
        assert_eq!(buffer.bytes(), b"abcdef");
        assert!(buffer.descriptions().is_empty());
    }

    #[test]
    fn test_sub_frames_translate_offsets() {
        let mut pool = BufferPool::new(16, 2);
        let mut buffer = pool.checkout().unwrap();

        buffer.write_sub_frame(b"aaa").unwrap();
        buffer.write_sub_frame(b"bbbb").unwrap();

        assert_eq!(
            buffer.descriptions(),
            &[
                PacketDescription::new(0, 3),
                PacketDescription::new(3, 4)
            ]
        );
    }

    #[test]
    fn test_overflow_rejected() {
        let mut pool = BufferPool::new(4, 1);
        let mut buffer = pool.checkout().unwrap();
        buffer.write(b"abc").unwrap();
        assert!(matches!(
            buffer.write(b"de"),
            Err(PlaybackError::PayloadTooLarge { len: 2, capacity: 4 })
        ));
    }

    #[test]
    fn test_pool_bounds_and_reuse() {
        let mut pool = BufferPool::new(8, 2);
        let a = pool.checkout().unwrap();
        let mut b = pool.checkout().unwrap();
        assert!(matches!(
            pool.checkout(),
            Err(PlaybackError::PoolExhausted { max: 2 })
        ));

        b.write_sub_frame(b"xy").unwrap();
        pool.checkin(b);
        assert_eq!(pool.outstanding(), 1);

        // Reused buffer comes back clean
        let again = pool.checkout().unwrap();
        assert_eq!(again.used(), 0);
        assert!(again.descriptions().is_empty());
        drop((a, again));
    }
}
