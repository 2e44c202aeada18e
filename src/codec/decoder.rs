//! Streaming ADTS decoder
//!
//! Consumes arbitrarily chunked bytes from a transport, resynchronizes past
//! corruption, and reassembles sub-frames that span read boundaries. Bytes
//! that belong to no recognizable frame are counted and logged, never fatal:
//! the stream keeps playing from the next good frame.

use bytes::{Buf, BytesMut};
use tracing::warn;

use crate::codec::adts::{self, HEADER_LEN_CRC};
use crate::codec::crc::crc16;
use crate::codec::packet::{EncodedPacket, PacketDescription};
use crate::config::CodecConfig;
use crate::sync::header::{SyncHeader, SYNC_HEADER_LEN};
use crate::sync::synchronizer::SyncResolver;
use crate::time::Timestamp;

/// Streaming decoder for one connection's byte stream
pub struct AdtsDecoder {
    config: CodecConfig,
    /// Leftover tail from previous calls, new input is appended to it
    pending: BytesMut,
    /// Clock projection for recognized sync headers
    resolver: SyncResolver,
    stats: DecoderStats,
}

impl AdtsDecoder {
    pub fn new(config: CodecConfig) -> Self {
        Self {
            config,
            pending: BytesMut::new(),
            resolver: SyncResolver::new(),
            stats: DecoderStats::default(),
        }
    }

    /// Most bytes a header at the current position could need before the
    /// parser commits to it
    fn max_header_len(&self) -> usize {
        if self.config.recognize_sync_header {
            HEADER_LEN_CRC + SYNC_HEADER_LEN
        } else {
            HEADER_LEN_CRC
        }
    }

    /// Feed the next chunk of the stream.
    ///
    /// Returns one packet holding every sub-frame completed by this chunk, or
    /// `None` when no frame could be finished yet. Unconsumed bytes are
    /// retained and prefixed onto the next call's input.
    pub fn decode(&mut self, chunk: &[u8]) -> Option<EncodedPacket> {
        self.pending.extend_from_slice(chunk);

        let max_header = self.max_header_len();
        let data = &self.pending[..];

        let mut pos = 0usize;
        let mut lost_run = 0usize;
        let mut assembled = BytesMut::new();
        let mut descriptions = Vec::new();
        let mut capture_time: Option<Timestamp> = None;

        // A frame start is only committed to while a full header's worth of
        // margin remains; trailing bytes wait for the next chunk.
        while pos + max_header < data.len() {
            if !adts::is_frame_start(&data[pos..]) {
                if self.config.recognize_sync_header && SyncHeader::matches(&data[pos..]) {
                    if let Ok(header) = SyncHeader::parse(&data[pos..pos + SYNC_HEADER_LEN]) {
                        flush_lost(&mut self.stats, &mut lost_run);
                        let resolved = self.resolver.resolve(&header, Timestamp::now());
                        capture_time.get_or_insert(resolved);
                        self.stats.sync_headers_seen += 1;
                        pos += SYNC_HEADER_LEN;
                        continue;
                    }
                }
                lost_run += 1;
                pos += 1;
                continue;
            }

            let header = match adts::parse_header(&data[pos..]) {
                Some(header) => header,
                None => break,
            };

            if header.frame_length <= header.header_len() {
                // Sync pattern with a nonsense length field, keep scanning
                lost_run += 1;
                pos += 1;
                continue;
            }

            if data.len() - pos < header.frame_length {
                // Incomplete frame, retain as leftover
                break;
            }

            flush_lost(&mut self.stats, &mut lost_run);

            let payload_start = pos + header.header_len();
            let payload = &data[payload_start..payload_start + header.payload_len()];

            if header.crc_present {
                let stored = adts::parse_crc(&data[pos..]);
                let computed = crc16(payload);
                if stored != computed {
                    warn!(stored, computed, "checksum mismatch, keeping frame");
                    self.stats.crc_failures += 1;
                }
            }

            descriptions.push(PacketDescription::new(
                assembled.len() as u32,
                payload.len() as u32,
            ));
            assembled.extend_from_slice(payload);
            self.stats.frames_recovered += 1;
            pos += header.frame_length;
        }

        flush_lost(&mut self.stats, &mut lost_run);
        self.pending.advance(pos);

        if descriptions.is_empty() {
            return None;
        }

        self.stats.packets_produced += 1;
        Some(EncodedPacket::from_parts(
            assembled.freeze(),
            descriptions,
            capture_time,
        ))
    }

    /// Bytes currently buffered awaiting more input
    pub fn leftover_len(&self) -> usize {
        self.pending.len()
    }

    /// Current estimate of the sender-to-local clock offset, once at least
    /// one sync header has been observed
    pub fn clock_offset_micros(&self) -> Option<i64> {
        self.resolver.offset_micros()
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Get statistics
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Reset statistics
    pub fn reset_stats(&mut self) {
        self.stats = DecoderStats::default();
    }
}

fn flush_lost(stats: &mut DecoderStats, lost_run: &mut usize) {
    if *lost_run > 0 {
        warn!(bytes = *lost_run, "lost non-frame bytes while scanning for sync");
        stats.bytes_lost += *lost_run as u64;
        *lost_run = 0;
    }
}

/// Decoder statistics, the diagnostics surface for corruption and resync
/// events
#[derive(Debug, Clone, Copy, Default)]
pub struct DecoderStats {
    /// Packets handed to the caller
    pub packets_produced: u64,
    /// Sub-frames recovered from the stream
    pub frames_recovered: u64,
    /// Bytes skipped while searching for a sync pattern
    pub bytes_lost: u64,
    /// Frames whose checksum did not match their payload
    pub crc_failures: u64,
    /// Recognized synchronization headers consumed
    pub sync_headers_seen: u64,
}
