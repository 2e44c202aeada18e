//! ADTS encoder
//!
//! Wraps each sub-frame of an encoded packet in its own ADTS header so a
//! receiver can join mid-stream and resynchronize after corruption.

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::adts::{self, HEADER_LEN, HEADER_LEN_CRC, MAX_FRAME_LENGTH};
use crate::codec::crc::crc16;
use crate::codec::packet::EncodedPacket;
use crate::config::CodecConfig;
use crate::error::CodecError;

/// ADTS framing encoder
pub struct AdtsEncoder {
    config: CodecConfig,
    /// Sub-frames framed so far
    frames_encoded: u64,
    /// Total bytes produced, headers included
    bytes_produced: u64,
}

impl AdtsEncoder {
    pub fn new(config: CodecConfig) -> Self {
        Self {
            config,
            frames_encoded: 0,
            bytes_produced: 0,
        }
    }

    /// Header size implied by the checksum setting
    pub fn header_len(&self) -> usize {
        if self.config.crc {
            HEADER_LEN_CRC
        } else {
            HEADER_LEN
        }
    }

    /// Frame every sub-frame of `packet` into one contiguous byte run.
    ///
    /// The output is sized exactly to the sum of the individual frame
    /// lengths: one header per sub-frame plus its payload bytes.
    pub fn encode(&mut self, packet: &EncodedPacket) -> Result<Bytes, CodecError> {
        let header_len = self.header_len();
        let total: usize = packet
            .descriptions()
            .iter()
            .map(|pd| pd.size as usize + header_len)
            .sum();

        let mut out = BytesMut::with_capacity(total);
        let mut header = [0u8; HEADER_LEN_CRC];

        for payload in packet.sub_frames() {
            let frame_length = payload.len() + header_len;
            if frame_length > MAX_FRAME_LENGTH {
                return Err(CodecError::FrameTooLarge(payload.len()));
            }

            let crc = self.config.crc.then(|| crc16(payload));
            adts::write_header(
                &mut header,
                self.config.profile,
                self.config.freq_index,
                self.config.channel_config,
                frame_length,
                crc,
            );

            out.put_slice(&header[..header_len]);
            out.put_slice(payload);
            self.frames_encoded += 1;
        }

        self.bytes_produced += out.len() as u64;
        Ok(out.freeze())
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Get statistics
    pub fn stats(&self) -> EncoderStats {
        EncoderStats {
            frames_encoded: self.frames_encoded,
            bytes_produced: self.bytes_produced,
            average_frame_size: if self.frames_encoded > 0 {
                self.bytes_produced as f32 / self.frames_encoded as f32
            } else {
                0.0
            },
        }
    }

    /// Reset statistics
    pub fn reset_stats(&mut self) {
        self.frames_encoded = 0;
        self.bytes_produced = 0;
    }
}

/// Encoder statistics
#[derive(Debug, Clone)]
pub struct EncoderStats {
    pub frames_encoded: u64,
    pub bytes_produced: u64,
    pub average_frame_size: f32,
}
