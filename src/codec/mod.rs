//! AAC/ADTS bitstream codec
//!
//! Frames compressed audio packets for transport and reassembles them on the
//! receive side, resynchronizing past corrupted or truncated input.

pub mod adts;
pub mod crc;
pub mod decoder;
pub mod encoder;
pub mod packet;

pub use adts::AacProfile;
pub use decoder::{AdtsDecoder, DecoderStats};
pub use encoder::{AdtsEncoder, EncoderStats};
pub use packet::{EncodedPacket, PacketDescription};
