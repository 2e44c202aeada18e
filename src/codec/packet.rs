//! Encoded audio packets and sub-frame descriptors

use bytes::Bytes;

use crate::error::CodecError;
use crate::time::Timestamp;

/// Location of one compressed sub-frame within a packet's data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketDescription {
    /// Byte offset of the sub-frame within the packet data
    pub offset: u32,
    /// Sub-frame size in bytes
    pub size: u32,
}

impl PacketDescription {
    pub fn new(offset: u32, size: u32) -> Self {
        Self { offset, size }
    }

    /// Exclusive end offset of the sub-frame
    pub fn end(&self) -> usize {
        self.offset as usize + self.size as usize
    }
}

/// One or more compressed sub-frames plus their descriptors and an optional
/// capture timestamp. Immutable once produced.
#[derive(Debug, Clone)]
pub struct EncodedPacket {
    data: Bytes,
    descriptions: Vec<PacketDescription>,
    capture_time: Option<Timestamp>,
}

impl EncodedPacket {
    /// Create a packet, validating that every descriptor stays within `data`
    pub fn new(
        data: Bytes,
        descriptions: Vec<PacketDescription>,
        capture_time: Option<Timestamp>,
    ) -> Result<Self, CodecError> {
        for pd in &descriptions {
            if pd.end() > data.len() {
                return Err(CodecError::DescriptorOutOfBounds {
                    offset: pd.offset,
                    size: pd.size,
                    len: data.len(),
                });
            }
        }
        Ok(Self {
            data,
            descriptions,
            capture_time,
        })
    }

    /// Create a packet holding a single sub-frame spanning all of `data`
    pub fn from_single(data: Bytes, capture_time: Option<Timestamp>) -> Self {
        let size = data.len() as u32;
        Self {
            data,
            descriptions: vec![PacketDescription::new(0, size)],
            capture_time,
        }
    }

    /// Construct from parts already known to be consistent
    pub(crate) fn from_parts(
        data: Bytes,
        descriptions: Vec<PacketDescription>,
        capture_time: Option<Timestamp>,
    ) -> Self {
        Self {
            data,
            descriptions,
            capture_time,
        }
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn descriptions(&self) -> &[PacketDescription] {
        &self.descriptions
    }

    pub fn capture_time(&self) -> Option<Timestamp> {
        self.capture_time
    }

    pub fn num_sub_frames(&self) -> usize {
        self.descriptions.len()
    }

    /// Payload bytes of one sub-frame
    pub fn sub_frame(&self, index: usize) -> Option<&[u8]> {
        self.descriptions
            .get(index)
            .map(|pd| &self.data[pd.offset as usize..pd.end()])
    }

    /// Iterate over sub-frame payloads in order
    pub fn sub_frames(&self) -> impl Iterator<Item = &[u8]> {
        self.descriptions
            .iter()
            .map(|pd| &self.data[pd.offset as usize..pd.end()])
    }
}
