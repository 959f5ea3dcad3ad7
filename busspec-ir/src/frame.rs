//! Raw frames handed to the decode engine.

use std::fmt;

/// Maximum payload width of a frame, in bits.
pub const FRAME_BITS: u32 = 64;

/// A bit-addressable buffer of at most 64 bits.
///
/// Bit 0 is the least significant bit of the buffer.
pub trait BitSource {
    /// The unsigned integer stored in bits `[position, position + length)`.
    fn bits(&self, position: u32, length: u32) -> u64;
}

impl BitSource for u64 {
    fn bits(&self, position: u32, length: u32) -> u64 {
        if length == 0 || position >= FRAME_BITS {
            return 0;
        }
        let shifted = self >> position;
        if length >= FRAME_BITS {
            shifted
        } else {
            shifted & ((1u64 << length) - 1)
        }
    }
}

/// A frame as seen on the bus: an address and up to 64 bits of payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame {
    pub address: u32,
    pub data: u64,
}

impl Frame {
    pub fn new(address: u32, data: u64) -> Self {
        Frame { address, data }
    }

    /// Pack up to 8 payload bytes into the 64-bit frame word.
    ///
    /// Byte 0 always lands in bits 56..64. Shorter payloads are zero-padded
    /// at the end, so bit positions do not depend on the payload length.
    /// Returns `None` for payloads longer than 8 bytes.
    pub fn from_bytes(address: u32, bytes: &[u8]) -> Option<Self> {
        if bytes.len() > 8 {
            return None;
        }
        let mut padded = [0u8; 8];
        padded[..bytes.len()].copy_from_slice(bytes);
        Some(Frame {
            address,
            data: u64::from_be_bytes(padded),
        })
    }
}

impl BitSource for Frame {
    fn bits(&self, position: u32, length: u32) -> u64 {
        self.data.bits(position, length)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03X}#{:016X}", self.address, self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_extracts_range() {
        let data: u64 = 0b1011_0110;
        assert_eq!(data.bits(0, 3), 0b110);
        assert_eq!(data.bits(4, 4), 0b1011);
        assert_eq!(data.bits(1, 1), 1);
    }

    #[test]
    fn test_bits_full_width() {
        assert_eq!(u64::MAX.bits(0, 64), u64::MAX);
        assert_eq!(u64::MAX.bits(63, 1), 1);
        assert_eq!(u64::MAX.bits(64, 0), 0);
    }

    #[test]
    fn test_from_bytes_big_endian_packing() {
        let frame = Frame::from_bytes(0x100, &[0x01, 0x2C]).unwrap();
        assert_eq!(frame.data, 0x012C_0000_0000_0000);
        let frame = Frame::from_bytes(0x100, &[0, 0, 0, 0, 0, 0, 0x01, 0x2C]).unwrap();
        assert_eq!(frame.data, 300);
        assert!(Frame::from_bytes(0x100, &[0; 9]).is_none());
        assert_eq!(Frame::from_bytes(1, &[]).unwrap().data, 0);
    }

    #[test]
    fn test_short_payload_reads_like_padded_payload() {
        let short = Frame::from_bytes(0x120, &[0x00, 0x01, 0x2C, 0x03]).unwrap();
        let padded =
            Frame::from_bytes(0x120, &[0x00, 0x01, 0x2C, 0x03, 0x00, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(short, padded);
        assert_eq!(short.bits(32, 16), 0x2C03);
    }
}
