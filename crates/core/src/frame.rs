//! Frame serialization and parsing at the bit level.
//!
//! # Frame Format
//!
//! ```text
//! +------------------+
//! | dst (8 bits)     |  destination address, 255 = broadcast
//! +------------------+
//! | src (8 bits)     |  source address
//! +------------------+
//! | length (16 bits) |  number of data bytes in the payload
//! +------------------+
//! | payload          |  length * 9 bits: each data byte followed by
//! | (variable)       |  one odd-parity bit
//! +------------------+
//! ```
//!
//! All fields are most-significant-bit first. A frame is valid only if its
//! total size is exactly `32 + 9 * length` bits.

use crate::address::Address;
use crate::bitio::{
    add_parity_bits, bits_to_bytes, bytes_to_bits, strip_parity_bits, Bit, BitReader, BitWriter,
    PARITY_GROUP_BITS,
};
use crate::error::{FrameError, Result};

/// Size of the frame header in bits
pub const HEADER_BITS: usize = 32;

/// Largest payload the 16-bit length field can describe
pub const MAX_PAYLOAD_BYTES: usize = u16::MAX as usize;

/// A frame recovered from the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub dst: Address,
    pub src: Address,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(dst: Address, src: Address, data: Vec<u8>) -> Self {
        Self { dst, src, data }
    }

    /// Serialize this frame into its bit-level wire form.
    pub fn to_bits(&self) -> Result<Vec<Bit>> {
        build_frame(self.dst, self.src, &self.data)
    }

    /// Bits on the wire for a payload of `data_len` bytes.
    pub fn wire_bits(data_len: usize) -> usize {
        HEADER_BITS + data_len * PARITY_GROUP_BITS
    }
}

/// Serialize a frame for transmission.
///
/// # Errors
/// `FrameError::PayloadTooLarge` if `data` exceeds 65535 bytes.
pub fn build_frame(dst: Address, src: Address, data: &[u8]) -> Result<Vec<Bit>> {
    let length = u16::try_from(data.len()).map_err(|_| FrameError::PayloadTooLarge {
        len: data.len(),
        max: MAX_PAYLOAD_BYTES,
    })?;

    let payload = add_parity_bits(&bytes_to_bits(data))?;

    let mut writer = BitWriter::with_capacity(HEADER_BITS + payload.len());
    writer.write_byte(dst.value());
    writer.write_byte(src.value());
    writer.write_bits(u64::from(length), 16)?;
    writer.extend(&payload);

    Ok(writer.finish())
}

/// Parse a frame and verify its payload parity.
///
/// # Errors
/// - `FrameError::TooShort` if the header is incomplete
/// - `FrameError::LengthMismatch` if the size disagrees with the declared length
/// - `CodecError::Parity` from the byte codec, unchanged
pub fn recover_payload(bits: &[Bit]) -> Result<Frame> {
    if bits.len() < HEADER_BITS {
        return Err(FrameError::TooShort {
            required: HEADER_BITS,
            actual: bits.len(),
        }
        .into());
    }

    let mut reader = BitReader::new(bits);
    let dst = reader.read_bits(8)? as u8;
    let src = reader.read_bits(8)? as u8;
    let length = reader.read_bits(16)? as u16;

    let payload_bits = usize::from(length) * PARITY_GROUP_BITS;
    if reader.bits_remaining() != payload_bits {
        return Err(FrameError::LengthMismatch {
            declared: length,
            actual_bits: bits.len(),
        }
        .into());
    }

    let payload = reader.read_slice(payload_bits)?;
    let data = bits_to_bytes(&strip_parity_bits(payload)?)?;

    Ok(Frame {
        dst: Address::new(dst),
        src: Address::new(src),
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CodecError, Error};

    #[test]
    fn test_header_layout() {
        let bits = build_frame(Address::new(0b1000_0001), Address::new(3), b"A").unwrap();
        assert_eq!(bits.len(), 32 + 9);

        let mut reader = BitReader::new(&bits);
        assert_eq!(reader.read_bits(8).unwrap(), 0b1000_0001);
        assert_eq!(reader.read_bits(8).unwrap(), 3);
        assert_eq!(reader.read_bits(16).unwrap(), 1);
        // 'A' = 01000001, two ones -> parity 1
        assert_eq!(reader.read_bits(9).unwrap(), 0b0100_0001_1);
    }

    #[test]
    fn test_round_trip() {
        let data = b"hello, wire".to_vec();
        let bits = build_frame(Address::new(7), Address::new(2), &data).unwrap();

        let frame = recover_payload(&bits).unwrap();
        assert_eq!(frame, Frame::new(Address::new(7), Address::new(2), data));
    }

    #[test]
    fn test_empty_payload() {
        let bits = build_frame(Address::BROADCAST, Address::new(1), &[]).unwrap();
        assert_eq!(bits.len(), HEADER_BITS);

        let frame = recover_payload(&bits).unwrap();
        assert!(frame.dst.is_broadcast());
        assert!(frame.data.is_empty());
    }

    #[test]
    fn test_too_short() {
        let result = recover_payload(&[true; 20]);
        assert!(matches!(
            result,
            Err(Error::Frame(FrameError::TooShort {
                required: 32,
                actual: 20
            }))
        ));
    }

    #[test]
    fn test_length_mismatch() {
        let mut bits = build_frame(Address::new(1), Address::new(2), b"abc").unwrap();
        bits.truncate(bits.len() - 9);

        assert!(matches!(
            recover_payload(&bits),
            Err(Error::Frame(FrameError::LengthMismatch { declared: 3, .. }))
        ));

        let mut bits = build_frame(Address::new(1), Address::new(2), b"abc").unwrap();
        bits.extend([false; 9]);
        assert!(matches!(
            recover_payload(&bits),
            Err(Error::Frame(FrameError::LengthMismatch { .. }))
        ));
    }

    #[test]
    fn test_parity_error_propagates() {
        let mut bits = build_frame(Address::new(1), Address::new(2), b"xyz").unwrap();
        // flip a data bit in the second payload byte
        bits[HEADER_BITS + 9 + 4] = !bits[HEADER_BITS + 9 + 4];

        assert!(matches!(
            recover_payload(&bits),
            Err(Error::Codec(CodecError::Parity { group: 1 }))
        ));
    }

    #[test]
    fn test_payload_too_large() {
        let data = vec![0u8; MAX_PAYLOAD_BYTES + 1];
        assert!(matches!(
            build_frame(Address::new(1), Address::new(2), &data),
            Err(Error::Frame(FrameError::PayloadTooLarge { .. }))
        ));
    }

    #[test]
    fn test_frame_to_bits() {
        let frame = Frame::new(Address::new(4), Address::new(5), b"hi".to_vec());
        let bits = frame.to_bits().unwrap();

        assert_eq!(bits.len(), Frame::wire_bits(2));
        assert_eq!(recover_payload(&bits).unwrap(), frame);
    }
}
