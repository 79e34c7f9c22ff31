//! Bit-level codec: text and bytes to bit sequences, and per-byte parity.
//!
//! Bits are carried as `bool` values, one per element, in MSB-first order.
//! Text is encoded one byte per character (U+0000..=U+00FF); anything wider
//! is rejected rather than silently split across bytes.
//!
//! # Parity
//! Each data byte travels as 9 bits: the 8 data bits followed by one odd
//! parity bit, so every valid group contains an odd number of ones.
//!
//! # Example
//! ```
//! use wiresim_core::bitio::{add_parity_bits, bits_to_string, string_to_bits, strip_parity_bits};
//!
//! let bits = string_to_bits("Hi").unwrap();
//! let protected = add_parity_bits(&bits).unwrap();
//! assert_eq!(protected.len(), 18);
//!
//! let recovered = strip_parity_bits(&protected).unwrap();
//! assert_eq!(bits_to_string(&recovered).unwrap(), "Hi");
//! ```

use crate::error::{CodecError, Error, Result};

/// A single binary digit.
pub type Bit = bool;

/// Data bits per byte.
pub const BYTE_BITS: usize = 8;

/// Bits per parity-protected byte.
pub const PARITY_GROUP_BITS: usize = BYTE_BITS + 1;

/// Appends bits MSB-first to a bit sequence.
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    bits: Vec<Bit>,
}

impl BitWriter {
    pub fn new() -> Self {
        Self { bits: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bits: Vec::with_capacity(capacity),
        }
    }

    /// Write the lowest `count` bits of `value`, most significant first.
    ///
    /// # Errors
    /// Returns `CodecError::InvalidBitCount` if count > 64.
    pub fn write_bits(&mut self, value: u64, count: usize) -> Result<()> {
        if count > 64 {
            return Err(CodecError::InvalidBitCount(count).into());
        }

        for shift in (0..count).rev() {
            self.bits.push((value >> shift) & 1 == 1);
        }

        Ok(())
    }

    /// Write one byte as 8 bits.
    pub fn write_byte(&mut self, byte: u8) {
        for shift in (0..BYTE_BITS).rev() {
            self.bits.push((byte >> shift) & 1 == 1);
        }
    }

    /// Append an already-encoded bit sequence.
    pub fn extend(&mut self, bits: &[Bit]) {
        self.bits.extend_from_slice(bits);
    }

    pub fn bit_len(&self) -> usize {
        self.bits.len()
    }

    /// Finish writing and return the bit sequence.
    pub fn finish(self) -> Vec<Bit> {
        self.bits
    }
}

/// Reads bits MSB-first from a bit sequence.
///
/// # Invariants
/// - `position` never exceeds `bits.len()`
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    bits: &'a [Bit],
    position: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(bits: &'a [Bit]) -> Self {
        Self { bits, position: 0 }
    }

    /// Read up to 64 bits as an unsigned integer, most significant first.
    ///
    /// # Errors
    /// - `CodecError::InvalidBitCount` if count > 64
    /// - `CodecError::UnexpectedEnd` if not enough bits remain
    pub fn read_bits(&mut self, count: usize) -> Result<u64> {
        if count > 64 {
            return Err(CodecError::InvalidBitCount(count).into());
        }

        let available = self.bits_remaining();
        if count > available {
            return Err(CodecError::UnexpectedEnd {
                requested: count,
                available,
            }
            .into());
        }

        let value = self.bits[self.position..self.position + count]
            .iter()
            .fold(0u64, |acc, &bit| (acc << 1) | u64::from(bit));
        self.position += count;

        Ok(value)
    }

    /// Borrow the next `count` bits without interpreting them.
    pub fn read_slice(&mut self, count: usize) -> Result<&'a [Bit]> {
        let available = self.bits_remaining();
        if count > available {
            return Err(CodecError::UnexpectedEnd {
                requested: count,
                available,
            }
            .into());
        }

        let slice = &self.bits[self.position..self.position + count];
        self.position += count;
        Ok(slice)
    }

    pub fn bits_remaining(&self) -> usize {
        self.bits.len() - self.position
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_empty(&self) -> bool {
        self.position >= self.bits.len()
    }
}

/// Expand bytes into bits, 8 per byte, MSB first.
pub fn bytes_to_bits(bytes: &[u8]) -> Vec<Bit> {
    let mut writer = BitWriter::with_capacity(bytes.len() * BYTE_BITS);
    for &byte in bytes {
        writer.write_byte(byte);
    }
    writer.finish()
}

/// Pack bits back into bytes.
///
/// # Errors
/// `CodecError::Decoding` if the length is not a multiple of 8.
pub fn bits_to_bytes(bits: &[Bit]) -> Result<Vec<u8>> {
    if bits.len() % BYTE_BITS != 0 {
        return Err(CodecError::Decoding {
            len: bits.len(),
            unit: BYTE_BITS,
        }
        .into());
    }

    Ok(bits
        .chunks_exact(BYTE_BITS)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &bit| (acc << 1) | u8::from(bit)))
        .collect())
}

/// Map text to one byte per character.
///
/// # Errors
/// `CodecError::Encoding` for the first character above U+00FF.
pub fn string_to_bytes(text: &str) -> Result<Vec<u8>> {
    text.chars()
        .enumerate()
        .map(|(position, character)| {
            u8::try_from(u32::from(character))
                .map_err(|_| Error::from(CodecError::Encoding { character, position }))
        })
        .collect()
}

/// Inverse of [`string_to_bytes`]; every byte value maps to a character.
pub fn bytes_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Encode each character as 8 bits, concatenated in order.
pub fn string_to_bits(text: &str) -> Result<Vec<Bit>> {
    Ok(bytes_to_bits(&string_to_bytes(text)?))
}

/// Decode 8-bit groups back into text.
///
/// # Errors
/// `CodecError::Decoding` if the length is not a multiple of 8.
pub fn bits_to_string(bits: &[Bit]) -> Result<String> {
    Ok(bytes_to_string(&bits_to_bytes(bits)?))
}

/// Parity bit that makes the total count of ones in `data` plus itself odd.
pub fn odd_parity(data: &[Bit]) -> Bit {
    data.iter().filter(|&&bit| bit).count() % 2 == 0
}

/// Append one odd-parity bit after every 8-bit group.
///
/// Output length is `input_bytes * 9`.
///
/// # Errors
/// `CodecError::Decoding` if the input is not whole bytes.
pub fn add_parity_bits(bits: &[Bit]) -> Result<Vec<Bit>> {
    if bits.len() % BYTE_BITS != 0 {
        return Err(CodecError::Decoding {
            len: bits.len(),
            unit: BYTE_BITS,
        }
        .into());
    }

    let mut out = Vec::with_capacity(bits.len() / BYTE_BITS * PARITY_GROUP_BITS);
    for chunk in bits.chunks_exact(BYTE_BITS) {
        out.extend_from_slice(chunk);
        out.push(odd_parity(chunk));
    }
    Ok(out)
}

/// Verify and remove the parity bit from every 9-bit group.
///
/// Fails as a whole: no partial payload is returned when any group is bad.
///
/// # Errors
/// - `CodecError::Decoding` if the length is not a multiple of 9
/// - `CodecError::Parity` naming the first group with even parity
pub fn strip_parity_bits(bits: &[Bit]) -> Result<Vec<Bit>> {
    if bits.len() % PARITY_GROUP_BITS != 0 {
        return Err(CodecError::Decoding {
            len: bits.len(),
            unit: PARITY_GROUP_BITS,
        }
        .into());
    }

    let mut out = Vec::with_capacity(bits.len() / PARITY_GROUP_BITS * BYTE_BITS);
    for (group, chunk) in bits.chunks_exact(PARITY_GROUP_BITS).enumerate() {
        if chunk.iter().filter(|&&bit| bit).count() % 2 == 0 {
            return Err(CodecError::Parity { group }.into());
        }
        out.extend_from_slice(&chunk[..BYTE_BITS]);
    }
    Ok(out)
}
