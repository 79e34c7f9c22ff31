//! Error types for the wiresim stack.
//!
//! All operations return structured errors rather than panicking. A parity
//! failure caused by channel noise is an ordinary, recoverable outcome and is
//! reported to the caller like any other error.

use thiserror::Error;

/// Top-level error type for all operations in the system.
///
/// Each variant corresponds to a specific failure domain:
/// - Codec: bit/text conversion and parity checking
/// - Shape: waveform lengths that do not split into whole bits
/// - Frame: header/length inconsistencies on the wire
/// - Address: host registration and destination resolution
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Bit/byte codec error (encoding, decoding or parity)
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Waveform could not be split into whole bit periods
    #[error("waveform shape error: {0}")]
    Shape(#[from] ShapeError),

    /// Frame header or length error
    #[error("framing error: {0}")]
    Frame(#[from] FrameError),

    /// Addressing or registration error
    #[error("address error: {0}")]
    Address(#[from] AddressError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// The shared medium lock was poisoned by a panicking holder
    #[error("channel error: {0}")]
    Channel(String),

    /// The router's host registry lock was poisoned
    #[error("registry error: {0}")]
    Registry(String),
}

impl Error {
    /// True if this error signals corrupted data detected by the parity check.
    pub fn is_parity(&self) -> bool {
        matches!(self, Error::Codec(CodecError::Parity { .. }))
    }
}

/// Bit-level codec errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Character cannot be represented as a single byte
    #[error("character {character:?} at position {position} is outside the single-byte range")]
    Encoding { character: char, position: usize },

    /// Bit sequence does not split into whole units
    #[error("bit length {len} is not a multiple of {unit}")]
    Decoding { len: usize, unit: usize },

    /// Odd parity violated in a 9-bit group
    #[error("parity check failed in byte {group}")]
    Parity { group: usize },

    /// Invalid bit count (more than 64 bits in one field)
    #[error("invalid bit count: {0}")]
    InvalidBitCount(usize),

    /// Attempted to read more bits than available
    #[error("insufficient bits: requested {requested}, available {available}")]
    UnexpectedEnd { requested: usize, available: usize },
}

/// Waveform shape errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("samples per bit must be non-zero")]
    ZeroSamplesPerBit,

    #[error("{samples} samples do not divide into bits of {samples_per_bit} samples")]
    Misaligned {
        samples: usize,
        samples_per_bit: usize,
    },
}

/// Frame errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Not enough bits for the fixed header
    #[error("frame too short: need at least {required} bits, got {actual}")]
    TooShort { required: usize, actual: usize },

    /// Total size disagrees with the declared payload length
    #[error("length mismatch: header declares {declared} bytes, frame carries {actual_bits} bits")]
    LengthMismatch { declared: u16, actual_bits: usize },

    /// Payload does not fit the 16-bit length field
    #[error("payload of {len} bytes exceeds maximum {max}")]
    PayloadTooLarge { len: usize, max: usize },

    /// Header recovered on the relay hop differs from the one sent
    #[error("header mismatch: sent {sent_src}->{sent_dst}, recovered {recovered_src}->{recovered_dst}")]
    HeaderMismatch {
        sent_src: u8,
        sent_dst: u8,
        recovered_src: u8,
        recovered_dst: u8,
    },

    /// Frame is addressed to neither the receiving host nor broadcast
    #[error("frame for {frame_dst} reached host {host}")]
    Misaddressed { host: u8, frame_dst: u8 },
}

/// Addressing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Broadcast address cannot name a host
    #[error("address {0} is reserved for broadcast")]
    Invalid(u8),

    #[error("host {0} already registered")]
    Duplicate(u8),

    #[error("sender {0} is not registered")]
    UnregisteredSender(u8),

    #[error("unknown destination host {0}")]
    Unknown(u8),
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;
