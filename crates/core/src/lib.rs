//! wiresim-core: Educational simulation of a shared physical transmission medium
//!
//! This library provides the core components for a learning-focused system that:
//! - Encodes text as bits with one odd-parity bit per byte
//! - Renders bits as sampled amplitude waveforms and recovers them by threshold
//! - Carries waveforms over a cable with attenuation, Gaussian noise and delay
//! - Lets several addressed hosts share one cable through a store-and-forward router
//!
//! # Architecture
//!
//! The system is designed around clear module boundaries:
//! - `bitio`: Bit/byte/text conversion and parity
//! - `modem`: Amplitude modulation and threshold demodulation
//! - `cable`: Physical medium with history and signal statistics
//! - `frame`: Addressed frame serialization
//! - `channel`: Mutually exclusive medium (one transmission at a time)
//! - `address`: Host addresses and the address table
//! - `host` / `router`: Endpoints and two-hop delivery
//! - `network`: Setup facade for a whole bus
//! - `metrics`: Observable link behavior
//!
//! # Design Principles
//!
//! - **No panics**: All errors are structured and recoverable
//! - **Serialized medium**: Concurrent senders queue; they never collide
//! - **Deterministic**: Seeded noise makes runs reproducible
//! - **Observable**: Tracing events, waveform history and link counters

pub mod address;
pub mod bitio;
pub mod cable;
pub mod channel;
pub mod error;
pub mod frame;
pub mod host;
pub mod metrics;
pub mod modem;
pub mod network;
pub mod router;

// Re-export commonly used types
pub use address::Address;
pub use error::{Error, Result};
pub use host::{Host, ReceivedMessage};
pub use network::{MultiHostNetwork, NetworkConfig};
pub use router::SendReport;
