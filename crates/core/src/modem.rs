//! Two-level amplitude modulation.
//!
//! Each bit becomes a constant-amplitude segment of `samples_per_bit`
//! samples. Demodulation averages each segment and compares the mean against
//! a threshold, so zero-mean noise within a segment largely cancels out.
//!
//! ```text
//! bits:      1         0         1
//! samples:   ▇▇▇▇▇▇▇▇  ▁▁▁▁▁▁▁▁  ▇▇▇▇▇▇▇▇
//!            high      low       high
//! ```

use serde::{Deserialize, Serialize};

use crate::bitio::Bit;
use crate::error::{Error, Result, ShapeError};

/// A sampled analog signal.
pub type Waveform = Vec<f64>;

/// Modulation parameters, fixed per channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModemConfig {
    /// Samples rendered for every bit
    pub samples_per_bit: usize,

    /// Amplitude of a 1 bit
    pub amplitude_high: f64,

    /// Amplitude of a 0 bit
    pub amplitude_low: f64,

    /// Segment mean at or above which a bit decodes as 1
    pub threshold: f64,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            samples_per_bit: 20,
            amplitude_high: 1.0,
            amplitude_low: 0.1,
            threshold: 0.3,
        }
    }
}

impl ModemConfig {
    /// Check that the parameters describe a usable modulation scheme.
    ///
    /// # Errors
    /// `Error::Config` if `samples_per_bit` is zero, the amplitudes are not
    /// ordered, or the threshold lies outside `(amplitude_low, amplitude_high]`.
    pub fn validate(&self) -> Result<()> {
        if self.samples_per_bit == 0 {
            return Err(Error::Config("samples_per_bit must be at least 1".into()));
        }
        if !(self.amplitude_high.is_finite() && self.amplitude_low.is_finite()) {
            return Err(Error::Config("amplitudes must be finite".into()));
        }
        if self.amplitude_high <= self.amplitude_low {
            return Err(Error::Config(format!(
                "amplitude_high ({}) must exceed amplitude_low ({})",
                self.amplitude_high, self.amplitude_low
            )));
        }
        if !(self.threshold > self.amplitude_low && self.threshold <= self.amplitude_high) {
            return Err(Error::Config(format!(
                "threshold {} must lie in ({}, {}]",
                self.threshold, self.amplitude_low, self.amplitude_high
            )));
        }
        Ok(())
    }

    /// Samples produced for a bit sequence of the given length.
    pub fn waveform_len(&self, bit_count: usize) -> usize {
        bit_count * self.samples_per_bit
    }
}

/// Render bits as a waveform.
///
/// The output always holds `bits.len() * samples_per_bit` samples.
pub fn modulate(bits: &[Bit], config: &ModemConfig) -> Waveform {
    let mut waveform = Vec::with_capacity(config.waveform_len(bits.len()));
    for &bit in bits {
        let amplitude = if bit {
            config.amplitude_high
        } else {
            config.amplitude_low
        };
        waveform.extend(std::iter::repeat(amplitude).take(config.samples_per_bit));
    }
    waveform
}

/// Recover bits from a waveform by per-segment mean.
///
/// # Errors
/// - `ShapeError::ZeroSamplesPerBit` if the configuration has no samples per bit
/// - `ShapeError::Misaligned` if the waveform is not a whole number of bits
pub fn demodulate(waveform: &[f64], config: &ModemConfig) -> Result<Vec<Bit>> {
    let samples_per_bit = config.samples_per_bit;
    if samples_per_bit == 0 {
        return Err(ShapeError::ZeroSamplesPerBit.into());
    }
    if waveform.len() % samples_per_bit != 0 {
        return Err(ShapeError::Misaligned {
            samples: waveform.len(),
            samples_per_bit,
        }
        .into());
    }

    Ok(waveform
        .chunks_exact(samples_per_bit)
        .map(|segment| {
            let mean = segment.iter().sum::<f64>() / samples_per_bit as f64;
            mean >= config.threshold
        })
        .collect())
}
