//! Physical medium: attenuation, additive Gaussian noise and propagation delay.
//!
//! A `Cable` is built once per link from an immutable [`CableConfig`]. Every
//! transmission applies
//!
//! ```text
//! out[i] = in[i] * (1 - attenuation) + N(0, noise_level)
//! ```
//!
//! and appends the `(input, output)` pair to a bounded history used only for
//! inspection and plotting.
//!
//! # Determinism
//!
//! Noise comes from an injectable [`NoiseSource`]. The default
//! [`GaussianNoise`] draws from a seeded ChaCha8 RNG, so a fixed seed gives
//! bit-identical waveforms across runs.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Error, Result};
use crate::modem::Waveform;

/// Configuration for one simulated link.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CableConfig {
    /// Link length in meters
    pub length: f64,

    /// Fractional amplitude loss [0.0, 1.0]
    pub attenuation: f64,

    /// Standard deviation of additive noise per sample
    pub noise_level: f64,

    /// Signal speed in meters per second
    pub propagation_speed: f64,

    /// Notify the attached observer after every transmission
    pub debug_mode: bool,

    /// Number of recent transmissions kept for inspection
    pub history_size: usize,
}

impl Default for CableConfig {
    fn default() -> Self {
        Self {
            length: 100.0,
            attenuation: 0.1,
            noise_level: 0.05,
            // about 2/3 the speed of light, typical for copper and fiber
            propagation_speed: 2e8,
            debug_mode: false,
            history_size: 10,
        }
    }
}

impl CableConfig {
    /// A lossless, noiseless link of the given length.
    pub fn ideal(length: f64) -> Self {
        Self {
            length,
            attenuation: 0.0,
            noise_level: 0.0,
            ..Self::default()
        }
    }

    /// # Errors
    /// `Error::Config` for negative or non-finite lengths, attenuation
    /// outside [0, 1], negative noise, a non-positive propagation speed, or a
    /// propagation delay too long to represent.
    pub fn validate(&self) -> Result<()> {
        if !(self.length.is_finite() && self.length >= 0.0) {
            return Err(Error::Config(format!("invalid cable length {}", self.length)));
        }
        if !(0.0..=1.0).contains(&self.attenuation) {
            return Err(Error::Config(format!(
                "attenuation {} outside [0, 1]",
                self.attenuation
            )));
        }
        if !(self.noise_level.is_finite() && self.noise_level >= 0.0) {
            return Err(Error::Config(format!(
                "invalid noise level {}",
                self.noise_level
            )));
        }
        if !(self.propagation_speed.is_finite() && self.propagation_speed > 0.0) {
            return Err(Error::Config(format!(
                "invalid propagation speed {}",
                self.propagation_speed
            )));
        }
        if Duration::try_from_secs_f64(self.length / self.propagation_speed).is_err() {
            return Err(Error::Config(format!(
                "propagation delay of {} m at {} m/s is out of range",
                self.length, self.propagation_speed
            )));
        }
        Ok(())
    }

    /// Time for a signal to traverse the link.
    ///
    /// Saturates at `Duration::MAX` for configs that `validate` rejects.
    pub fn propagation_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.length / self.propagation_speed).unwrap_or(Duration::MAX)
    }
}

/// Source of additive noise samples.
pub trait NoiseSource: Send {
    /// Draw one zero-mean sample with the given standard deviation.
    fn sample(&mut self, std_dev: f64) -> f64;
}

/// Gaussian white noise from a seeded ChaCha8 RNG.
pub struct GaussianNoise {
    rng: ChaCha8Rng,
}

impl GaussianNoise {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }
}

impl NoiseSource for GaussianNoise {
    fn sample(&mut self, std_dev: f64) -> f64 {
        if std_dev == 0.0 {
            return 0.0;
        }
        let z: f64 = self.rng.sample(StandardNormal);
        z * std_dev
    }
}

/// Receives every transmission for visualization.
///
/// Observers have no influence on the signal; the cable behaves identically
/// with or without one attached.
pub trait SignalObserver: Send + Sync {
    /// `history_index` is the position of the stored record, or `None` when
    /// history is disabled.
    fn observe(&self, before: &[f64], after: &[f64], history_index: Option<usize>);
}

/// One recorded transmission.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRecord {
    pub input: Waveform,
    pub output: Waveform,
}

/// Summary statistics of the most recent transmission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalStats {
    pub input_mean: f64,
    pub input_std: f64,
    pub input_max: f64,
    pub input_min: f64,
    pub output_mean: f64,
    pub output_std: f64,
    pub output_max: f64,
    pub output_min: f64,
    /// Signal-to-noise ratio in dB; infinite when no noise was added
    pub snr_db: f64,
}

/// A simulated transmission medium.
///
/// # Thread Safety
/// `transmit` takes `&mut self`; share a cable between threads through
/// [`PhysicalChannel`](crate::channel::PhysicalChannel), which owns the lock.
pub struct Cable {
    config: CableConfig,
    noise: Box<dyn NoiseSource>,
    history: VecDeque<SignalRecord>,
    observer: Option<Arc<dyn SignalObserver>>,
    transmissions: u64,
}

impl Cable {
    /// Create a cable with entropy-seeded Gaussian noise.
    pub fn new(config: CableConfig) -> Result<Self> {
        Self::with_noise(config, Box::new(GaussianNoise::from_entropy()))
    }

    /// Create a cable with reproducible noise.
    pub fn seeded(config: CableConfig, seed: u64) -> Result<Self> {
        Self::with_noise(config, Box::new(GaussianNoise::seeded(seed)))
    }

    pub fn with_noise(config: CableConfig, noise: Box<dyn NoiseSource>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            noise,
            history: VecDeque::with_capacity(config.history_size),
            observer: None,
            transmissions: 0,
        })
    }

    /// Attach an observer, notified after each transmission in debug mode.
    pub fn with_observer(mut self, observer: Arc<dyn SignalObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &CableConfig {
        &self.config
    }

    /// Pass a waveform through the medium.
    ///
    /// Output has the same length as the input.
    pub fn transmit(&mut self, waveform: &[f64]) -> Waveform {
        let gain = 1.0 - self.config.attenuation;
        let noise_level = self.config.noise_level;

        let output: Waveform = waveform
            .iter()
            .map(|&sample| sample * gain + self.noise.sample(noise_level))
            .collect();

        self.transmissions += 1;
        trace!(
            samples = waveform.len(),
            transmission = self.transmissions,
            "cable transmit"
        );

        self.record(waveform, &output);
        output
    }

    /// Time for a signal to traverse this cable.
    pub fn propagation_delay(&self) -> Duration {
        self.config.propagation_delay()
    }

    /// Total transmissions carried since construction.
    pub fn transmissions(&self) -> u64 {
        self.transmissions
    }

    /// Recorded transmissions, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &SignalRecord> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Recorded transmission by position, 0 being the oldest retained.
    pub fn history_entry(&self, index: usize) -> Option<&SignalRecord> {
        self.history.get(index)
    }

    pub fn latest(&self) -> Option<&SignalRecord> {
        self.history.back()
    }

    /// Up to `n` most recent transmissions, oldest first.
    pub fn recent(&self, n: usize) -> Vec<&SignalRecord> {
        let skip = self.history.len().saturating_sub(n);
        self.history.iter().skip(skip).collect()
    }

    /// Statistics for the most recent transmission, if any.
    pub fn signal_stats(&self) -> Option<SignalStats> {
        let record = self.latest()?;
        if record.input.is_empty() {
            return None;
        }

        let (input_mean, input_std, input_min, input_max) = describe(&record.input);
        let (output_mean, output_std, output_min, output_max) = describe(&record.output);

        Some(SignalStats {
            input_mean,
            input_std,
            input_max,
            input_min,
            output_mean,
            output_std,
            output_max,
            output_min,
            snr_db: self.snr_db(record),
        })
    }

    fn snr_db(&self, record: &SignalRecord) -> f64 {
        let gain = 1.0 - self.config.attenuation;
        let n = record.input.len() as f64;

        let (signal_power, noise_power) = record.input.iter().zip(&record.output).fold(
            (0.0, 0.0),
            |(signal, noise), (&input, &output)| {
                let expected = input * gain;
                let residual = output - expected;
                (signal + expected * expected, noise + residual * residual)
            },
        );

        if noise_power == 0.0 {
            return f64::INFINITY;
        }
        10.0 * ((signal_power / n) / (noise_power / n)).log10()
    }

    fn record(&mut self, input: &[f64], output: &[f64]) {
        let capacity = self.config.history_size;
        let stored = capacity > 0;
        if stored {
            while self.history.len() >= capacity {
                self.history.pop_front();
            }
            self.history.push_back(SignalRecord {
                input: input.to_vec(),
                output: output.to_vec(),
            });
        }

        if self.config.debug_mode {
            if let Some(observer) = &self.observer {
                let index = stored.then(|| self.history.len() - 1);
                observer.observe(input, output, index);
            }
        }
    }
}

impl fmt::Debug for Cable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cable")
            .field("config", &self.config)
            .field("history_len", &self.history.len())
            .field("transmissions", &self.transmissions)
            .finish()
    }
}

impl fmt::Display for Cable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cable(length={}m, attenuation={}, noise_level={}, debug={})",
            self.config.length, self.config.attenuation, self.config.noise_level, self.config.debug_mode
        )
    }
}

/// Mean, population standard deviation, min and max of a non-empty slice.
fn describe(samples: &[f64]) -> (f64, f64, f64, f64) {
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let variance = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (mean, variance.sqrt(), min, max)
}
