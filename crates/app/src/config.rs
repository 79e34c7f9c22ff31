//! Configuration for the wiresim application.
//!
//! Values come from three layers, later ones winning:
//! 1. Built-in defaults of the core crate
//! 2. An optional TOML file (`--config`)
//! 3. Command-line flags
//!
//! # Philosophy
//!
//! The tool should work with ZERO arguments, using sensible defaults.
//! The seed is always resolved and printed so runs are reproducible.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use serde::{Deserialize, Serialize};
use wiresim_core::cable::CableConfig;
use wiresim_core::modem::ModemConfig;
use wiresim_core::NetworkConfig;

/// Text plotter settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    /// Plot the most recent transmissions after each demo
    pub enabled: bool,

    /// Also plot every transmission as it happens
    pub live: bool,

    /// Plot columns
    pub width: usize,

    /// Plot rows per waveform
    pub height: usize,

    /// Samples considered per waveform, from the start
    pub max_samples: usize,

    /// Transmissions shown in the end-of-run summary
    pub recent: usize,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            live: false,
            width: 72,
            height: 8,
            max_samples: 1000,
            recent: 2,
        }
    }
}

/// Complete configuration for a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Noise seed (resolved to a concrete value before use)
    pub seed: Option<u64>,

    pub cable: CableConfig,
    pub modem: ModemConfig,
    pub plot: PlotConfig,
}

/// Command-line overrides, flattened into the top-level parser.
#[derive(Debug, Clone, Default, Args)]
pub struct Overrides {
    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Random seed for reproducible noise
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Cable length in meters
    #[arg(long, global = true)]
    pub length: Option<f64>,

    /// Fractional amplitude loss, 0.0-1.0
    #[arg(long, global = true)]
    pub attenuation: Option<f64>,

    /// Noise standard deviation per sample
    #[arg(long, global = true)]
    pub noise: Option<f64>,

    /// Signal speed in meters per second
    #[arg(long, global = true)]
    pub speed: Option<f64>,

    /// Samples rendered per bit
    #[arg(long, global = true)]
    pub samples_per_bit: Option<usize>,

    /// Plot the most recent waveforms after each demo
    #[arg(long, global = true)]
    pub plot: bool,

    /// Plot every waveform as it crosses the cable
    #[arg(long, global = true)]
    pub plot_live: bool,

    /// Print the resolved configuration
    #[arg(long, global = true)]
    pub print_config: bool,
}

impl Config {
    /// Read a TOML file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Merge file and flags, then resolve the seed and validate.
    pub fn resolve(overrides: &Overrides) -> anyhow::Result<Self> {
        let mut config = match &overrides.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply(overrides);

        // Determine seed (explicit or time-based)
        if config.seed.is_none() {
            config.seed = Some(time_seed());
        }

        config.cable.validate().context("invalid cable configuration")?;
        config.modem.validate().context("invalid modem configuration")?;
        Ok(config)
    }

    /// Apply command-line values on top of the current ones.
    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(seed) = overrides.seed {
            self.seed = Some(seed);
        }
        if let Some(length) = overrides.length {
            self.cable.length = length;
        }
        if let Some(attenuation) = overrides.attenuation {
            self.cable.attenuation = attenuation;
        }
        if let Some(noise) = overrides.noise {
            self.cable.noise_level = noise;
        }
        if let Some(speed) = overrides.speed {
            self.cable.propagation_speed = speed;
        }
        if let Some(samples_per_bit) = overrides.samples_per_bit {
            self.modem.samples_per_bit = samples_per_bit;
        }
        if overrides.plot {
            self.plot.enabled = true;
        }
        if overrides.plot_live {
            self.plot.enabled = true;
            self.plot.live = true;
        }

        // The cable only notifies observers in debug mode
        if self.plot.live {
            self.cable.debug_mode = true;
        }
    }

    pub fn network(&self) -> NetworkConfig {
        NetworkConfig {
            cable: self.cable,
            modem: self.modem,
            seed: self.seed,
        }
    }

    /// Print the configuration in human-readable form.
    pub fn print(&self) {
        println!("=== Configuration ===");
        match self.seed {
            Some(seed) => println!("Seed: {}", seed),
            None => println!("Seed: (entropy)"),
        }
        println!();
        println!("=== Cable ===");
        println!("Length: {} m", self.cable.length);
        println!("Attenuation: {:.2}%", self.cable.attenuation * 100.0);
        println!("Noise level: {}", self.cable.noise_level);
        println!("Propagation speed: {:e} m/s", self.cable.propagation_speed);
        println!(
            "Propagation delay: {:.3} us",
            self.cable.propagation_delay().as_secs_f64() * 1e6
        );
        println!("History size: {}", self.cable.history_size);
        println!();
        println!("=== Modem ===");
        println!("Samples per bit: {}", self.modem.samples_per_bit);
        println!(
            "Amplitudes: high {} / low {}",
            self.modem.amplitude_high, self.modem.amplitude_low
        );
        println!("Threshold: {}", self.modem.threshold);
        println!();
    }
}

fn time_seed() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
