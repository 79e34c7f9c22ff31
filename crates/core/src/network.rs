//! Multi-host network setup.
//!
//! [`MultiHostNetwork`] wires one cable, one modem configuration and one
//! router into a ready-to-use shared bus. It owns no behavior of its own;
//! everything goes through the [`Router`] it creates.
//!
//! # Determinism
//!
//! With `seed` set, the cable's noise is drawn from a seeded ChaCha8 RNG and
//! single-threaded runs are bit-identical. Concurrent senders still interleave
//! in lock-acquisition order, which the scheduler decides.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::address::Address;
use crate::bitio::string_to_bytes;
use crate::cable::{Cable, CableConfig};
use crate::channel::PhysicalChannel;
use crate::error::Result;
use crate::host::Host;
use crate::modem::ModemConfig;
use crate::router::{Router, SendReport};

/// Configuration for a whole bus.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub cable: CableConfig,
    pub modem: ModemConfig,

    /// Noise seed (None = entropy)
    pub seed: Option<u64>,
}

impl NetworkConfig {
    /// A noiseless, lossless bus with the default modem.
    pub fn perfect(seed: u64) -> Self {
        Self {
            cable: CableConfig::ideal(CableConfig::default().length),
            modem: ModemConfig::default(),
            seed: Some(seed),
        }
    }

    /// Default cable impairments with reproducible noise.
    pub fn default_with_seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }
}

/// A shared bus with its router.
#[derive(Debug, Clone)]
pub struct MultiHostNetwork {
    router: Arc<Router>,
}

impl MultiHostNetwork {
    /// # Errors
    /// `Error::Config` if the cable or modem configuration is invalid.
    pub fn new(config: NetworkConfig) -> Result<Self> {
        let cable = match config.seed {
            Some(seed) => Cable::seeded(config.cable, seed)?,
            None => Cable::new(config.cable)?,
        };
        let channel = PhysicalChannel::new(cable, config.modem)?;

        info!(
            length = config.cable.length,
            attenuation = config.cable.attenuation,
            noise_level = config.cable.noise_level,
            samples_per_bit = config.modem.samples_per_bit,
            "network created"
        );
        Ok(Self::from_channel(channel))
    }

    /// Build on a prepared channel, e.g. one with an observer or test clock.
    pub fn from_channel(channel: PhysicalChannel) -> Self {
        Self {
            router: Router::new(Arc::new(channel)),
        }
    }

    /// # Errors
    /// `AddressError::Invalid` for 255, `AddressError::Duplicate` if taken.
    pub fn register_host(&self, address: u8) -> Result<Host> {
        self.router.register_host(Address::new(address))
    }

    /// Send text from `src` to `dst` (255 for broadcast).
    pub fn send_message(&self, src: u8, dst: u8, message: &str) -> Result<SendReport> {
        let data = string_to_bytes(message)?;
        self.router
            .send_from_host(Address::new(src), Address::new(dst), &data)
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn channel(&self) -> &Arc<PhysicalChannel> {
        self.router.channel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AddressError, CodecError, Error};

    #[test]
    fn test_perfect_network() {
        let network = MultiHostNetwork::new(NetworkConfig::perfect(42)).unwrap();
        let a = network.register_host(1).unwrap();
        let b = network.register_host(2).unwrap();

        let report = network.send_message(1, 2, "hello").unwrap();
        assert!(report.all_delivered());
        assert_eq!(b.last_received().unwrap().text(), "hello");
        assert!(a.last_received().is_none());
        assert_eq!(network.channel().transmissions(), 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = NetworkConfig::perfect(1);
        config.cable.attenuation = 1.5;
        assert!(matches!(
            MultiHostNetwork::new(config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_register_broadcast_rejected() {
        let network = MultiHostNetwork::new(NetworkConfig::perfect(1)).unwrap();
        assert!(matches!(
            network.register_host(255),
            Err(Error::Address(AddressError::Invalid(255)))
        ));
    }

    #[test]
    fn test_unencodable_message() {
        let network = MultiHostNetwork::new(NetworkConfig::perfect(1)).unwrap();
        network.register_host(1).unwrap();
        network.register_host(2).unwrap();

        assert!(matches!(
            network.send_message(1, 2, "snow \u{2603}"),
            Err(Error::Codec(CodecError::Encoding { .. }))
        ));
        assert_eq!(network.channel().transmissions(), 0);
    }

    #[test]
    fn test_determinism() {
        let run = || {
            let network =
                MultiHostNetwork::new(NetworkConfig::default_with_seed(12345)).unwrap();
            network.register_host(1).unwrap();
            network.register_host(2).unwrap();
            network.send_message(1, 2, "same noise").unwrap();
            network
                .channel()
                .with_cable(|c| c.latest().map(|r| r.output.clone()))
                .unwrap()
                .unwrap()
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn test_config_from_toml() {
        let config: NetworkConfig = toml::from_str(
            r#"
            seed = 7

            [cable]
            length = 250.0
            noise_level = 0.0

            [modem]
            samples_per_bit = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.seed, Some(7));
        assert_eq!(config.cable.length, 250.0);
        assert_eq!(config.cable.attenuation, CableConfig::default().attenuation);
        assert_eq!(config.modem.samples_per_bit, 8);
        assert_eq!(config.modem.threshold, ModemConfig::default().threshold);
    }
}
