//! wiresim: shared-medium network simulator.
//!
//! # Usage
//!
//! ```text
//! wiresim [OPTIONS] <COMMAND>
//!
//! Commands:
//!   p2p          Single link with parity check, no addressing
//!   unicast      Two addressed messages through the router
//!   broadcast    One message to every other host
//!   concurrent   All hosts send at once on the shared cable
//!   perf         Latency and throughput measurement
//! ```
//!
//! Logging is controlled by `RUST_LOG` (default `info`).

mod config;
mod demo;
mod input_gen;
mod perf;
mod plot;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{Config, Overrides};

#[derive(Debug, Parser)]
#[command(
    name = "wiresim",
    about = "Simulate hosts sharing one noisy cable",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    overrides: Overrides,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Single link with parity check, no addressing
    P2p {
        #[arg(
            default_value = "Hello, this is the wire speaking. Data communication is achieved through our efforts!"
        )]
        message: String,

        /// Flip one received bit to demonstrate parity detection
        #[arg(long)]
        flip_bit: Option<usize>,
    },

    /// Two addressed messages through the router
    Unicast,

    /// One message from host 1 to every other host
    Broadcast {
        #[arg(default_value = "Hello everyone, this is A.")]
        message: String,
    },

    /// All hosts send to their neighbour at once
    Concurrent {
        /// Number of hosts
        #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(2..=254))]
        hosts: u8,

        /// Messages sent by each host
        #[arg(long, default_value_t = 1)]
        messages: usize,

        /// Characters per generated message
        #[arg(long, default_value_t = 24)]
        message_len: usize,
    },

    /// Latency and throughput measurement
    Perf {
        /// Sends timed for latency
        #[arg(long, default_value_t = 50)]
        trials: usize,

        /// Sends timed for throughput
        #[arg(long, default_value_t = 50)]
        iterations: usize,

        /// Throughput payload
        #[arg(long, default_value_t = "Performance test payload ".repeat(40))]
        message: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::resolve(&cli.overrides)?;

    if cli.overrides.print_config {
        config.print();
    }
    info!(seed = ?config.seed, "wiresim starting");

    match &cli.command {
        Command::P2p { message, flip_bit } => demo::run_p2p(&config, message, *flip_bit),
        Command::Unicast => demo::run_unicast(&config),
        Command::Broadcast { message } => demo::run_broadcast(&config, message),
        Command::Concurrent {
            hosts,
            messages,
            message_len,
        } => demo::run_concurrent(&config, *hosts, *messages, *message_len),
        Command::Perf {
            trials,
            iterations,
            message,
        } => perf::run_perf(&config, *trials, *iterations, message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["wiresim", "unicast", "--seed", "7", "--noise", "0"]);
        assert!(matches!(cli.command, Command::Unicast));
        assert_eq!(cli.overrides.seed, Some(7));
        assert_eq!(cli.overrides.noise, Some(0.0));
    }

    #[test]
    fn test_p2p_defaults() {
        let cli = Cli::parse_from(["wiresim", "p2p"]);
        match cli.command {
            Command::P2p { message, flip_bit } => {
                assert!(message.starts_with("Hello"));
                assert_eq!(flip_bit, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_concurrent_host_range() {
        assert!(Cli::try_parse_from(["wiresim", "concurrent", "--hosts", "255"]).is_err());
        assert!(Cli::try_parse_from(["wiresim", "concurrent", "--hosts", "1"]).is_err());

        let cli = Cli::try_parse_from(["wiresim", "concurrent", "--hosts", "5"]).unwrap();
        assert!(matches!(cli.command, Command::Concurrent { hosts: 5, .. }));
    }

    #[test]
    fn test_perf_default_payload() {
        let cli = Cli::parse_from(["wiresim", "perf", "--trials", "3"]);
        match cli.command {
            Command::Perf {
                trials, message, ..
            } => {
                assert_eq!(trials, 3);
                assert_eq!(message.len(), 25 * 40);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
