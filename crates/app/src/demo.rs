//! Demonstration scenarios.
//!
//! Each scenario builds its own cable from the resolved [`Config`], so
//! scenarios never share noise state or history.

use std::sync::{Arc, Barrier};
use std::thread;

use anyhow::Context;
use tracing::{info, warn};
use wiresim_core::bitio::{add_parity_bits, bits_to_string, string_to_bits, strip_parity_bits};
use wiresim_core::cable::Cable;
use wiresim_core::channel::PhysicalChannel;
use wiresim_core::modem::{demodulate, modulate};
use wiresim_core::{Address, Host, MultiHostNetwork, SendReport};

use crate::config::Config;
use crate::input_gen::generate_messages;
use crate::plot::{render_history, TextPlotter};

/// Build a cable with the configured seed and, for live plotting, an observer.
pub fn build_cable(config: &Config) -> anyhow::Result<Cable> {
    let cable = match config.seed {
        Some(seed) => Cable::seeded(config.cable, seed)?,
        None => Cable::new(config.cable)?,
    };

    Ok(if config.plot.live {
        cable.with_observer(Arc::new(TextPlotter::new(config.plot)))
    } else {
        cable
    })
}

pub fn build_network(config: &Config) -> anyhow::Result<MultiHostNetwork> {
    let channel = PhysicalChannel::new(build_cable(config)?, config.modem)?;
    Ok(MultiHostNetwork::from_channel(channel))
}

/// Print the most recent waveforms when plotting is enabled.
pub fn plot_recent(network: &MultiHostNetwork, config: &Config, label: &str) -> anyhow::Result<()> {
    if !config.plot.enabled {
        return Ok(());
    }
    let text = network
        .channel()
        .with_cable(|cable| render_history(cable, &config.plot))?;
    println!("--- {label} ---");
    println!("{text}");
    Ok(())
}

/// Single link without addressing: text -> parity -> waveform -> cable and back.
///
/// `flip_bit` corrupts one received bit to show parity detection.
pub fn run_p2p(config: &Config, message: &str, flip_bit: Option<usize>) -> anyhow::Result<()> {
    println!("=== Point-to-point link ===");
    let mut cable = build_cable(config)?;

    let data_bits = string_to_bits(message)?;
    let protected = add_parity_bits(&data_bits)?;
    let signal = modulate(&protected, &config.modem);

    thread::sleep(cable.propagation_delay());
    let received_signal = cable.transmit(&signal);

    let mut received = demodulate(&received_signal, &config.modem)?;
    if let Some(index) = flip_bit {
        let len = received.len();
        match received.get_mut(index) {
            Some(bit) => *bit = !*bit,
            None => warn!(index, len, "flip index out of range"),
        }
    }

    println!("Sent: {message}");
    match strip_parity_bits(&received).and_then(|bits| bits_to_string(&bits)) {
        Ok(text) => println!("Received: {text}"),
        Err(e) => println!("Parity check failed, transmission error detected: {e}"),
    }

    if let Some(stats) = cable.signal_stats() {
        println!(
            "Input mean {:.3} std {:.3} | output mean {:.3} std {:.3} | SNR {:.1} dB",
            stats.input_mean, stats.input_std, stats.output_mean, stats.output_std, stats.snr_db
        );
    }
    if config.plot.enabled && !config.plot.live {
        println!("{}", render_history(&cable, &config.plot));
    }
    Ok(())
}

/// Register hosts `1..=count` in order.
pub fn setup_hosts(network: &MultiHostNetwork, count: u8) -> anyhow::Result<Vec<Host>> {
    (1..=count)
        .map(|address| {
            network
                .register_host(address)
                .with_context(|| format!("registering host {address}"))
        })
        .collect()
}

/// Two unicast messages: A to B, then B to C.
pub fn run_unicast(config: &Config) -> anyhow::Result<()> {
    println!("=== Unicast messages ===");
    let network = build_network(config)?;
    let hosts = setup_hosts(&network, 3)?;
    let (a, b, c) = (&hosts[0], &hosts[1], &hosts[2]);

    report(&a.send(b.address(), "Hello B, this is A.")?);
    print_last(b, "B");
    report(&b.send(c.address(), "Hi C, B here.")?);
    print_last(c, "C");

    plot_recent(&network, config, "unicast hops (host -> router, router -> host)")
}

/// One broadcast from A, reported per target.
pub fn run_broadcast(config: &Config, message: &str) -> anyhow::Result<()> {
    println!("=== Broadcast ===");
    let network = build_network(config)?;
    let hosts = setup_hosts(&network, 3)?;

    let sent = hosts[0].send(Address::BROADCAST, message)?;
    report(&sent);
    for (host, name) in hosts.iter().zip(["A", "B", "C"]) {
        print_last(host, name);
    }

    plot_recent(&network, config, "broadcast")
}

/// Every host sends to the next one at the same moment.
///
/// The channel lock serializes the transmissions, so every message arrives.
pub fn run_concurrent(
    config: &Config,
    host_count: u8,
    per_host: usize,
    message_len: usize,
) -> anyhow::Result<()> {
    println!("=== Concurrent transmissions ({host_count} hosts) ===");
    let network = build_network(config)?;
    let hosts = setup_hosts(&network, host_count)?;
    let barrier = Arc::new(Barrier::new(hosts.len()));
    let seed = config.seed.unwrap_or_default();

    let handles: Vec<_> = hosts
        .iter()
        .cloned()
        .map(|host| {
            let barrier = Arc::clone(&barrier);
            let next = Address::new(host.address().value() % host_count + 1);
            let messages = generate_messages(
                seed.wrapping_add(u64::from(host.address().value())),
                per_host,
                message_len,
            );
            thread::spawn(move || {
                barrier.wait();
                messages
                    .iter()
                    .map(|message| host.send(next, message))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        let results = handle
            .join()
            .map_err(|_| anyhow::anyhow!("sender thread panicked"))?;
        for result in results {
            match result {
                Ok(sent) => report(&sent),
                Err(e) => warn!(error = %e, "send failed"),
            }
        }
    }

    for host in &hosts {
        for message in host.take_inbox() {
            println!(
                "{} received from {}: {}",
                host.address(),
                message.src,
                message.text()
            );
        }
    }
    info!(
        transmissions = network.channel().transmissions(),
        "concurrent run finished"
    );

    let mut metrics = network.router().metrics();
    metrics.complete();
    metrics.print_summary();

    plot_recent(&network, config, "after concurrent transmissions")
}

fn report(sent: &SendReport) {
    for outcome in &sent.outcomes {
        match &outcome.result {
            Ok(()) => info!(src = %sent.src, target = %outcome.target, "delivered"),
            Err(e) => println!(
                "{} -> {}: delivery failed: {e}",
                sent.src, outcome.target
            ),
        }
    }
}

fn print_last(host: &Host, name: &str) {
    match host.last_received() {
        Some(message) => println!(
            "{name} received from {}: {}",
            message.src,
            message.text()
        ),
        None => println!("{name} received nothing"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiresim_core::cable::CableConfig;

    fn quiet_config() -> Config {
        Config {
            seed: Some(42),
            cable: CableConfig::ideal(10.0),
            ..Config::default()
        }
    }

    #[test]
    fn test_build_network_uses_config() {
        let config = quiet_config();
        let network = build_network(&config).unwrap();
        assert_eq!(network.channel().modem(), &config.modem);

        let hosts = setup_hosts(&network, 3).unwrap();
        assert_eq!(network.router().hosts().unwrap().len(), 3);
        assert_eq!(hosts[2].address(), Address::new(3));
    }

    #[test]
    fn test_scenarios_run() {
        let config = quiet_config();
        run_p2p(&config, "hello", None).unwrap();
        run_p2p(&config, "hello", Some(3)).unwrap();
        run_unicast(&config).unwrap();
        run_broadcast(&config, "all hands").unwrap();
        run_concurrent(&config, 4, 2, 12).unwrap();
    }

    #[test]
    fn test_p2p_rejects_unencodable() {
        assert!(run_p2p(&quiet_config(), "\u{1F600}", None).is_err());
    }
}
