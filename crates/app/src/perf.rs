//! Latency and throughput measurement over a two-host bus.
//!
//! Every send crosses the medium twice (uplink and downlink), so on-wire
//! throughput counts each frame twice.

use std::time::{Duration, Instant};

use tracing::warn;
use wiresim_core::bitio::string_to_bytes;
use wiresim_core::error::{CodecError, Error};
use wiresim_core::frame::Frame;
use wiresim_core::MultiHostNetwork;

use crate::config::Config;
use crate::demo::{build_network, plot_recent, setup_hosts};

/// One-way wall-clock latency of repeated sends.
#[derive(Debug, Clone, Copy)]
pub struct LatencyStats {
    pub trials: usize,
    pub min: Duration,
    pub avg: Duration,
    pub max: Duration,

    /// Sends that did not reach the destination
    pub failures: usize,
}

/// Sequential-send throughput.
#[derive(Debug, Clone, Copy)]
pub struct ThroughputStats {
    pub iterations: usize,
    pub elapsed: Duration,
    pub payload_bits: u64,
    pub wire_bits: u64,
    pub failures: usize,
}

impl ThroughputStats {
    pub fn payload_bps(&self) -> f64 {
        per_second(self.payload_bits, self.elapsed)
    }

    pub fn wire_bps(&self) -> f64 {
        per_second(self.wire_bits, self.elapsed)
    }
}

fn per_second(bits: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs == 0.0 {
        0.0
    } else {
        bits as f64 / secs
    }
}

/// Time `trials` sends of `message` from `src` to `dst`.
pub fn measure_latency(
    network: &MultiHostNetwork,
    src: u8,
    dst: u8,
    message: &str,
    trials: usize,
) -> anyhow::Result<LatencyStats> {
    anyhow::ensure!(trials > 0, "at least one trial is required");

    let mut durations = Vec::with_capacity(trials);
    let mut failures = 0;
    for _ in 0..trials {
        let start = Instant::now();
        let delivered = send_counted(network, src, dst, message)?;
        durations.push(start.elapsed());
        if !delivered {
            failures += 1;
        }
    }

    let total: Duration = durations.iter().sum();
    Ok(LatencyStats {
        trials,
        min: durations.iter().copied().min().unwrap_or_default(),
        avg: total / trials as u32,
        max: durations.iter().copied().max().unwrap_or_default(),
        failures,
    })
}

/// Send `message` `iterations` times back to back.
pub fn measure_throughput(
    network: &MultiHostNetwork,
    src: u8,
    dst: u8,
    message: &str,
    iterations: usize,
) -> anyhow::Result<ThroughputStats> {
    let payload_len = string_to_bytes(message)?.len();
    let frame_bits = Frame::wire_bits(payload_len) as u64;

    let mut failures = 0;
    let start = Instant::now();
    for _ in 0..iterations {
        if !send_counted(network, src, dst, message)? {
            failures += 1;
        }
    }
    let elapsed = start.elapsed();

    Ok(ThroughputStats {
        iterations,
        elapsed,
        payload_bits: payload_len as u64 * 8 * iterations as u64,
        wire_bits: frame_bits * 2 * iterations as u64,
        failures,
    })
}

/// Send once; corruption counts as a failed delivery, caller errors abort.
fn send_counted(network: &MultiHostNetwork, src: u8, dst: u8, message: &str) -> anyhow::Result<bool> {
    match network.send_message(src, dst, message) {
        Ok(report) => Ok(report.all_delivered()),
        Err(e @ (Error::Address(_) | Error::Codec(CodecError::Encoding { .. }))) => Err(e.into()),
        Err(e) => {
            warn!(error = %e, "uplink failed");
            Ok(false)
        }
    }
}

/// Run the full performance scenario and print results.
pub fn run_perf(config: &Config, trials: usize, iterations: usize, message: &str) -> anyhow::Result<()> {
    println!("=== Performance ===");
    let network = build_network(config)?;
    let hosts = setup_hosts(&network, 2)?;
    let (src, dst) = (hosts[0].address().value(), hosts[1].address().value());

    println!(
        "Per-hop propagation delay: {:.6} s (length={} m)",
        network.channel().propagation_delay()?.as_secs_f64(),
        config.cable.length
    );

    // Warm up so the first send does not skew the numbers
    send_counted(&network, src, dst, "warmup")?;

    let latency = measure_latency(&network, src, dst, "ping", trials)?;
    let throughput = measure_throughput(&network, src, dst, message, iterations)?;

    println!("\nLatency (one-way, wall clock, {} trials):", latency.trials);
    println!("  avg: {:.3} ms", latency.avg.as_secs_f64() * 1000.0);
    println!("  min: {:.3} ms", latency.min.as_secs_f64() * 1000.0);
    println!("  max: {:.3} ms", latency.max.as_secs_f64() * 1000.0);
    println!("  failed: {}", latency.failures);

    println!("\nThroughput ({} sequential sends):", throughput.iterations);
    println!("  payload: {:.3} Mb/s", throughput.payload_bps() / 1e6);
    println!("  on-wire: {:.3} Mb/s", throughput.wire_bps() / 1e6);
    println!(
        "  {:.1} KB payload in {:.3} s",
        throughput.payload_bits as f64 / 8.0 / 1024.0,
        throughput.elapsed.as_secs_f64()
    );
    println!("  failed: {}", throughput.failures);
    println!(
        "  medium busy: {:.3} s",
        network.channel().busy_time().as_secs_f64()
    );

    let mut metrics = network.router().metrics();
    metrics.complete();
    metrics.print_summary();

    plot_recent(&network, config, "last hops")
}
