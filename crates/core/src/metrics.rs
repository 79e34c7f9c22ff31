//! Link-level counters for observing router behavior.
//!
//! Tracks what happened to every send: how many hops crossed the medium,
//! how many deliveries succeeded, and why the others failed.
//!
//! # Thread Safety
//!
//! `LinkMetrics` is a plain struct. The router keeps it behind a `Mutex` and
//! hands out snapshots via `Clone`.

use std::time::{Duration, Instant};

use crate::error::{CodecError, Error, FrameError};

/// Counters for one router.
#[derive(Debug, Clone)]
pub struct LinkMetrics {
    // === Timing ===
    pub start_time: Instant,
    pub end_time: Option<Instant>,

    // === Sends ===
    /// Send requests received from hosts
    pub sends_requested: u64,

    /// Sends rejected by address validation before touching the medium
    pub sends_rejected: u64,

    /// Sends lost on the host-to-router hop
    pub uplink_failures: u64,

    // === Medium ===
    /// Frames carried across the medium (uplink and downlink)
    pub hops_transmitted: u64,

    /// Bits put on the wire across all hops
    pub wire_bits: u64,

    // === Deliveries ===
    pub deliveries_succeeded: u64,
    pub deliveries_failed: u64,

    /// Payload bytes handed to destination hosts
    pub payload_bytes_delivered: u64,

    // === Failure causes (any hop) ===
    pub parity_failures: u64,
    pub frame_failures: u64,
    pub misaddressed_frames: u64,
}

impl LinkMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            end_time: None,
            sends_requested: 0,
            sends_rejected: 0,
            uplink_failures: 0,
            hops_transmitted: 0,
            wire_bits: 0,
            deliveries_succeeded: 0,
            deliveries_failed: 0,
            payload_bytes_delivered: 0,
            parity_failures: 0,
            frame_failures: 0,
            misaddressed_frames: 0,
        }
    }

    /// Mark the measurement window as closed.
    pub fn complete(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Get total duration (or current elapsed if not complete).
    pub fn duration(&self) -> Duration {
        match self.end_time {
            Some(end) => end.duration_since(self.start_time),
            None => self.start_time.elapsed(),
        }
    }

    /// Count one frame crossing the medium.
    pub fn record_hop(&mut self, bits: usize) {
        self.hops_transmitted += 1;
        self.wire_bits += bits as u64;
    }

    pub fn record_delivery(&mut self, payload_bytes: usize) {
        self.deliveries_succeeded += 1;
        self.payload_bytes_delivered += payload_bytes as u64;
    }

    /// Count a failed delivery and classify its cause.
    pub fn record_delivery_failure(&mut self, error: &Error) {
        self.deliveries_failed += 1;
        self.classify(error);
    }

    pub fn record_uplink_failure(&mut self, error: &Error) {
        self.uplink_failures += 1;
        self.classify(error);
    }

    fn classify(&mut self, error: &Error) {
        match error {
            Error::Codec(CodecError::Parity { .. }) => self.parity_failures += 1,
            Error::Frame(FrameError::Misaddressed { .. }) => self.misaddressed_frames += 1,
            Error::Frame(_) | Error::Codec(_) | Error::Shape(_) => self.frame_failures += 1,
            Error::Address(_) | Error::Config(_) | Error::Channel(_) | Error::Registry(_) => {}
        }
    }

    /// Successful deliveries over attempted deliveries.
    pub fn delivery_rate(&self) -> f64 {
        let attempted = self.deliveries_succeeded + self.deliveries_failed;
        if attempted == 0 {
            0.0
        } else {
            self.deliveries_succeeded as f64 / attempted as f64
        }
    }

    /// Hops that failed the parity check over hops carried.
    pub fn parity_error_rate(&self) -> f64 {
        if self.hops_transmitted == 0 {
            0.0
        } else {
            self.parity_failures as f64 / self.hops_transmitted as f64
        }
    }

    /// Delivered payload in bits per second.
    pub fn payload_bps(&self) -> f64 {
        let secs = self.duration().as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.payload_bytes_delivered as f64 * 8.0 / secs
        }
    }

    /// Wire bits in bits per second.
    pub fn wire_bps(&self) -> f64 {
        let secs = self.duration().as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.wire_bits as f64 / secs
        }
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n=== Link Summary ===");
        println!("Duration: {} ms", self.duration().as_millis());
        println!();

        println!("=== Sends ===");
        println!("Requested: {}", self.sends_requested);
        println!("Rejected: {}", self.sends_rejected);
        println!("Uplink failures: {}", self.uplink_failures);
        println!();

        println!("=== Medium ===");
        println!("Hops: {}", self.hops_transmitted);
        println!("Wire bits: {}", self.wire_bits);
        println!();

        println!("=== Deliveries ===");
        println!("Succeeded: {}", self.deliveries_succeeded);
        println!("Failed: {}", self.deliveries_failed);
        println!("Delivery rate: {:.2}%", self.delivery_rate() * 100.0);
        println!("Parity failures: {}", self.parity_failures);
        println!("Frame failures: {}", self.frame_failures);
        println!("Misaddressed: {}", self.misaddressed_frames);
        println!();

        println!("=== Throughput ===");
        println!("Payload: {:.3} kb/s", self.payload_bps() / 1000.0);
        println!("On wire: {:.3} kb/s", self.wire_bps() / 1000.0);
        println!();
    }

    /// Export metrics as a simple text format (for parsing/testing).
    pub fn export_text(&self) -> String {
        format!(
            "duration_ms={}\n\
             sends_requested={}\n\
             sends_rejected={}\n\
             uplink_failures={}\n\
             hops_transmitted={}\n\
             wire_bits={}\n\
             deliveries_succeeded={}\n\
             deliveries_failed={}\n\
             delivery_rate={:.4}\n\
             parity_failures={}\n\
             frame_failures={}\n\
             misaddressed_frames={}\n",
            self.duration().as_millis(),
            self.sends_requested,
            self.sends_rejected,
            self.uplink_failures,
            self.hops_transmitted,
            self.wire_bits,
            self.deliveries_succeeded,
            self.deliveries_failed,
            self.delivery_rate(),
            self.parity_failures,
            self.frame_failures,
            self.misaddressed_frames,
        )
    }
}

impl Default for LinkMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AddressError, ShapeError};

    #[test]
    fn test_metrics_creation() {
        let metrics = LinkMetrics::new();
        assert!(metrics.end_time.is_none());
        assert_eq!(metrics.delivery_rate(), 0.0);
        assert_eq!(metrics.parity_error_rate(), 0.0);
    }

    #[test]
    fn test_delivery_rate() {
        let mut metrics = LinkMetrics::new();
        for _ in 0..3 {
            metrics.record_delivery(5);
        }
        metrics.record_delivery_failure(&CodecError::Parity { group: 0 }.into());

        assert_eq!(metrics.delivery_rate(), 0.75);
        assert_eq!(metrics.payload_bytes_delivered, 15);
        assert_eq!(metrics.parity_failures, 1);
    }

    #[test]
    fn test_failure_classification() {
        let mut metrics = LinkMetrics::new();
        metrics.record_delivery_failure(
            &FrameError::LengthMismatch {
                declared: 4,
                actual_bits: 10,
            }
            .into(),
        );
        metrics.record_delivery_failure(
            &FrameError::Misaddressed {
                host: 1,
                frame_dst: 2,
            }
            .into(),
        );
        metrics.record_uplink_failure(&ShapeError::ZeroSamplesPerBit.into());
        metrics.record_uplink_failure(&AddressError::Unknown(3).into());

        assert_eq!(metrics.frame_failures, 2);
        assert_eq!(metrics.misaddressed_frames, 1);
        assert_eq!(metrics.uplink_failures, 2);
        assert_eq!(metrics.deliveries_failed, 2);
        assert_eq!(metrics.parity_failures, 0);
    }

    #[test]
    fn test_hops_and_parity_rate() {
        let mut metrics = LinkMetrics::new();
        for _ in 0..10 {
            metrics.record_hop(41);
        }
        metrics.record_delivery_failure(&CodecError::Parity { group: 2 }.into());

        assert_eq!(metrics.wire_bits, 410);
        assert_eq!(metrics.parity_error_rate(), 0.1);
    }

    #[test]
    fn test_throughput() {
        let mut metrics = LinkMetrics::new();
        metrics.record_delivery(1000);
        metrics.record_hop(9000);

        std::thread::sleep(Duration::from_millis(10));
        metrics.complete();

        assert!(metrics.payload_bps() > 0.0);
        assert!(metrics.wire_bps() > metrics.payload_bps());
    }

    #[test]
    fn test_export_text() {
        let mut metrics = LinkMetrics::new();
        metrics.sends_requested = 4;
        metrics.record_hop(100);
        metrics.record_delivery(2);

        let text = metrics.export_text();
        assert!(text.contains("sends_requested=4"));
        assert!(text.contains("hops_transmitted=1"));
        assert!(text.contains("deliveries_succeeded=1"));
        assert!(text.contains("delivery_rate=1.0000"));
    }
}
