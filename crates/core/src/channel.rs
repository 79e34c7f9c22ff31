//! The shared physical channel.
//!
//! Composes modulation, the cable and demodulation behind a single lock so
//! that exactly one transmission is on the medium at a time. Collisions are
//! avoided by construction: concurrent senders queue on the lock instead of
//! overlapping on the wire.
//!
//! # Transmission Sequence
//!
//! ```text
//! acquire medium
//!   modulate -> cable.transmit -> demodulate
//!   wait propagation delay
//! release medium
//! ```
//!
//! The propagation delay is spent on the medium, so completion order matches
//! lock acquisition order. The guard is released on every exit path,
//! including a demodulation error.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::bitio::Bit;
use crate::cable::Cable;
use crate::error::{Error, Result};
use crate::modem::{demodulate, modulate, ModemConfig};

/// Time source for propagation-delay simulation.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    /// Block the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Wall-clock time and real thread sleeps.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// A mutually exclusive transmission medium.
///
/// # Thread Safety
/// `PhysicalChannel` is `Sync`; share it with `Arc` and call
/// [`transmit_bits`](Self::transmit_bits) from any number of threads.
pub struct PhysicalChannel {
    medium: Mutex<Cable>,
    modem: ModemConfig,
    clock: Arc<dyn Clock>,
    transmissions: AtomicU64,
    busy_nanos: AtomicU64,
}

impl PhysicalChannel {
    /// # Errors
    /// `Error::Config` if the modem parameters are invalid.
    pub fn new(cable: Cable, modem: ModemConfig) -> Result<Self> {
        modem.validate()?;

        Ok(Self {
            medium: Mutex::new(cable),
            modem,
            clock: Arc::new(SystemClock),
            transmissions: AtomicU64::new(0),
            busy_nanos: AtomicU64::new(0),
        })
    }

    /// Replace the time source, e.g. with a test double.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn modem(&self) -> &ModemConfig {
        &self.modem
    }

    /// Carry a bit sequence across the medium.
    ///
    /// Holds the medium exclusively from modulation until the propagation
    /// delay has elapsed.
    ///
    /// # Errors
    /// - `Error::Channel` if a previous holder panicked
    /// - `ShapeError` from demodulation
    pub fn transmit_bits(&self, bits: &[Bit]) -> Result<Vec<Bit>> {
        let mut cable = self.acquire()?;
        let started = self.clock.now();

        let waveform = modulate(bits, &self.modem);
        let received = cable.transmit(&waveform);
        let recovered = demodulate(&received, &self.modem)?;

        let delay = cable.propagation_delay();
        self.clock.sleep(delay);

        let on_wire = self.clock.now().saturating_duration_since(started);
        let on_wire_nanos = u64::try_from(on_wire.as_nanos()).unwrap_or(u64::MAX);
        self.busy_nanos.fetch_add(on_wire_nanos, Ordering::SeqCst);

        let sequence = self.transmissions.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(
            sequence,
            bits = bits.len(),
            delay_us = delay.as_micros() as u64,
            on_wire_us = on_wire.as_micros() as u64,
            "transmission complete"
        );

        Ok(recovered)
    }

    /// Simulated wire latency of one transmission.
    pub fn propagation_delay(&self) -> Result<Duration> {
        Ok(self.acquire()?.propagation_delay())
    }

    /// Transmissions completed on this channel.
    pub fn transmissions(&self) -> u64 {
        self.transmissions.load(Ordering::SeqCst)
    }

    /// Total time the medium has been held by transmissions, per the clock.
    pub fn busy_time(&self) -> Duration {
        Duration::from_nanos(self.busy_nanos.load(Ordering::SeqCst))
    }

    /// Inspect the cable (history, statistics) while holding the medium.
    pub fn with_cable<R>(&self, f: impl FnOnce(&Cable) -> R) -> Result<R> {
        let cable = self.acquire()?;
        Ok(f(&cable))
    }

    fn acquire(&self) -> Result<MutexGuard<'_, Cable>> {
        self.medium
            .lock()
            .map_err(|_| Error::Channel("medium lock poisoned".into()))
    }
}

impl std::fmt::Debug for PhysicalChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicalChannel")
            .field("modem", &self.modem)
            .field("transmissions", &self.transmissions())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cable::CableConfig;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    /// Clock that never sleeps but tracks how many callers are inside
    /// `sleep` at once.
    #[derive(Default)]
    struct OverlapClock {
        active: AtomicUsize,
        max_active: AtomicUsize,
        total_slept: Mutex<Duration>,
    }

    impl Clock for OverlapClock {
        fn now(&self) -> Instant {
            Instant::now()
        }

        fn sleep(&self, duration: Duration) {
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(active, Ordering::SeqCst);
            thread::yield_now();
            *self.total_slept.lock().unwrap() += duration;
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Clock whose time only moves when something sleeps.
    struct ManualClock {
        origin: Instant,
        elapsed: Mutex<Duration>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                origin: Instant::now(),
                elapsed: Mutex::new(Duration::ZERO),
            }
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.origin + *self.elapsed.lock().unwrap()
        }

        fn sleep(&self, duration: Duration) {
            *self.elapsed.lock().unwrap() += duration;
        }
    }

    fn ideal_channel() -> PhysicalChannel {
        let cable = Cable::seeded(CableConfig::ideal(100.0), 1).unwrap();
        PhysicalChannel::new(cable, ModemConfig::default()).unwrap()
    }

    #[test]
    fn test_transmit_clean() {
        let channel = ideal_channel();
        let bits = vec![true, false, false, true, true];

        assert_eq!(channel.transmit_bits(&bits).unwrap(), bits);
        assert_eq!(channel.transmissions(), 1);
        assert_eq!(channel.with_cable(|c| c.history_len()).unwrap(), 1);
    }

    #[test]
    fn test_delay_goes_through_clock() {
        let clock = Arc::new(OverlapClock::default());
        let config = CableConfig {
            length: 500.0,
            propagation_speed: 1000.0,
            ..CableConfig::ideal(0.0)
        };
        let cable = Cable::seeded(config, 1).unwrap();
        let channel = PhysicalChannel::new(cable, ModemConfig::default())
            .unwrap()
            .with_clock(clock.clone());

        channel.transmit_bits(&[true]).unwrap();
        channel.transmit_bits(&[false]).unwrap();

        assert_eq!(*clock.total_slept.lock().unwrap(), Duration::from_secs(1));
        assert_eq!(channel.propagation_delay().unwrap(), Duration::from_millis(500));
    }

    #[test]
    fn test_busy_time_measured_by_clock() {
        let config = CableConfig {
            length: 250.0,
            propagation_speed: 1000.0,
            ..CableConfig::ideal(0.0)
        };
        let cable = Cable::seeded(config, 1).unwrap();
        let channel = PhysicalChannel::new(cable, ModemConfig::default())
            .unwrap()
            .with_clock(Arc::new(ManualClock::new()));
        assert_eq!(channel.busy_time(), Duration::ZERO);

        for _ in 0..3 {
            channel.transmit_bits(&[true, false]).unwrap();
        }

        assert_eq!(channel.busy_time(), Duration::from_millis(750));
    }

    #[test]
    fn test_invalid_modem_rejected() {
        let cable = Cable::seeded(CableConfig::default(), 1).unwrap();
        let modem = ModemConfig {
            samples_per_bit: 0,
            ..ModemConfig::default()
        };
        assert!(matches!(
            PhysicalChannel::new(cable, modem),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_concurrent_senders_never_overlap() {
        let clock = Arc::new(OverlapClock::default());
        let cable = Cable::seeded(CableConfig::ideal(10.0), 1).unwrap();
        let channel = Arc::new(
            PhysicalChannel::new(cable, ModemConfig::default())
                .unwrap()
                .with_clock(clock.clone()),
        );

        let handles: Vec<_> = (0..8u8)
            .map(|id| {
                let channel = Arc::clone(&channel);
                thread::spawn(move || {
                    let bits: Vec<Bit> = (0..16).map(|i| (id >> (i % 8)) & 1 == 1).collect();
                    for _ in 0..10 {
                        assert_eq!(channel.transmit_bits(&bits).unwrap(), bits);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(channel.transmissions(), 80);
        assert_eq!(clock.max_active.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_poisoned_medium_reported() {
        let channel = Arc::new(ideal_channel());

        let poisoner = Arc::clone(&channel);
        let result = thread::spawn(move || {
            let _ = poisoner.with_cable(|_| panic!("observer failure"));
        })
        .join();
        assert!(result.is_err());

        assert!(matches!(
            channel.transmit_bits(&[true]),
            Err(Error::Channel(_))
        ));
    }
}
