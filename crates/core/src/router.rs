//! Store-and-forward router for the shared bus.
//!
//! Every send crosses the medium at least twice:
//!
//! ```text
//! host --(uplink frame)--> router --(downlink frame per target)--> host(s)
//! ```
//!
//! Validation happens before anything is transmitted: an unregistered
//! sender, an unknown destination or an oversized payload is rejected with
//! no frame on the wire. After the uplink hop the router re-frames the
//! recovered payload once per target, so a corrupted downlink to one host
//! does not affect delivery to the others.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard};

use tracing::{debug, warn};

use crate::address::{Address, AddressTable};
use crate::channel::PhysicalChannel;
use crate::error::{Error, FrameError, Result};
use crate::frame::{build_frame, recover_payload, Frame};
use crate::host::{Host, Inbox};
use crate::metrics::LinkMetrics;

/// Result of delivering one frame to one host.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub target: Address,
    pub result: Result<()>,
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-target outcomes of one send.
#[derive(Debug, Clone)]
pub struct SendReport {
    pub src: Address,
    pub dst: Address,
    pub outcomes: Vec<DeliveryOutcome>,
}

impl SendReport {
    /// True when every target received the payload.
    ///
    /// A broadcast with no other registered hosts has no targets and
    /// trivially succeeds.
    pub fn all_delivered(&self) -> bool {
        self.outcomes.iter().all(DeliveryOutcome::is_delivered)
    }

    pub fn delivered(&self) -> Vec<Address> {
        self.outcomes
            .iter()
            .filter(|o| o.is_delivered())
            .map(|o| o.target)
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = (Address, &Error)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.target, e)))
    }

    pub fn outcome(&self, target: Address) -> Option<&DeliveryOutcome> {
        self.outcomes.iter().find(|o| o.target == target)
    }
}

#[derive(Default)]
struct Registry {
    table: AddressTable,
    inboxes: HashMap<Address, Arc<Inbox>>,
}

/// Resolves destinations and drives the shared channel.
///
/// Hosts should be registered before concurrent traffic starts; sends only
/// take the registry read lock.
pub struct Router {
    channel: Arc<PhysicalChannel>,
    registry: RwLock<Registry>,
    metrics: Mutex<LinkMetrics>,
}

impl Router {
    pub fn new(channel: Arc<PhysicalChannel>) -> Arc<Self> {
        Arc::new(Self {
            channel,
            registry: RwLock::new(Registry::default()),
            metrics: Mutex::new(LinkMetrics::new()),
        })
    }

    /// Register a host and return its endpoint.
    ///
    /// # Errors
    /// - `AddressError::Invalid` for the broadcast address
    /// - `AddressError::Duplicate` if the address is taken
    pub fn register_host(self: &Arc<Self>, address: Address) -> Result<Host> {
        let inbox = Arc::new(Inbox::new(address));

        {
            let mut registry = self
                .registry
                .write()
                .map_err(|_| Error::Registry("host registry lock poisoned".into()))?;
            registry.table.register(address)?;
            registry.inboxes.insert(address, Arc::clone(&inbox));
        }

        debug!(%address, "host registered");
        Ok(Host::new(address, Arc::clone(self), inbox))
    }

    /// Carry `data` from `src` to `dst` (a host or broadcast).
    ///
    /// # Errors
    /// Returned without transmitting anything:
    /// - `AddressError::UnregisteredSender` if `src` is unknown
    /// - `AddressError::Unknown` if a unicast `dst` is unknown
    /// - `FrameError::PayloadTooLarge` if `data` exceeds the length field
    ///
    /// Returned after the uplink hop fails, unchanged from the codec:
    /// `CodecError::Parity`, `FrameError`, `ShapeError`.
    ///
    /// Downlink failures never abort the send; they appear per target in
    /// the returned [`SendReport`].
    pub fn send_from_host(&self, src: Address, dst: Address, data: &[u8]) -> Result<SendReport> {
        self.update_metrics(|m| m.sends_requested += 1);

        let targets = match self.resolve(src, dst) {
            Ok(targets) => targets,
            Err(e) => {
                warn!(%src, %dst, error = %e, "send rejected");
                self.update_metrics(|m| m.sends_rejected += 1);
                return Err(e);
            }
        };

        let uplink = match build_frame(dst, src, data) {
            Ok(bits) => bits,
            Err(e) => {
                warn!(%src, %dst, error = %e, "send rejected");
                self.update_metrics(|m| m.sends_rejected += 1);
                return Err(e);
            }
        };

        let ingress = match self.relay_uplink(src, dst, &uplink) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(%src, %dst, error = %e, "uplink hop failed");
                self.update_metrics(|m| m.record_uplink_failure(&e));
                return Err(e);
            }
        };

        let outcomes = targets
            .into_iter()
            .map(|(target, inbox)| {
                let result = self.deliver(src, target, &inbox, &ingress.data);
                match &result {
                    Ok(()) => {
                        debug!(%src, %target, bytes = ingress.data.len(), "delivered");
                        self.update_metrics(|m| m.record_delivery(ingress.data.len()));
                    }
                    Err(e) => {
                        warn!(%src, %target, error = %e, "delivery failed");
                        self.update_metrics(|m| m.record_delivery_failure(e));
                    }
                }
                DeliveryOutcome { target, result }
            })
            .collect();

        Ok(SendReport { src, dst, outcomes })
    }

    pub fn channel(&self) -> &Arc<PhysicalChannel> {
        &self.channel
    }

    /// Registered host addresses in ascending order.
    pub fn hosts(&self) -> Result<Vec<Address>> {
        Ok(self.read_registry()?.table.addresses().collect())
    }

    /// Snapshot of the link counters.
    pub fn metrics(&self) -> LinkMetrics {
        self.lock_metrics().clone()
    }

    /// Validate the sender and look up the inbox of every target.
    fn resolve(&self, src: Address, dst: Address) -> Result<Vec<(Address, Arc<Inbox>)>> {
        let registry = self.read_registry()?;
        registry.table.require_sender(src)?;

        let targets = registry.table.resolve_targets(src, dst)?;
        Ok(targets
            .into_iter()
            .filter_map(|target| {
                registry
                    .inboxes
                    .get(&target)
                    .map(|inbox| (target, Arc::clone(inbox)))
            })
            .collect())
    }

    /// Host-to-router hop; the recovered header must match what was sent.
    fn relay_uplink(&self, src: Address, dst: Address, bits: &[bool]) -> Result<Frame> {
        let frame = self.hop(bits)?;
        if frame.src != src || frame.dst != dst {
            return Err(FrameError::HeaderMismatch {
                sent_src: src.value(),
                sent_dst: dst.value(),
                recovered_src: frame.src.value(),
                recovered_dst: frame.dst.value(),
            }
            .into());
        }
        debug!(%src, %dst, "uplink hop complete");
        Ok(frame)
    }

    /// Router-to-host hop, re-framed for one target.
    fn deliver(&self, src: Address, target: Address, inbox: &Inbox, data: &[u8]) -> Result<()> {
        let bits = build_frame(target, src, data)?;
        let frame = self.hop(&bits)?;
        inbox.accept(frame)
    }

    fn hop(&self, bits: &[bool]) -> Result<Frame> {
        let received = self.channel.transmit_bits(bits)?;
        self.update_metrics(|m| m.record_hop(bits.len()));
        recover_payload(&received)
    }

    fn read_registry(&self) -> Result<RwLockReadGuard<'_, Registry>> {
        self.registry
            .read()
            .map_err(|_| Error::Registry("host registry lock poisoned".into()))
    }

    fn lock_metrics(&self) -> MutexGuard<'_, LinkMetrics> {
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update_metrics(&self, f: impl FnOnce(&mut LinkMetrics)) {
        f(&mut self.lock_metrics());
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}
