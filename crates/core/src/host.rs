//! Endpoints on the shared bus.
//!
//! A [`Host`] owns an address and an [`Inbox`]. Sending goes through the
//! router; receiving happens when the router hands a recovered frame to the
//! inbox, which accepts it only if the frame is addressed to its owner.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::address::Address;
use crate::bitio::{bytes_to_string, string_to_bytes};
use crate::error::{FrameError, Result};
use crate::frame::Frame;
use crate::router::{Router, SendReport};

/// A payload delivered to a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub src: Address,
    pub dst: Address,
    pub payload: Vec<u8>,
}

impl ReceivedMessage {
    /// Payload decoded one character per byte.
    pub fn text(&self) -> String {
        bytes_to_string(&self.payload)
    }
}

/// Messages accepted by one host, oldest first.
#[derive(Debug)]
pub struct Inbox {
    owner: Address,
    messages: Mutex<Vec<ReceivedMessage>>,
}

impl Inbox {
    pub(crate) fn new(owner: Address) -> Self {
        Self {
            owner,
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Store a frame addressed to the owner or to broadcast.
    ///
    /// # Errors
    /// `FrameError::Misaddressed` for any other destination; the frame is dropped.
    pub fn accept(&self, frame: Frame) -> Result<()> {
        if frame.dst != self.owner && !frame.dst.is_broadcast() {
            return Err(FrameError::Misaddressed {
                host: self.owner.value(),
                frame_dst: frame.dst.value(),
            }
            .into());
        }

        self.lock().push(ReceivedMessage {
            src: frame.src,
            dst: frame.dst,
            payload: frame.data,
        });
        Ok(())
    }

    pub fn last(&self) -> Option<ReceivedMessage> {
        self.lock().last().cloned()
    }

    pub fn messages(&self) -> Vec<ReceivedMessage> {
        self.lock().clone()
    }

    /// Remove and return every stored message.
    pub fn take(&self) -> Vec<ReceivedMessage> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while pushing cannot leave the Vec half-written.
    fn lock(&self) -> MutexGuard<'_, Vec<ReceivedMessage>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A station on the bus.
#[derive(Clone)]
pub struct Host {
    address: Address,
    router: Arc<Router>,
    inbox: Arc<Inbox>,
}

impl Host {
    pub(crate) fn new(address: Address, router: Arc<Router>, inbox: Arc<Inbox>) -> Self {
        Self {
            address,
            router,
            inbox,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Send text to `dst` (a host address or [`Address::BROADCAST`]).
    ///
    /// # Errors
    /// `CodecError::Encoding` for characters outside the single-byte range,
    /// plus everything [`Router::send_from_host`] returns.
    pub fn send(&self, dst: Address, message: &str) -> Result<SendReport> {
        let data = string_to_bytes(message)?;
        self.send_bytes(dst, &data)
    }

    pub fn send_bytes(&self, dst: Address, data: &[u8]) -> Result<SendReport> {
        self.router.send_from_host(self.address, dst, data)
    }

    /// Hand a recovered frame to this host.
    pub fn receive(&self, frame: Frame) -> Result<()> {
        self.inbox.accept(frame)
    }

    pub fn last_received(&self) -> Option<ReceivedMessage> {
        self.inbox.last()
    }

    pub fn inbox(&self) -> &Inbox {
        &self.inbox
    }

    pub fn take_inbox(&self) -> Vec<ReceivedMessage> {
        self.inbox.take()
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("address", &self.address)
            .field("inbox_len", &self.inbox.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn frame(dst: u8, src: u8, data: &[u8]) -> Frame {
        Frame::new(Address::new(dst), Address::new(src), data.to_vec())
    }

    #[test]
    fn test_accepts_own_address() {
        let inbox = Inbox::new(Address::new(3));
        inbox.accept(frame(3, 1, b"hi")).unwrap();

        let message = inbox.last().unwrap();
        assert_eq!(message.src, Address::new(1));
        assert_eq!(message.text(), "hi");
    }

    #[test]
    fn test_accepts_broadcast() {
        let inbox = Inbox::new(Address::new(3));
        inbox.accept(frame(255, 1, b"all")).unwrap();

        assert_eq!(inbox.len(), 1);
        assert!(inbox.last().unwrap().dst.is_broadcast());
    }

    #[test]
    fn test_rejects_other_address() {
        let inbox = Inbox::new(Address::new(3));
        let result = inbox.accept(frame(4, 1, b"not yours"));

        assert!(matches!(
            result,
            Err(Error::Frame(FrameError::Misaddressed {
                host: 3,
                frame_dst: 4
            }))
        ));
        assert!(inbox.is_empty());
    }

    #[test]
    fn test_take_drains() {
        let inbox = Inbox::new(Address::new(1));
        inbox.accept(frame(1, 2, b"a")).unwrap();
        inbox.accept(frame(1, 3, b"b")).unwrap();

        let messages = inbox.take();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text(), "a");
        assert!(inbox.is_empty());
        assert!(inbox.last().is_none());
    }
}
