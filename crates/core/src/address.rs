//! Host addressing on the shared bus.
//!
//! Addresses are 8-bit values. `255` is reserved for broadcast and can never
//! be assigned to a host. Every registered host is directly reachable over
//! the single shared medium, so the table only has to answer "is this host
//! known" and "who does a broadcast reach".

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AddressError, Result};

/// An 8-bit station address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(u8);

impl Address {
    /// Reaches every registered host except the sender.
    pub const BROADCAST: Address = Address(255);

    /// Wrap any 8-bit value, including broadcast.
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Address suitable for a host.
    ///
    /// # Errors
    /// `AddressError::Invalid` for the broadcast address.
    pub fn host(value: u8) -> Result<Self> {
        let address = Self(value);
        if address.is_broadcast() {
            return Err(AddressError::Invalid(value).into());
        }
        Ok(address)
    }

    pub const fn value(self) -> u8 {
        self.0
    }

    pub const fn is_broadcast(self) -> bool {
        self.0 == Self::BROADCAST.0
    }
}

impl From<u8> for Address {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<Address> for u8 {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_broadcast() {
            write!(f, "broadcast")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Registered hosts on the bus.
#[derive(Debug, Clone, Default)]
pub struct AddressTable {
    hosts: BTreeSet<Address>,
}

impl AddressTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a host address.
    ///
    /// # Errors
    /// - `AddressError::Invalid` for the broadcast address
    /// - `AddressError::Duplicate` if already registered
    pub fn register(&mut self, address: Address) -> Result<()> {
        if address.is_broadcast() {
            return Err(AddressError::Invalid(address.value()).into());
        }
        if !self.hosts.insert(address) {
            return Err(AddressError::Duplicate(address.value()).into());
        }
        Ok(())
    }

    pub fn contains(&self, address: Address) -> bool {
        self.hosts.contains(&address)
    }

    /// # Errors
    /// `AddressError::UnregisteredSender` if `src` is not a registered host.
    pub fn require_sender(&self, src: Address) -> Result<()> {
        if !self.contains(src) {
            return Err(AddressError::UnregisteredSender(src.value()).into());
        }
        Ok(())
    }

    /// Hosts a frame from `src` to `dst` must reach, in address order.
    ///
    /// Unicast resolves to `dst` itself; broadcast resolves to every
    /// registered host except `src`.
    ///
    /// # Errors
    /// `AddressError::Unknown` for an unregistered unicast destination.
    pub fn resolve_targets(&self, src: Address, dst: Address) -> Result<Vec<Address>> {
        if dst.is_broadcast() {
            return Ok(self.hosts.iter().copied().filter(|&a| a != src).collect());
        }
        if !self.contains(dst) {
            return Err(AddressError::Unknown(dst.value()).into());
        }
        Ok(vec![dst])
    }

    pub fn addresses(&self) -> impl Iterator<Item = Address> + '_ {
        self.hosts.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn table(addresses: &[u8]) -> AddressTable {
        let mut table = AddressTable::new();
        for &a in addresses {
            table.register(Address::new(a)).unwrap();
        }
        table
    }

    #[test]
    fn test_register_and_contains() {
        let table = table(&[1, 2, 3]);
        assert_eq!(table.len(), 3);
        assert!(table.contains(Address::new(2)));
        assert!(!table.contains(Address::new(4)));
    }

    #[test]
    fn test_broadcast_rejected() {
        let mut table = AddressTable::new();
        assert!(matches!(
            table.register(Address::BROADCAST),
            Err(Error::Address(AddressError::Invalid(255)))
        ));
        assert!(table.is_empty());
        assert!(Address::host(255).is_err());
        assert_eq!(Address::host(254).unwrap().value(), 254);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut table = table(&[9]);
        assert!(matches!(
            table.register(Address::new(9)),
            Err(Error::Address(AddressError::Duplicate(9)))
        ));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_resolve_unicast() {
        let table = table(&[1, 2, 3]);
        assert_eq!(
            table
                .resolve_targets(Address::new(1), Address::new(3))
                .unwrap(),
            vec![Address::new(3)]
        );
        assert!(matches!(
            table.resolve_targets(Address::new(1), Address::new(4)),
            Err(Error::Address(AddressError::Unknown(4)))
        ));
    }

    #[test]
    fn test_resolve_broadcast_excludes_sender() {
        let table = table(&[3, 1, 2]);
        assert_eq!(
            table
                .resolve_targets(Address::new(2), Address::BROADCAST)
                .unwrap(),
            vec![Address::new(1), Address::new(3)]
        );
    }

    #[test]
    fn test_require_sender() {
        let table = table(&[1]);
        assert!(table.require_sender(Address::new(1)).is_ok());
        assert!(matches!(
            table.require_sender(Address::new(8)),
            Err(Error::Address(AddressError::UnregisteredSender(8)))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(Address::new(12).to_string(), "12");
        assert_eq!(Address::BROADCAST.to_string(), "broadcast");
    }
}
