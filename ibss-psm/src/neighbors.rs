//! Neighbors known to stay awake for the current beacon interval.
use heapless::Vec;
use ibss_psm_frame::MacAddress;

use crate::{Error, Result};

/// A set of link addresses with a fixed capacity `N`.
///
/// The set is cleared at the start of every beacon interval and filled from
/// received and acknowledged announcements.
#[derive(Debug, Clone, Default)]
pub struct AwakeNeighbors<const N: usize> {
    addresses: Vec<MacAddress, N>,
}

impl<const N: usize> AwakeNeighbors<N> {
    pub const fn new() -> Self {
        Self {
            addresses: Vec::new(),
        }
    }

    pub fn contains(&self, address: &MacAddress) -> bool {
        self.addresses.contains(address)
    }

    /// Inserts `address` unless it is already present.
    ///
    /// Fails if the set already holds `limit` (or `N`) addresses.
    pub fn insert_if_absent(&mut self, address: MacAddress, limit: usize) -> Result<()> {
        if self.contains(&address) {
            return Ok(());
        }
        if self.addresses.len() >= limit.min(N) {
            return Err(Error::CapacityExceeded);
        }
        self.addresses
            .push(address)
            .map_err(|_| Error::CapacityExceeded)
    }

    pub fn clear(&mut self) {
        self.addresses.clear();
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MacAddress> {
        self.addresses.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: MacAddress = MacAddress::new([2, 0, 0, 0, 0, 0xa]);
    const B: MacAddress = MacAddress::new([2, 0, 0, 0, 0, 0xb]);
    const C: MacAddress = MacAddress::new([2, 0, 0, 0, 0, 0xc]);

    #[test]
    fn insert_is_idempotent() {
        let mut set = AwakeNeighbors::<4>::new();
        set.insert_if_absent(A, 4).unwrap();
        set.insert_if_absent(A, 4).unwrap();
        set.insert_if_absent(B, 4).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains(&A));
        assert!(set.contains(&B));
        assert!(!set.contains(&C));
    }

    #[test]
    fn capacity() {
        let mut set = AwakeNeighbors::<4>::new();
        set.insert_if_absent(A, 2).unwrap();
        set.insert_if_absent(B, 2).unwrap();
        assert_eq!(set.insert_if_absent(C, 2), Err(Error::CapacityExceeded));
        // Known addresses are still accepted when full.
        assert_eq!(set.insert_if_absent(A, 2), Ok(()));

        set.clear();
        assert!(set.is_empty());
        assert!(set.insert_if_absent(C, 2).is_ok());
    }
}
