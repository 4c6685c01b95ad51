use heapless::LinearMap;
use ibss_psm_frame::MacAddress;

use crate::{Error, Result};

/// Route table used by multi-hop power management: final destination to
/// the neighbor that forwards traffic towards it.
///
/// Maintained by the routing layer, consulted whenever an announcement has
/// to be sent for a station that is not a direct neighbor.
#[derive(Debug, Clone, Default)]
pub struct NextHopMap<const N: usize> {
    routes: LinearMap<MacAddress, MacAddress, N>,
}

impl<const N: usize> NextHopMap<N> {
    pub const fn new() -> Self {
        Self {
            routes: LinearMap::new(),
        }
    }

    /// Adds or replaces the route to `destination`.
    pub fn insert(&mut self, destination: MacAddress, next_hop: MacAddress) -> Result<()> {
        self.routes
            .insert(destination, next_hop)
            .map(|_| ())
            .map_err(|_| Error::CapacityExceeded)
    }

    pub fn remove(&mut self, destination: &MacAddress) -> Option<MacAddress> {
        self.routes.remove(destination)
    }

    pub fn resolve(&self, destination: &MacAddress) -> Option<MacAddress> {
        self.routes.get(destination).copied()
    }

    pub fn clear(&mut self) {
        self.routes.clear();
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
