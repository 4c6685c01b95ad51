//! Wake announcements (ATIMs).
//!
//! Before a data frame may be sent in the data window, its receiver has to
//! be told to stay awake. This happens with an ATIM sent during the ATIM
//! window. Neighbors that acknowledged an ATIM, or announced traffic
//! themselves, are recorded in the [`AwakeNeighbors`] set.
//!
//! In multi-hop mode the ATIM is relayed hop by hop: address 3 carries the
//! final destination, address 1 the next hop towards it. Every relay
//! resolves its own next hop from the [`NextHopMap`].
use ibss_psm_frame::{AtimRepr, MacAddress};

use crate::{
    AwakeNeighbors, Error, FrameQueue, NextHopMap, PsMode, QueuedFrame, Result,
};
use ibss_psm_util::{debug, trace, warn};

/// Sequence numbers of frames originated by the station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SequenceCounter(u16);

impl SequenceCounter {
    /// One sequence number, the fragment number stays zero.
    pub const STEP: u16 = 0x10;

    pub const fn new() -> Self {
        Self(0)
    }

    /// Returns the next sequence control value.
    pub fn next(&mut self) -> u16 {
        let sequence_control = self.0;
        self.0 = self.0.wrapping_add(Self::STEP);
        sequence_control
    }
}

/// Builds and deduplicates announcements.
#[derive(Debug, Clone)]
pub struct AtimEngine {
    mode: PsMode,
    address: MacAddress,
    bssid: MacAddress,
    sequence: SequenceCounter,
}

impl AtimEngine {
    pub fn new(mode: PsMode, address: MacAddress, bssid: MacAddress) -> Self {
        Self {
            mode,
            address,
            bssid,
            sequence: SequenceCounter::new(),
        }
    }

    pub fn mode(&self) -> PsMode {
        self.mode
    }

    pub fn bssid(&self) -> MacAddress {
        self.bssid
    }

    pub fn next_sequence_control(&mut self) -> u16 {
        self.sequence.next()
    }

    /// Whether the receiver of `frame` (in multi-hop mode: its final
    /// destination) still has to be announced.
    pub fn needs_announcement<const N: usize>(
        &self,
        frame: &QueuedFrame,
        awake: &AwakeNeighbors<N>,
    ) -> bool {
        self.mode.is_enabled() && !awake.contains(&frame.awake_key())
    }

    /// Builds a header-only ATIM to `destination`.
    pub fn build_announcement(
        &mut self,
        destination: MacAddress,
        final_destination: Option<MacAddress>,
    ) -> Result<QueuedFrame> {
        let final_destination = final_destination.filter(|_| self.mode == PsMode::MultiHop);
        let repr = AtimRepr {
            destination,
            source: self.address,
            addr3: final_destination.unwrap_or(self.bssid),
            sequence_control: self.sequence.next(),
        };
        QueuedFrame::announcement(&repr, final_destination)
    }

    /// Whether an announcement for `key` is already queued.
    pub fn already_pending<const N: usize>(
        &self,
        queue: &FrameQueue<QueuedFrame, N>,
        key: &MacAddress,
    ) -> bool {
        queue.iter().any(|atim| atim.awake_key() == *key)
    }

    pub fn resolve_next_hop<const N: usize>(
        &self,
        next_hops: &NextHopMap<N>,
        final_destination: &MacAddress,
    ) -> Option<MacAddress> {
        next_hops.resolve(final_destination)
    }

    /// Final destinations that are never announced hop by hop.
    fn is_direct(&self, final_destination: &MacAddress) -> bool {
        final_destination.is_group() || *final_destination == self.bssid
    }

    /// Queues an announcement for traffic to `destination` (address 1) and,
    /// in multi-hop mode, to `final_destination`.
    ///
    /// Returns `Ok(false)` if no announcement was needed.
    pub fn announce<const N: usize, const M: usize>(
        &mut self,
        queue: &mut FrameQueue<QueuedFrame, N>,
        next_hops: &NextHopMap<M>,
        destination: MacAddress,
        final_destination: Option<MacAddress>,
    ) -> Result<bool> {
        match (self.mode, final_destination) {
            (PsMode::Disabled, _) => Ok(false),
            (PsMode::MultiHop, Some(final_destination)) if final_destination == self.address => {
                trace!("atim: final destination is us");
                Ok(false)
            }
            (PsMode::MultiHop, Some(final_destination)) if !self.is_direct(&final_destination) => {
                if self.already_pending(queue, &final_destination) {
                    return Ok(false);
                }
                let Some(next_hop) = self.resolve_next_hop(next_hops, &final_destination) else {
                    warn!("atim: no next hop to {}", final_destination);
                    return Err(Error::ResolutionFailure);
                };
                self.enqueue(queue, next_hop, Some(final_destination))
            }
            _ => {
                if self.already_pending(queue, &destination) {
                    return Ok(false);
                }
                self.enqueue(queue, destination, None)
            }
        }
    }

    fn enqueue<const N: usize>(
        &mut self,
        queue: &mut FrameQueue<QueuedFrame, N>,
        destination: MacAddress,
        final_destination: Option<MacAddress>,
    ) -> Result<bool> {
        let atim = self.build_announcement(destination, final_destination)?;
        queue
            .push_tail(atim, N)
            .map_err(|_| Error::CapacityExceeded)?;
        debug!("atim: queued for {}", destination);
        Ok(true)
    }
}
