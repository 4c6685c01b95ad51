use heapless::Vec;
use ibss_psm_driver::const_config::MAX_MPDU_LEN;
use ibss_psm_frame::{AtimRepr, MacAddress, MacHeader, ATIM_LEN};

use crate::{Error, Result};

/// An owned MPDU without FCS.
pub type FrameBuffer = Vec<u8, MAX_MPDU_LEN>;

/// A frame waiting for transmission together with the header fields the
/// scheduler keys on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedFrame {
    buffer: FrameBuffer,
    destination: MacAddress,
    final_destination: Option<MacAddress>,
    sequence_control: u16,
}

impl QueuedFrame {
    /// Copies an outgoing data MPDU handed over by the higher layer.
    ///
    /// With `multi_hop` set, address 3 is taken as the final destination
    /// unless it is the BSSID or a group address.
    pub fn data(mpdu: &[u8], bssid: MacAddress, multi_hop: bool) -> Result<Self> {
        let header = MacHeader::new(mpdu)?;
        if !header.frame_control().is_data() {
            return Err(Error::InvalidFrame);
        }
        let buffer = Vec::from_slice(mpdu).map_err(|_| Error::CapacityExceeded)?;
        let addr3 = header.addr3();
        let final_destination = (multi_hop && addr3 != bssid && !addr3.is_group()).then_some(addr3);

        Ok(Self {
            destination: header.addr1(),
            final_destination,
            sequence_control: header.sequence_control(),
            buffer,
        })
    }

    /// Emits an ATIM into a new frame. `final_destination` is recorded when
    /// the ATIM announces traffic for a station further down the route.
    pub fn announcement(repr: &AtimRepr, final_destination: Option<MacAddress>) -> Result<Self> {
        let mut buffer = FrameBuffer::new();
        buffer
            .resize(ATIM_LEN, 0)
            .map_err(|_| Error::CapacityExceeded)?;
        repr.emit(&mut buffer)?;

        Ok(Self {
            buffer,
            destination: repr.destination,
            final_destination,
            sequence_control: repr.sequence_control,
        })
    }

    /// Address 1, the neighbor that has to be awake to receive the frame.
    pub fn destination(&self) -> MacAddress {
        self.destination
    }

    pub fn final_destination(&self) -> Option<MacAddress> {
        self.final_destination
    }

    /// The address whose awake state decides whether the frame needs to be
    /// announced.
    pub fn awake_key(&self) -> MacAddress {
        self.final_destination.unwrap_or(self.destination)
    }

    pub fn sequence_control(&self) -> u16 {
        self.sequence_control
    }

    pub fn mpdu(&self) -> &[u8] {
        &self.buffer
    }

    /// Replaces a final destination carried in address 3 by the BSSID
    /// before the frame goes on air.
    pub fn restore_bssid(&mut self, bssid: MacAddress) {
        if self.final_destination.is_some() {
            MacHeader::new_unchecked(&mut self.buffer[..]).set_addr3(bssid);
        }
    }
}
