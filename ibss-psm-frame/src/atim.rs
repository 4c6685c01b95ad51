//! Announcement traffic indication message (ATIM) frames.
//!
//! An ATIM is a management frame without body: the MAC header alone tells
//! the receiver to stay awake for the data window of the current beacon
//! interval.
use crate::{
    header::{MacHeader, HEADER_LEN},
    Error, FrameControl, MacAddress, ManagementSubtype, Result,
};

/// Length of an ATIM frame without FCS.
pub const ATIM_LEN: usize = HEADER_LEN;

/// High-level representation of an ATIM frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtimRepr {
    /// The neighbor that shall stay awake.
    pub destination: MacAddress,
    pub source: MacAddress,
    /// The BSSID or, in multi-hop power management, the final destination
    /// the announcement is meant for.
    pub addr3: MacAddress,
    pub sequence_control: u16,
}

impl AtimRepr {
    /// Parses an ATIM from a MAC header.
    pub fn parse<Bytes: AsRef<[u8]>>(header: &MacHeader<Bytes>) -> Result<Self> {
        if !header.frame_control().is_atim() {
            return Err(Error);
        }
        Ok(Self {
            destination: header.addr1(),
            source: header.addr2(),
            addr3: header.addr3(),
            sequence_control: header.sequence_control(),
        })
    }

    /// Writes the ATIM into the start of the given buffer and returns the
    /// number of bytes written.
    pub fn emit(&self, buffer: &mut [u8]) -> Result<usize> {
        let buffer = buffer.get_mut(..ATIM_LEN).ok_or(Error)?;
        let mut header = MacHeader::new_unchecked(buffer);
        header.set_frame_control(FrameControl::management(ManagementSubtype::Atim));
        header.set_duration(0);
        header.set_addr1(self.destination);
        header.set_addr2(self.source);
        header.set_addr3(self.addr3);
        header.set_sequence_control(self.sequence_control);
        Ok(ATIM_LEN)
    }
}
