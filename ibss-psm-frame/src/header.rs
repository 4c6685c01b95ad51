//! Reader/writer for the three-address MAC header shared by management and
//! non-QoS data frames in an IBSS.
//!
//! ```text
//! | FC (2) | Duration (2) | Addr1 (6) | Addr2 (6) | Addr3 (6) | SeqCtl (2) |
//! ```
//!
//! In an IBSS, address 1 is the receiver (destination), address 2 the
//! transmitter (source) and address 3 the BSSID. Multi-hop power management
//! temporarily re-uses address 3 to carry the final destination.
use core::ops::Range;

use crate::{Error, FrameControl, MacAddress, Result};

/// Length of the three-address MAC header.
pub const HEADER_LEN: usize = 24;

const FRAME_CONTROL: Range<usize> = 0..2;
const DURATION: Range<usize> = 2..4;
const ADDR1: Range<usize> = 4..10;
const ADDR2: Range<usize> = 10..16;
const ADDR3: Range<usize> = 16..22;
const SEQUENCE_CONTROL: Range<usize> = 22..24;

/// Mask of the sequence number bits in the sequence control field. The four
/// least significant bits carry the fragment number.
pub const SEQUENCE_NUMBER_MASK: u16 = 0xfff0;

/// A MAC header view over a byte buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacHeader<Bytes> {
    buffer: Bytes,
}

impl<Bytes: AsRef<[u8]>> MacHeader<Bytes> {
    /// Wraps the given buffer after checking that it can hold a header.
    pub fn new(buffer: Bytes) -> Result<Self> {
        if buffer.as_ref().len() < HEADER_LEN {
            return Err(Error);
        }
        Ok(Self { buffer })
    }

    /// Wraps the given buffer without checking its length.
    ///
    /// Accessors panic if the buffer is shorter than [`HEADER_LEN`].
    pub const fn new_unchecked(buffer: Bytes) -> Self {
        Self { buffer }
    }

    pub fn into_inner(self) -> Bytes {
        self.buffer
    }

    fn bytes(&self) -> &[u8] {
        self.buffer.as_ref()
    }

    fn address(&self, range: Range<usize>) -> MacAddress {
        let mut addr = [0u8; 6];
        addr.copy_from_slice(&self.bytes()[range]);
        MacAddress::new(addr)
    }

    pub fn frame_control(&self) -> FrameControl {
        let fc = &self.bytes()[FRAME_CONTROL];
        FrameControl::from_le_bytes([fc[0], fc[1]])
    }

    pub fn duration(&self) -> u16 {
        let d = &self.bytes()[DURATION];
        u16::from_le_bytes([d[0], d[1]])
    }

    /// Receiver address.
    pub fn addr1(&self) -> MacAddress {
        self.address(ADDR1)
    }

    /// Transmitter address.
    pub fn addr2(&self) -> MacAddress {
        self.address(ADDR2)
    }

    /// BSSID, or the final destination in multi-hop power management.
    pub fn addr3(&self) -> MacAddress {
        self.address(ADDR3)
    }

    pub fn sequence_control(&self) -> u16 {
        let sc = &self.bytes()[SEQUENCE_CONTROL];
        u16::from_le_bytes([sc[0], sc[1]])
    }

    pub fn sequence_number(&self) -> u16 {
        self.sequence_control() >> 4
    }

    /// The frame body following the header.
    pub fn body(&self) -> &[u8] {
        &self.bytes()[HEADER_LEN..]
    }
}

impl<Bytes: AsRef<[u8]> + AsMut<[u8]>> MacHeader<Bytes> {
    fn bytes_mut(&mut self) -> &mut [u8] {
        self.buffer.as_mut()
    }

    pub fn set_frame_control(&mut self, fc: FrameControl) {
        self.bytes_mut()[FRAME_CONTROL].copy_from_slice(&fc.to_le_bytes());
    }

    pub fn set_duration(&mut self, duration: u16) {
        self.bytes_mut()[DURATION].copy_from_slice(&duration.to_le_bytes());
    }

    pub fn set_addr1(&mut self, addr: MacAddress) {
        self.bytes_mut()[ADDR1].copy_from_slice(addr.as_bytes());
    }

    pub fn set_addr2(&mut self, addr: MacAddress) {
        self.bytes_mut()[ADDR2].copy_from_slice(addr.as_bytes());
    }

    pub fn set_addr3(&mut self, addr: MacAddress) {
        self.bytes_mut()[ADDR3].copy_from_slice(addr.as_bytes());
    }

    pub fn set_sequence_control(&mut self, sequence_control: u16) {
        self.bytes_mut()[SEQUENCE_CONTROL].copy_from_slice(&sequence_control.to_le_bytes());
    }

    pub fn body_mut(&mut self) -> &mut [u8] {
        &mut self.bytes_mut()[HEADER_LEN..]
    }
}
