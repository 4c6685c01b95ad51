//! IBSS beacon frames.
//!
//! Beacon body layout (IEEE 802.11-2020, section 9.3.3.2):
//!
//! ```text
//! | Timestamp (8) | Beacon interval (2) | Capability (2) | Elements ... |
//! ```
//!
//! Only the elements required to join and follow an IBSS are interpreted:
//! SSID, supported rates, DS parameter set and the IBSS parameter set that
//! carries the ATIM window.
use crate::{
    header::{MacHeader, HEADER_LEN},
    Error, FrameControl, MacAddress, ManagementSubtype, Result,
};

pub const ELEMENT_ID_SSID: u8 = 0;
pub const ELEMENT_ID_SUPPORTED_RATES: u8 = 1;
pub const ELEMENT_ID_DS_PARAMETER_SET: u8 = 3;
pub const ELEMENT_ID_IBSS_PARAMETER_SET: u8 = 6;

/// Capability bit announcing an IBSS.
pub const CAPABILITY_IBSS: u16 = 0x0002;

/// Fixed fields preceding the elements.
const FIXED_FIELDS_LEN: usize = 12;

/// Maximum SSID length.
pub const MAX_SSID_LEN: usize = 32;

/// An information element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element<'a> {
    pub id: u8,
    pub data: &'a [u8],
}

/// Iterator over the information elements of a frame body. Iteration ends
/// at the first truncated element.
#[derive(Debug, Clone)]
pub struct Elements<'a> {
    data: &'a [u8],
}

impl<'a> Elements<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl<'a> Iterator for Elements<'a> {
    type Item = Element<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (&id, rest) = self.data.split_first()?;
        let (&len, rest) = rest.split_first()?;
        let len = len as usize;
        if rest.len() < len {
            self.data = &[];
            return None;
        }
        let (data, rest) = rest.split_at(len);
        self.data = rest;
        Some(Element { id, data })
    }
}

/// The parts of a received beacon the station acts upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeaconInfo<'a> {
    pub source: MacAddress,
    pub bssid: MacAddress,
    pub timestamp: u64,
    /// Beacon interval in TU.
    pub interval_tu: u16,
    pub capability: u16,
    pub ssid: Option<&'a [u8]>,
    pub channel: Option<u8>,
    /// ATIM window in TU, present in IBSS beacons.
    pub atim_window_tu: Option<u16>,
}

impl<'a> BeaconInfo<'a> {
    /// Parses a beacon MPDU (without FCS).
    pub fn parse(mpdu: &'a [u8]) -> Result<Self> {
        let header = MacHeader::new(mpdu)?;
        if !header.frame_control().is_beacon() {
            return Err(Error);
        }
        let body = &mpdu[HEADER_LEN..];
        if body.len() < FIXED_FIELDS_LEN {
            return Err(Error);
        }

        let mut timestamp = [0u8; 8];
        timestamp.copy_from_slice(&body[0..8]);

        let mut info = BeaconInfo {
            source: header.addr2(),
            bssid: header.addr3(),
            timestamp: u64::from_le_bytes(timestamp),
            interval_tu: u16::from_le_bytes([body[8], body[9]]),
            capability: u16::from_le_bytes([body[10], body[11]]),
            ssid: None,
            channel: None,
            atim_window_tu: None,
        };

        for element in Elements::new(&body[FIXED_FIELDS_LEN..]) {
            match (element.id, element.data) {
                (ELEMENT_ID_SSID, ssid) if ssid.len() <= MAX_SSID_LEN => info.ssid = Some(ssid),
                (ELEMENT_ID_DS_PARAMETER_SET, [channel]) => info.channel = Some(*channel),
                (ELEMENT_ID_IBSS_PARAMETER_SET, [lo, hi]) => {
                    info.atim_window_tu = Some(u16::from_le_bytes([*lo, *hi]))
                }
                _ => {}
            }
        }

        Ok(info)
    }

    pub fn is_ibss(&self) -> bool {
        self.capability & CAPABILITY_IBSS != 0
    }
}

/// High-level representation of a beacon to be emitted by this station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeaconRepr<'a> {
    pub source: MacAddress,
    pub bssid: MacAddress,
    pub interval_tu: u16,
    pub ssid: &'a [u8],
    /// Supported rates in units of 500 kb/s, basic rates with the MSB set.
    pub rates: &'a [u8],
    pub channel: u8,
    pub atim_window_tu: u16,
    pub sequence_control: u16,
}

impl BeaconRepr<'_> {
    /// Number of bytes [`BeaconRepr::emit()`] writes.
    pub fn buffer_len(&self) -> usize {
        HEADER_LEN + FIXED_FIELDS_LEN + (2 + self.ssid.len()) + (2 + self.rates.len()) + 3 + 4
    }

    /// Writes the beacon into the given buffer and returns its length. The
    /// timestamp is left zero, the hardware fills it in on transmission.
    pub fn emit(&self, buffer: &mut [u8]) -> Result<usize> {
        if self.ssid.len() > MAX_SSID_LEN || self.rates.len() > u8::MAX as usize {
            return Err(Error);
        }
        let len = self.buffer_len();
        let buffer = buffer.get_mut(..len).ok_or(Error)?;

        let mut header = MacHeader::new_unchecked(&mut buffer[..]);
        header.set_frame_control(FrameControl::management(ManagementSubtype::Beacon));
        header.set_duration(0);
        header.set_addr1(MacAddress::BROADCAST);
        header.set_addr2(self.source);
        header.set_addr3(self.bssid);
        header.set_sequence_control(self.sequence_control);

        let body = &mut buffer[HEADER_LEN..];
        body[0..8].fill(0);
        body[8..10].copy_from_slice(&self.interval_tu.to_le_bytes());
        body[10..12].copy_from_slice(&CAPABILITY_IBSS.to_le_bytes());

        let mut offset = FIXED_FIELDS_LEN;
        let mut write_element = |id: u8, data: &[u8]| {
            body[offset] = id;
            body[offset + 1] = data.len() as u8;
            body[offset + 2..offset + 2 + data.len()].copy_from_slice(data);
            offset += 2 + data.len();
        };
        write_element(ELEMENT_ID_SSID, self.ssid);
        write_element(ELEMENT_ID_SUPPORTED_RATES, self.rates);
        write_element(ELEMENT_ID_DS_PARAMETER_SET, &[self.channel]);
        write_element(
            ELEMENT_ID_IBSS_PARAMETER_SET,
            &self.atim_window_tu.to_le_bytes(),
        );

        Ok(len)
    }
}
