//! The frame control field (IEEE 802.11-2020, section 9.2.4.1).

bitflags::bitflags! {
    /// Flag bits in the second octet of the frame control field.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FrameControlFlags: u8 {
        const TO_DS = 0b0000_0001;
        const FROM_DS = 0b0000_0010;
        const MORE_FRAGMENTS = 0b0000_0100;
        const RETRY = 0b0000_1000;
        const POWER_MANAGEMENT = 0b0001_0000;
        const MORE_DATA = 0b0010_0000;
        const PROTECTED = 0b0100_0000;
        const ORDER = 0b1000_0000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameType {
    Management = 0b00,
    Control = 0b01,
    Data = 0b10,
    Extension = 0b11,
}

impl From<u8> for FrameType {
    fn from(value: u8) -> Self {
        match value & 0b11 {
            0b00 => Self::Management,
            0b01 => Self::Control,
            0b10 => Self::Data,
            _ => Self::Extension,
        }
    }
}

/// Management frame subtypes handled by an IBSS station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ManagementSubtype {
    ProbeRequest = 0b0100,
    ProbeResponse = 0b0101,
    Beacon = 0b1000,
    Atim = 0b1001,
    Unknown,
}

impl From<u8> for ManagementSubtype {
    fn from(value: u8) -> Self {
        match value {
            0b0100 => Self::ProbeRequest,
            0b0101 => Self::ProbeResponse,
            0b1000 => Self::Beacon,
            0b1001 => Self::Atim,
            _ => Self::Unknown,
        }
    }
}

/// Data subtype of a plain data frame.
pub const DATA_SUBTYPE_DATA: u8 = 0b0000;
/// Data subtype of a null (no data) frame.
pub const DATA_SUBTYPE_NULL: u8 = 0b0100;

/// The two-octet frame control field, little-endian on the air.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FrameControl(u16);

impl FrameControl {
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub fn from_le_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_le_bytes(bytes))
    }

    pub const fn new(frame_type: FrameType, subtype: u8, flags: FrameControlFlags) -> Self {
        Self(((frame_type as u16) << 2) | (((subtype & 0x0f) as u16) << 4) | ((flags.bits() as u16) << 8))
    }

    pub const fn management(subtype: ManagementSubtype) -> Self {
        Self::new(FrameType::Management, subtype as u8, FrameControlFlags::empty())
    }

    pub const fn data() -> Self {
        Self::new(FrameType::Data, DATA_SUBTYPE_DATA, FrameControlFlags::empty())
    }

    pub const fn bits(&self) -> u16 {
        self.0
    }

    pub fn to_le_bytes(&self) -> [u8; 2] {
        self.0.to_le_bytes()
    }

    pub const fn protocol_version(&self) -> u8 {
        (self.0 & 0b11) as u8
    }

    pub fn frame_type(&self) -> FrameType {
        FrameType::from((self.0 >> 2) as u8)
    }

    pub const fn subtype(&self) -> u8 {
        ((self.0 >> 4) & 0x0f) as u8
    }

    pub fn flags(&self) -> FrameControlFlags {
        FrameControlFlags::from_bits_retain((self.0 >> 8) as u8)
    }

    pub fn set_flags(&mut self, flags: FrameControlFlags) {
        self.0 = (self.0 & 0x00ff) | ((flags.bits() as u16) << 8);
    }

    pub fn management_subtype(&self) -> Option<ManagementSubtype> {
        self.is_management()
            .then(|| ManagementSubtype::from(self.subtype()))
    }

    pub fn is_management(&self) -> bool {
        self.frame_type() == FrameType::Management
    }

    pub fn is_data(&self) -> bool {
        self.frame_type() == FrameType::Data
    }

    pub fn is_beacon(&self) -> bool {
        self.management_subtype() == Some(ManagementSubtype::Beacon)
    }

    pub fn is_atim(&self) -> bool {
        self.management_subtype() == Some(ManagementSubtype::Atim)
    }

    /// Frames without a body. Null data frames carry power-management
    /// signalling only.
    pub fn is_null_data(&self) -> bool {
        self.is_data() && self.subtype() & DATA_SUBTYPE_NULL != 0
    }
}

impl core::fmt::Debug for FrameControl {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FrameControl")
            .field("type", &self.frame_type())
            .field("subtype", &self.subtype())
            .field("flags", &self.flags())
            .finish()
    }
}
