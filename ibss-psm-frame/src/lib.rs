//! Zero-copy read/write accessors for the IEEE 802.11 frames an IBSS
//! power-save station handles: data frames, ATIMs and beacons.
//!
//! Frames are accessed through thin views over byte buffers (see
//! [`MacHeader`]) or through high-level representations that can be parsed
//! from and emitted into buffers ([`AtimRepr`], [`BeaconRepr`],
//! [`BeaconInfo`]). No allocation takes place.

#![no_std]

#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;

mod address;
mod atim;
mod beacon;
pub mod fcs;
mod frame_control;
mod header;

pub use address::MacAddress;
pub use atim::{AtimRepr, ATIM_LEN};
pub use beacon::{
    BeaconInfo, BeaconRepr, Element, Elements, CAPABILITY_IBSS, ELEMENT_ID_DS_PARAMETER_SET,
    ELEMENT_ID_IBSS_PARAMETER_SET, ELEMENT_ID_SSID, ELEMENT_ID_SUPPORTED_RATES, MAX_SSID_LEN,
};
pub use frame_control::{
    FrameControl, FrameControlFlags, FrameType, ManagementSubtype, DATA_SUBTYPE_DATA,
    DATA_SUBTYPE_NULL,
};
pub use header::{MacHeader, HEADER_LEN, SEQUENCE_NUMBER_MASK};

/// An error that can occur when reading or writing a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Error;

/// A type alias for `Result<T, frame::Error>`.
pub type Result<T> = core::result::Result<T, Error>;
