//! Generic utilities the other ibss-psm crates depend upon but that are not
//! directly related to IEEE 802.11 power management.
//!
//! The main purpose of this crate is to keep interrupt-safe synchronization
//! and logging out of the protocol crates.

#![no_std]

#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;

pub mod sync;

pub mod log;

#[cfg(any(feature = "defmt", feature = "log"))]
pub use crate::log::*;

/// A generic error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Error;

/// A type alias for `Result<T, ibss_psm_util::Error>`.
pub type Result<T> = core::result::Result<T, Error>;
