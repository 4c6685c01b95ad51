//! This crate provides everything related to radio hardware access required
//! by the IBSS power-save scheduler:
//! - the asynchronous radio command interface,
//! - one-shot alarm timers,
//! - time structures and 802.11 timing constants,
//! - build-time configurable capacities.

#![no_std]

#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;

pub mod const_config;
pub mod constants;
pub mod radio;
pub mod time;
pub mod timer;

pub use radio::RadioDriverApi;
pub use timer::{Alarm, AlarmTimer, StationDuration, StationInstant};
