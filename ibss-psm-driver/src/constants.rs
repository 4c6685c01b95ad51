#![allow(dead_code)]

use crate::time::{Duration, Microseconds};

// IEEE 802.11-2020, section 3.1: time unit (TU) of 1024 µs.
pub const TU_MICROS: i64 = 1024;
/// One time unit.
pub const TU: Duration<Microseconds> = Duration::new(TU_MICROS);

/// Default beacon period in TU, dot11BeaconPeriod.
pub const DEFAULT_BEACON_INTERVAL_TU: u16 = 100;
/// Default ATIM window in TU, dot11ATIMWindow.
pub const DEFAULT_ATIM_WINDOW_TU: u16 = 20;
/// Lead time between the pre-announce alarm and the start of the ATIM
/// window. Covers the radio wake-up and beacon contention.
pub const DEFAULT_PRE_ANNOUNCE_TU: u16 = 2;
/// Period of software beacons while the station only beacons.
pub const DEFAULT_LOW_DUTY_BEACON_PERIOD_TU: u16 = 10;
