//! Runtime configuration of a station.
use heapless::Vec;
use ibss_psm_driver::{
    constants::{
        DEFAULT_ATIM_WINDOW_TU, DEFAULT_BEACON_INTERVAL_TU, DEFAULT_LOW_DUTY_BEACON_PERIOD_TU,
        DEFAULT_PRE_ANNOUNCE_TU,
    },
    StationDuration,
};
use ibss_psm_frame::{MacAddress, MAX_SSID_LEN};

use crate::{Error, Result};

/// The BSSID used when no other IBSS was found. Locally administered,
/// individual.
pub const DEFAULT_BSSID: MacAddress = MacAddress::new([0x02, 0x1a, 0x11, 0xf0, 0x0d, 0x01]);

/// The SSID used when none is configured.
pub const DEFAULT_SSID: &[u8] = b"ibss-psm";

/// 1, 2, 5.5 and 11 Mb/s, all basic.
pub const DEFAULT_RATES: [u8; 4] = [0x82, 0x84, 0x8b, 0x96];

pub const DEFAULT_CHANNEL: u8 = 6;

/// Power-save operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PsMode {
    /// Always awake. Beacon intervals are counted but no ATIM window is
    /// run and every neighbor counts as awake.
    Disabled,
    /// Announcements are addressed to the data frame's receiver.
    #[default]
    Standard,
    /// Announcements carry the final destination in address 3 and travel
    /// hop by hop along the route.
    MultiHop,
}

impl PsMode {
    pub fn is_enabled(&self) -> bool {
        *self != PsMode::Disabled
    }
}

/// Durations structuring a beacon interval.
///
/// ```text
/// |<------------------------ beacon interval ------------------------>|
/// |<-pre announce->|<--ATIM window-->|<-------- data window --------->|
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub beacon_interval: StationDuration,
    pub atim_window: StationDuration,
    pub pre_announce: StationDuration,
    pub low_duty_beacon_period: StationDuration,
}

impl Timing {
    pub const fn from_tu(beacon_interval: u16, atim_window: u16, pre_announce: u16) -> Self {
        Self {
            beacon_interval: StationDuration::from_tu(beacon_interval),
            atim_window: StationDuration::from_tu(atim_window),
            pre_announce: StationDuration::from_tu(pre_announce),
            low_duty_beacon_period: StationDuration::from_tu(DEFAULT_LOW_DUTY_BEACON_PERIOD_TU),
        }
    }

    /// The pre-announce period and the ATIM window must leave room for a
    /// data window.
    pub fn validate(&self) -> Result<()> {
        let zero = StationDuration::ZERO;
        if self.atim_window <= zero
            || self.pre_announce < zero
            || self.low_duty_beacon_period <= zero
            || self.pre_announce + self.atim_window >= self.beacon_interval
        {
            return Err(Error::InvalidConfiguration);
        }
        Ok(())
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::from_tu(
            DEFAULT_BEACON_INTERVAL_TU,
            DEFAULT_ATIM_WINDOW_TU,
            DEFAULT_PRE_ANNOUNCE_TU,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationConfig {
    pub bssid: MacAddress,
    pub ssid: Vec<u8, MAX_SSID_LEN>,
    pub channel: u8,
    pub rates: Vec<u8, 8>,
    pub ps_mode: PsMode,
    pub timing: Timing,
    /// Treat the sender of a beacon of our IBSS as awake for the rest of the
    /// beacon interval.
    pub beacon_marks_awake: bool,
    /// Verify the FCS of received frames. Disable for radios that already
    /// drop frames with a bad FCS.
    pub verify_fcs: bool,
}

impl StationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.bssid.is_group() {
            return Err(Error::InvalidConfiguration);
        }
        self.timing.validate()
    }
}

impl Default for StationConfig {
    fn default() -> Self {
        // Both constants fit their vectors.
        let ssid = Vec::from_slice(DEFAULT_SSID).unwrap_or_default();
        let rates = Vec::from_slice(&DEFAULT_RATES).unwrap_or_default();
        Self {
            bssid: DEFAULT_BSSID,
            ssid,
            channel: DEFAULT_CHANNEL,
            rates,
            ps_mode: PsMode::default(),
            timing: Timing::default(),
            beacon_marks_awake: false,
            verify_fcs: true,
        }
    }
}
