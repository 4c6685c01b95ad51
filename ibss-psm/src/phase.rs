//! The beacon-interval phase machine.
//!
//! ```text
//!   pre-announce alarm      window-start alarm        window-end alarm
//! ──────────► PreAnnounce ──────────► AnnounceWindow ──────────► DataWindow
//!                  │          ▲                            │
//!                  └──────────┘ beacon sent                └──► LowDutyBeaconWindow
//!                                                               (low duty only)
//! ```
//!
//! Only the state is kept here. Alarm chaining, power management and event
//! posting happen in [`crate::StationShared`].
use crate::{Error, Result};

/// The part of the beacon interval the station is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Lead time before the ATIM window. The awake-neighbor set is rebuilt,
    /// nothing is sent.
    PreAnnounce,
    /// Only announcements may be sent.
    AnnounceWindow,
    /// Only data frames may be sent to neighbors known to be awake.
    #[default]
    DataWindow,
    /// The station only beacons.
    LowDutyBeaconWindow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeaconCycle {
    phase: Phase,
    intervals: u32,
    low_duty: bool,
}

impl BeaconCycle {
    pub const fn new() -> Self {
        Self {
            phase: Phase::DataWindow,
            intervals: 0,
            low_duty: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of beacon intervals started so far.
    pub fn intervals(&self) -> u32 {
        self.intervals
    }

    pub fn is_low_duty(&self) -> bool {
        self.low_duty
    }

    /// Returns whether the setting changed. Takes effect at the next window
    /// end.
    pub fn set_low_duty(&mut self, enabled: bool) -> bool {
        let changed = self.low_duty != enabled;
        self.low_duty = enabled;
        changed
    }

    /// Starts a new beacon interval.
    ///
    /// Without power save the station stays in the data window. The new
    /// interval is started in any case, an error reports that the previous
    /// one never reached its data window.
    pub fn begin_interval(&mut self, power_save: bool) -> Result<()> {
        let consistent = matches!(
            self.phase,
            Phase::DataWindow | Phase::LowDutyBeaconWindow
        );

        self.intervals = self.intervals.wrapping_add(1);
        self.phase = if power_save {
            Phase::PreAnnounce
        } else {
            Phase::DataWindow
        };

        if consistent {
            Ok(())
        } else {
            Err(Error::InconsistentPhase)
        }
    }

    /// Enters the ATIM window.
    ///
    /// Returns `false` if the window had already been entered early, in which
    /// case entry side effects must not be applied again.
    pub fn open_announce_window(&mut self) -> Result<bool> {
        match self.phase {
            Phase::PreAnnounce => {
                self.phase = Phase::AnnounceWindow;
                Ok(true)
            }
            Phase::AnnounceWindow => Ok(false),
            _ => Err(Error::InconsistentPhase),
        }
    }

    /// Leaves the ATIM window and returns the phase entered.
    pub fn close_announce_window(&mut self) -> Result<Phase> {
        if self.phase != Phase::AnnounceWindow {
            return Err(Error::InconsistentPhase);
        }
        self.phase = if self.low_duty {
            Phase::LowDutyBeaconWindow
        } else {
            Phase::DataWindow
        };
        Ok(self.phase)
    }

    /// Checks that a periodic low-duty beacon is due.
    pub fn low_duty_tick(&self) -> Result<()> {
        if self.phase != Phase::LowDutyBeaconWindow {
            return Err(Error::InconsistentPhase);
        }
        Ok(())
    }

    /// Back to the initial state, keeping the low-duty setting.
    pub fn reset(&mut self) {
        self.phase = Phase::DataWindow;
        self.intervals = 0;
    }
}

impl Default for BeaconCycle {
    fn default() -> Self {
        Self::new()
    }
}
