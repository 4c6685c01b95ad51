//! One-shot alarms driving the beacon-interval state machine.

use crate::time::{Duration, Instant, Microseconds};

pub type StationInstant = Instant<Microseconds>;
pub type StationDuration = Duration<Microseconds>;

/// The independent one-shot alarms a station timer must provide.
///
/// Each alarm kind corresponds to a separate compare channel: arming one
/// alarm never affects another one, re-arming an alarm replaces its pending
/// deadline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Alarm {
    /// Start of a beacon interval.
    PreAnnounce,
    /// Start of the ATIM window.
    AnnounceWindowStart,
    /// End of the ATIM window.
    AnnounceWindowEnd,
    /// Periodic software beacon while only beaconing.
    LowDutyBeacon,
}

impl Alarm {
    pub const ALL: [Alarm; 4] = [
        Alarm::PreAnnounce,
        Alarm::AnnounceWindowStart,
        Alarm::AnnounceWindowEnd,
        Alarm::LowDutyBeacon,
    ];
}

/// Platform timer used by the station.
///
/// Implementations call back into the station from interrupt context once
/// an armed alarm expires, passing the instant the alarm had been armed for
/// (not the possibly later instant at which the interrupt ran). This keeps
/// chained deadlines free of interrupt latency drift.
pub trait AlarmTimer {
    fn now(&self) -> StationInstant;

    /// Arms the given one-shot alarm.
    fn arm(&self, alarm: Alarm, at: StationInstant);

    /// Cancels the given alarm if it is pending.
    fn disarm(&self, alarm: Alarm);
}
