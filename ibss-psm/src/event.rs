use ibss_psm_frame::MacAddress;

use crate::Phase;

/// Notifications posted from interrupt context to the cooperative
/// scheduler.
///
/// Events that carry no request only wake up the run loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// Rebuild the awake-neighbor set for the new interval.
    EraseAwakeNeighbors,
    /// Announce the queued data frames.
    CreateAnnouncements,
    /// Drop all announcements that could not be sent.
    AnnounceWindowClosed,
    PowerTransition { sleep: bool },
    /// Start firmware beaconing.
    BeaconControl,
    /// Stop firmware beaconing.
    BeaconCancel,
    /// Send one software beacon.
    SendBeacon,
    /// The outstanding command completed or was abandoned. The outcome
    /// itself is kept in the shared state.
    CommandFinished,
    /// A received announcement has to be relayed towards its final
    /// destination.
    ForwardAnnouncement { final_destination: MacAddress },
    FrameReceived,
    PhaseChanged(Phase),
    PowerStateChanged { asleep: bool },
}

impl Event {
    /// Events that only wake up the run loop. The scheduler finds the
    /// underlying state without them, so they give way to requests in a full
    /// event queue.
    pub fn is_wake_up(&self) -> bool {
        match self {
            Event::FrameReceived | Event::PowerStateChanged { .. } | Event::CommandFinished => {
                true
            }
            Event::PhaseChanged(phase) => *phase != Phase::PreAnnounce,
            _ => false,
        }
    }
}
