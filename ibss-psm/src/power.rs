use bitflags::bitflags;

use crate::Phase;

bitflags! {
    /// Reasons to stay awake through the data window of the current beacon
    /// interval. All of them are reset when the next interval starts.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StayAwake: u8 {
        /// An announcement addressed to us was received.
        const ANNOUNCEMENT = 1 << 0;
        /// We sent the beacon of this interval.
        const BEACON = 1 << 1;
        /// Data was pending when the ATIM window started.
        const DATA = 1 << 2;
    }
}

/// Radio power state as seen by the station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PowerState {
    asleep: bool,
    /// Target state of a transition that has not completed yet.
    transition: Option<bool>,
    stay_awake: StayAwake,
}

impl PowerState {
    pub const fn new() -> Self {
        Self {
            asleep: false,
            transition: None,
            stay_awake: StayAwake::empty(),
        }
    }

    pub fn is_asleep(&self) -> bool {
        self.asleep
    }

    pub fn in_transition(&self) -> bool {
        self.transition.is_some()
    }

    /// The radio is awake and stays so.
    pub fn can_transmit(&self) -> bool {
        !self.asleep && self.transition.is_none()
    }

    pub fn stay_awake(&self) -> StayAwake {
        self.stay_awake
    }

    pub fn set_stay_awake(&mut self, reason: StayAwake) {
        self.stay_awake.insert(reason);
    }

    pub fn reset_stay_awake(&mut self) {
        self.stay_awake = StayAwake::empty();
    }

    fn sleep_desired(&self, power_save: bool, phase: Phase) -> bool {
        power_save && phase == Phase::DataWindow && self.stay_awake.is_empty()
    }

    /// Compares the current with the desired power state and returns the
    /// transition to request, if any.
    pub fn update(&mut self, power_save: bool, phase: Phase) -> Option<bool> {
        if self.transition.is_some() {
            return None;
        }
        let sleep = self.sleep_desired(power_save, phase);
        if sleep == self.asleep {
            return None;
        }
        self.transition = Some(sleep);
        Some(sleep)
    }

    /// Records the outcome of a transition and re-evaluates.
    pub fn complete(&mut self, asleep: bool, power_save: bool, phase: Phase) -> Option<bool> {
        self.asleep = asleep;
        self.transition = None;
        self.update(power_save, phase)
    }
}
