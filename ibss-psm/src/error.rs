use core::fmt;

/// Failures of station operations.
///
/// None of them is fatal: the station logs and counts each occurrence and
/// keeps running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A queue or the awake-neighbor set is full.
    CapacityExceeded,
    /// An operation required a different beacon-interval phase.
    InconsistentPhase,
    /// No next hop is known for a multi-hop announcement.
    ResolutionFailure,
    /// The radio has been detached.
    DeviceAbsent,
    /// A frame could not be parsed.
    InvalidFrame,
    /// The station configuration is not usable.
    InvalidConfiguration,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::CapacityExceeded => "capacity exceeded",
            Error::InconsistentPhase => "inconsistent beacon-interval phase",
            Error::ResolutionFailure => "next hop unknown",
            Error::DeviceAbsent => "radio detached",
            Error::InvalidFrame => "invalid frame",
            Error::InvalidConfiguration => "invalid configuration",
        };
        f.write_str(msg)
    }
}

impl From<ibss_psm_frame::Error> for Error {
    fn from(_: ibss_psm_frame::Error) -> Self {
        Error::InvalidFrame
    }
}

/// A type alias for `Result<T, ibss_psm::Error>`.
pub type Result<T> = core::result::Result<T, Error>;
