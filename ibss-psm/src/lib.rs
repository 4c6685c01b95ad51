//! IEEE 802.11 IBSS power-save coordination and transmission scheduling.
//!
//! A battery powered station in an ad-hoc network sleeps through most of
//! each beacon interval. It only stays awake for the data window if it
//! announced traffic with an ATIM during the ATIM window, or if a neighbor
//! announced traffic to it. This crate decides per beacon interval
//!
//! - when the radio may sleep,
//! - which neighbors are known to be awake,
//! - in which order announcements and data frames go to the radio.
//!
//! A station is split into two halves:
//!
//! - [`StationShared`] is called from interrupt context: timer alarms, TX
//!   status, power-state responses and received frames. Handlers never
//!   block, they update state in critical sections and post [`Event`]s.
//! - [`Station`] owns the radio, the transmit queues and the route table.
//!   Its scheduler ([`Station::schedule()`]) performs at most one radio
//!   command per pass and never has more than one transmission in flight.
//!
//! ```ignore
//! static SHARED: StaticCell<StationShared> = StaticCell::new();
//!
//! let shared = SHARED.init(StationShared::new(StationConfig::default())?);
//! let mut station = Station::new(shared, radio, upper);
//! shared.start(&timer, timer.now() + StationDuration::from_tu(100))?;
//!
//! // Forward interrupts:
//! //   timer  -> shared.on_alarm(&timer, alarm, at)
//! //   radio  -> shared.on_tx_status(ok), shared.on_power_state(asleep),
//! //             shared.on_beacon_sent(), shared.on_frame_received(mpdu)
//! station.run().await;
//! ```

#![no_std]

#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;

pub use ibss_psm_driver as driver;
pub use ibss_psm_frame as ieee80211;

mod atim;
mod command;
mod config;
mod error;
mod event;
mod frame;
mod neighbors;
mod next_hop;
mod phase;
mod power;
mod queue;
mod rx;
mod scheduler;
mod shared;
mod station;
mod stats;

#[cfg(test)]
mod test_helpers;

pub use atim::{AtimEngine, SequenceCounter};
pub use command::{AnnouncementRecord, CommandKind, Outcome, OutstandingCommands};
pub use config::{
    PsMode, StationConfig, Timing, DEFAULT_BSSID, DEFAULT_CHANNEL, DEFAULT_RATES, DEFAULT_SSID,
};
pub use error::{Error, Result};
pub use event::Event;
pub use frame::{FrameBuffer, QueuedFrame};
pub use neighbors::AwakeNeighbors;
pub use next_hop::NextHopMap;
pub use phase::{BeaconCycle, Phase};
pub use power::{PowerState, StayAwake};
pub use queue::FrameQueue;
pub use scheduler::Action;
pub use shared::{PowerStatus, StationShared};
pub use station::{Station, UpperLayer};
pub use stats::{Statistics, StatisticsSnapshot};
