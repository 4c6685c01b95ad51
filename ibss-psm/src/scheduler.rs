//! The dispatch scheduler.
//!
//! Each call to [`Station::schedule()`] drains pending events and then
//! performs at most one action, in this order:
//!
//! 1. rebuild the awake-neighbor set (pre-announce period only),
//! 2. power transitions,
//! 3. beacon control,
//! 4. one received frame (not during the pre-announce period),
//! 5. one transmission, depending on the phase.
//!
//! Transmissions require an awake radio and no outstanding command. The
//! outstanding flags are set atomically with these checks so that the
//! radio never has more than one command in flight.
use ibss_psm_driver::RadioDriverApi;
use ibss_psm_frame::MacAddress;
use ibss_psm_util::{debug, trace, warn};

use crate::{
    command::{AnnouncementRecord, Outcome},
    CommandKind, Event, Phase, PsMode, Station, UpperLayer,
};

/// Requests collected from events, consumed by scheduler passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Requests {
    pub erase_awake: bool,
    pub create_announcements: bool,
    pub power: Option<bool>,
    pub beacon_control: bool,
    pub beacon_cancel: bool,
    pub send_beacon: bool,
}

/// The action performed by a scheduler pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    EraseAwakeNeighbors,
    PowerTransition { sleep: bool },
    BeaconControl,
    BeaconCancel,
    ReceiveFrame,
    SendAnnouncement { destination: MacAddress },
    SendData { destination: MacAddress },
    SendBeacon,
}

impl<R: RadioDriverApi, U: UpperLayer> Station<'_, R, U> {
    /// Runs one scheduler pass. Returns the action performed, `None` if
    /// there was nothing to do.
    pub fn schedule(&mut self) -> Option<Action> {
        self.check_attached().ok()?;

        while let Some(event) = self.shared.events.try_receive() {
            self.handle_event(event);
        }
        self.collect_outcome();

        if self.requests.erase_awake {
            match self.shared.erase_awake_neighbors() {
                Ok(()) => {
                    self.requests.erase_awake = false;
                    trace!("scheduler: awake neighbors erased");
                    return Some(Action::EraseAwakeNeighbors);
                }
                Err(err) => warn!("scheduler: erase postponed: {}", err),
            }
        }

        // Announcements depend on the rebuilt awake set.
        if self.requests.create_announcements && !self.requests.erase_awake {
            self.requests.create_announcements = false;
            self.create_announcements();
        }

        if let Some(sleep) = self.requests.power.take() {
            let radio = self.radio.as_mut()?;
            radio.power_transition(sleep);
            return Some(Action::PowerTransition { sleep });
        }

        if let Some(action) = self.beacon_control() {
            return Some(action);
        }

        if let Some(frame) = self.shared.pop_received() {
            self.receive(frame);
            return Some(Action::ReceiveFrame);
        }

        if self.radio.as_ref()?.is_busy() {
            return None;
        }
        match self.shared.phase() {
            Phase::PreAnnounce => None,
            Phase::AnnounceWindow => self.send_announcement(),
            Phase::DataWindow => self.send_data(),
            Phase::LowDutyBeaconWindow => self.send_low_duty_beacon(),
        }
    }

    pub(crate) fn handle_event(&mut self, event: Event) {
        trace!("scheduler: {:?}", event);
        match event {
            Event::EraseAwakeNeighbors => {
                if self.requests.erase_awake {
                    debug!("scheduler: erase already requested");
                }
                self.requests.erase_awake = true;
            }
            Event::CreateAnnouncements => self.requests.create_announcements = true,
            Event::AnnounceWindowClosed => {
                if !self.atim_queue.is_empty() {
                    debug!("scheduler: {} announcements expired", self.atim_queue.len());
                }
                self.atim_queue.erase_all();
                if self.in_flight == Some(CommandKind::Announcement) {
                    self.in_flight = None;
                }
            }
            Event::PowerTransition { sleep } => self.requests.power = Some(sleep),
            Event::BeaconControl => {
                self.requests.beacon_control = true;
                self.requests.beacon_cancel = false;
            }
            Event::BeaconCancel => {
                self.requests.beacon_cancel = true;
                self.requests.beacon_control = false;
            }
            Event::SendBeacon => self.requests.send_beacon = true,
            Event::ForwardAnnouncement { final_destination } => {
                if self.atim.mode() == PsMode::MultiHop {
                    self.forward_announcement(final_destination);
                }
            }
            // A software beacon not sent in time is skipped.
            Event::PhaseChanged(Phase::PreAnnounce) => self.requests.send_beacon = false,
            Event::FrameReceived
            | Event::PhaseChanged(_)
            | Event::PowerStateChanged { .. }
            | Event::CommandFinished => {}
        }
    }

    /// Collects the outcome of the outstanding command from the shared state.
    pub(crate) fn collect_outcome(&mut self) {
        match self.shared.take_outcome() {
            Some(Outcome::Completed { kind, success }) => self.command_completed(kind, success),
            Some(Outcome::Abandoned { kind }) => {
                if self.in_flight == Some(kind) {
                    self.in_flight = None;
                }
            }
            None => {}
        }
    }

    fn command_completed(&mut self, kind: CommandKind, success: bool) {
        if self.in_flight != Some(kind) {
            // Abandoned at an interval boundary or swept with the window.
            trace!("scheduler: stale completion of {:?}", kind);
            return;
        }
        self.in_flight = None;

        match kind {
            CommandKind::Data => {
                if let Some(frame) = self.tx_queue.pop_front() {
                    if !success {
                        warn!("scheduler: data frame to {} not delivered", frame.destination());
                    }
                }
                self.shared.set_tx_backlog(self.tx_queue.len());
            }
            CommandKind::Announcement => {
                self.atim_queue.pop_front();
            }
        }
    }

    fn beacon_control(&mut self) -> Option<Action> {
        if !(self.requests.beacon_control || self.requests.beacon_cancel) {
            return None;
        }
        if !self.shared.is_idle() || self.radio.as_ref()?.is_busy() {
            return None;
        }

        if self.requests.beacon_cancel {
            self.requests.beacon_cancel = false;
            self.radio.as_mut()?.beacon_cancel();
            return Some(Action::BeaconCancel);
        }

        self.requests.beacon_control = false;
        match self.beacon() {
            Ok(beacon) => {
                self.radio.as_mut()?.beacon_ctrl(&beacon);
                Some(Action::BeaconControl)
            }
            Err(err) => {
                warn!("scheduler: no beacon: {}", err);
                None
            }
        }
    }

    /// Sends the first announcement whose receiver is not known to be awake
    /// yet. The others are dropped: the awake set only grows until the next
    /// pre-announce period.
    fn send_announcement(&mut self) -> Option<Action> {
        if self.in_flight.is_some() {
            return None;
        }

        let shared = self.shared;
        // Announced by someone else.
        let dropped = self
            .atim_queue
            .retain(|atim| !shared.is_awake(&atim.awake_key()));
        if dropped > 0 {
            trace!("scheduler: {} announcements no longer needed", dropped);
        }

        let atim = self.atim_queue.peek_head()?;
        let record = AnnouncementRecord {
            destination: atim.destination(),
            final_destination: atim.final_destination(),
        };
        if !shared.begin_announcement(record) {
            return None;
        }

        self.radio.as_mut()?.send_async(atim.mpdu());
        self.in_flight = Some(CommandKind::Announcement);
        debug!("scheduler: ATIM to {}", record.destination);
        Some(Action::SendAnnouncement {
            destination: record.destination,
        })
    }

    /// Sends the first data frame whose receiver is known to be awake.
    fn send_data(&mut self) -> Option<Action> {
        if self.in_flight.is_some() {
            return None;
        }

        let shared = self.shared;
        let index = self
            .tx_queue
            .position(|frame| shared.is_awake(&frame.awake_key()))?;
        self.tx_queue.move_to_front(index);

        if !shared.begin_data() {
            return None;
        }

        let bssid = self.atim.bssid();
        let frame = self.tx_queue.peek_head_mut()?;
        frame.restore_bssid(bssid);
        let destination = frame.destination();
        self.radio.as_mut()?.send_async(frame.mpdu());
        self.in_flight = Some(CommandKind::Data);
        trace!("scheduler: data to {}", destination);
        Some(Action::SendData { destination })
    }

    fn send_low_duty_beacon(&mut self) -> Option<Action> {
        if !self.requests.send_beacon || !self.shared.is_idle() {
            return None;
        }
        self.requests.send_beacon = false;
        match self.beacon() {
            Ok(beacon) => {
                self.radio.as_mut()?.send_beacon(&beacon);
                Some(Action::SendBeacon)
            }
            Err(err) => {
                warn!("scheduler: no beacon: {}", err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use core::{
        future::Future,
        pin::{pin, Pin},
        task::{Context, Poll, Waker},
    };
    use std::{sync::Arc, task::Wake, vec::Vec};

    use ibss_psm_driver::{Alarm, StationInstant};
    use ibss_psm_frame::{MacAddress, MacHeader};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;
    use crate::{
        test_helpers::{
            atim_frame, beacon_with_timing, config, data_frame, shared, with_fcs, MockRadio,
            MockTimer, MockUpper, RadioCommand, BSSID, NODE_A, NODE_B, NODE_C, OWN,
        },
        Error, StationShared, StayAwake,
    };

    type TestStation<'a> = Station<'a, MockRadio, MockUpper>;

    fn station(shared: &StationShared) -> TestStation<'_> {
        Station::new(shared, MockRadio::new(), MockUpper::default())
    }

    /// Runs scheduler passes until one performs no action.
    fn passes(station: &mut TestStation<'_>) -> Vec<Action> {
        let actions: Vec<_> = core::iter::from_fn(|| station.schedule())
            .take(64)
            .collect();
        assert!(actions.len() < 64, "scheduler does not settle");
        actions
    }

    fn destinations(station: &TestStation<'_>) -> Vec<MacAddress> {
        station
            .tx_queue()
            .iter()
            .map(|frame| frame.destination())
            .collect()
    }

    fn start(shared: &StationShared, timer: &MockTimer) {
        shared.start(timer, StationInstant::new(0)).unwrap();
    }

    #[test]
    fn data_to_awake_neighbor_is_sent_first() {
        let shared = shared(PsMode::Standard);
        let timer = MockTimer::new();
        let mut station = station(&shared);
        start(&shared, &timer);

        for destination in [NODE_A, NODE_B, NODE_C] {
            station
                .enqueue_data_frame(&data_frame(destination, OWN, BSSID, &[1, 2]))
                .unwrap();
        }
        // Nobody is known to be awake yet.
        assert_eq!(passes(&mut station), []);

        timer.fire(&shared, Alarm::PreAnnounce);
        assert_eq!(
            passes(&mut station),
            [Action::EraseAwakeNeighbors, Action::BeaconControl]
        );
        assert_eq!(station.atim_queue().len(), 3);

        timer.fire(&shared, Alarm::AnnounceWindowStart);
        shared.notify_announcement_received(NODE_B);

        assert_eq!(
            station.schedule(),
            Some(Action::SendAnnouncement {
                destination: NODE_A
            })
        );
        // NODE_B announced itself, its ATIM is dropped.
        assert_eq!(station.atim_queue().len(), 2);
        // One command at a time.
        assert_eq!(station.schedule(), None);
        shared.on_tx_status(false);
        assert_eq!(
            station.schedule(),
            Some(Action::SendAnnouncement {
                destination: NODE_C
            })
        );
        shared.on_tx_status(false);
        assert_eq!(station.schedule(), None);
        assert!(station.atim_queue().is_empty());

        timer.fire(&shared, Alarm::AnnounceWindowEnd);
        assert_eq!(
            station.schedule(),
            Some(Action::SendData {
                destination: NODE_B
            })
        );
        assert_eq!(destinations(&station), [NODE_B, NODE_A, NODE_C]);
        assert_eq!(station.in_flight(), Some(CommandKind::Data));
        assert_eq!(shared.outstanding_command(), Some(CommandKind::Data));

        shared.on_tx_status(true);
        assert_eq!(passes(&mut station), []);
        assert_eq!(destinations(&station), [NODE_A, NODE_C]);
        assert_eq!(station.in_flight(), None);
        assert_eq!(station.radio().unwrap().sent().len(), 3);
    }

    #[test]
    fn acked_announcement_releases_data() {
        let shared = shared(PsMode::Standard);
        let timer = MockTimer::new();
        let mut station = station(&shared);
        start(&shared, &timer);

        station
            .enqueue_data_frame(&data_frame(NODE_A, OWN, BSSID, &[7]))
            .unwrap();
        timer.fire(&shared, Alarm::PreAnnounce);
        passes(&mut station);
        timer.fire(&shared, Alarm::AnnounceWindowStart);

        assert_eq!(
            passes(&mut station),
            [Action::SendAnnouncement {
                destination: NODE_A
            }]
        );
        let atim = station.radio().unwrap().sent()[0].to_vec();
        let header = MacHeader::new(&atim[..]).unwrap();
        assert!(header.frame_control().is_atim());
        assert_eq!(header.addr1(), NODE_A);
        assert_eq!(header.addr3(), BSSID);

        shared.on_tx_status(true);
        assert!(shared.is_awake(&NODE_A));
        assert_eq!(passes(&mut station), []);

        timer.fire(&shared, Alarm::AnnounceWindowEnd);
        assert_eq!(
            passes(&mut station),
            [Action::SendData {
                destination: NODE_A
            }]
        );
        assert_eq!(
            station.radio().unwrap().sent()[1],
            &data_frame(NODE_A, OWN, BSSID, &[7])[..]
        );
    }

    #[test]
    fn one_announcement_per_final_destination() {
        let shared = shared(PsMode::MultiHop);
        let timer = MockTimer::new();
        let mut station = station(&shared);
        station.next_hops_mut().insert(NODE_C, NODE_A).unwrap();
        start(&shared, &timer);

        timer.fire(&shared, Alarm::PreAnnounce);
        passes(&mut station);
        timer.fire(&shared, Alarm::AnnounceWindowStart);

        station
            .enqueue_data_frame(&data_frame(NODE_A, OWN, NODE_C, &[1]))
            .unwrap();
        station
            .enqueue_data_frame(&data_frame(NODE_A, OWN, NODE_C, &[2]))
            .unwrap();
        assert_eq!(station.tx_queue().len(), 2);
        assert_eq!(station.atim_queue().len(), 1);

        let atim = station.atim_queue().peek_head().unwrap();
        assert_eq!(atim.destination(), NODE_A);
        assert_eq!(atim.final_destination(), Some(NODE_C));
        // Data enqueued in the window keeps the radio awake.
        assert!(shared.power_status().stay_awake.contains(StayAwake::DATA));
    }

    #[test]
    fn unresolved_next_hop_is_not_announced() {
        let shared = shared(PsMode::MultiHop);
        let timer = MockTimer::new();
        let mut station = station(&shared);
        start(&shared, &timer);

        timer.fire(&shared, Alarm::PreAnnounce);
        passes(&mut station);
        timer.fire(&shared, Alarm::AnnounceWindowStart);

        station
            .enqueue_data_frame(&data_frame(NODE_A, OWN, NODE_C, &[1]))
            .unwrap();
        assert_eq!(station.tx_queue().len(), 1);
        assert!(station.atim_queue().is_empty());
        assert_eq!(shared.stats().resolution_failures, 1);
        assert_eq!(passes(&mut station), []);
    }

    #[test]
    fn multi_hop_data_carries_the_bssid_on_air() {
        let shared = shared(PsMode::MultiHop);
        let timer = MockTimer::new();
        let mut station = station(&shared);
        station.next_hops_mut().insert(NODE_C, NODE_A).unwrap();
        start(&shared, &timer);

        station
            .enqueue_data_frame(&data_frame(NODE_A, OWN, NODE_C, &[9]))
            .unwrap();
        timer.fire(&shared, Alarm::PreAnnounce);
        passes(&mut station);
        timer.fire(&shared, Alarm::AnnounceWindowStart);
        assert_eq!(
            passes(&mut station),
            [Action::SendAnnouncement {
                destination: NODE_A
            }]
        );
        let atim = station.radio().unwrap().sent()[0].to_vec();
        assert_eq!(MacHeader::new(&atim[..]).unwrap().addr3(), NODE_C);

        shared.on_tx_status(true);
        assert!(shared.is_awake(&NODE_A));
        assert!(shared.is_awake(&NODE_C));
        passes(&mut station);

        timer.fire(&shared, Alarm::AnnounceWindowEnd);
        assert_eq!(
            passes(&mut station),
            [Action::SendData {
                destination: NODE_A
            }]
        );
        let data = station.radio().unwrap().sent()[1].to_vec();
        let header = MacHeader::new(&data[..]).unwrap();
        assert_eq!(header.addr1(), NODE_A);
        assert_eq!(header.addr3(), BSSID);
        assert_eq!(header.body(), &[9]);
    }

    #[test]
    fn received_announcement_is_forwarded() {
        let shared = shared(PsMode::MultiHop);
        let timer = MockTimer::new();
        let mut station = station(&shared);
        station.next_hops_mut().insert(NODE_C, NODE_A).unwrap();
        start(&shared, &timer);

        timer.fire(&shared, Alarm::PreAnnounce);
        passes(&mut station);
        timer.fire(&shared, Alarm::AnnounceWindowStart);

        shared.on_frame_received(&with_fcs(&atim_frame(OWN, NODE_B, NODE_C)));
        assert!(shared.is_awake(&NODE_B));
        assert_eq!(
            passes(&mut station),
            [Action::SendAnnouncement {
                destination: NODE_A
            }]
        );
        let atim = station.radio().unwrap().sent()[0].to_vec();
        let header = MacHeader::new(&atim[..]).unwrap();
        assert_eq!(header.addr1(), NODE_A);
        assert_eq!(header.addr2(), OWN);
        assert_eq!(header.addr3(), NODE_C);
    }

    #[test]
    fn erase_waits_for_the_pre_announce_period() {
        let shared = shared(PsMode::Standard);
        let timer = MockTimer::new();
        let mut station = station(&shared);
        start(&shared, &timer);

        timer.fire(&shared, Alarm::PreAnnounce);
        passes(&mut station);
        timer.fire(&shared, Alarm::AnnounceWindowStart);
        shared.notify_announcement_ack(NODE_A);
        timer.fire(&shared, Alarm::AnnounceWindowEnd);
        passes(&mut station);
        assert_eq!(shared.phase(), Phase::DataWindow);

        shared.request_awake_erase();
        assert_eq!(station.schedule(), None);
        assert!(shared.is_awake(&NODE_A));

        timer.fire(&shared, Alarm::PreAnnounce);
        let actions = passes(&mut station);
        let erased = actions
            .iter()
            .filter(|action| **action == Action::EraseAwakeNeighbors)
            .count();
        assert_eq!(erased, 1);

        timer.fire(&shared, Alarm::AnnounceWindowStart);
        assert!(!shared.is_awake(&NODE_A));
    }

    #[test]
    fn radio_sleeps_without_traffic() {
        let shared = shared(PsMode::Standard);
        let timer = MockTimer::new();
        let mut station = station(&shared);
        start(&shared, &timer);

        timer.fire(&shared, Alarm::PreAnnounce);
        passes(&mut station);
        timer.fire(&shared, Alarm::AnnounceWindowStart);
        passes(&mut station);
        timer.fire(&shared, Alarm::AnnounceWindowEnd);
        assert_eq!(
            passes(&mut station),
            [Action::PowerTransition { sleep: true }]
        );
        assert!(shared.power_status().in_transition);
        shared.on_power_state(true);
        assert!(shared.power_status().asleep);

        // Data queued while asleep waits for the next interval.
        station
            .enqueue_data_frame(&data_frame(NODE_A, OWN, BSSID, &[1]))
            .unwrap();
        shared.notify_announcement_ack(NODE_A);
        assert_eq!(passes(&mut station), []);

        timer.fire(&shared, Alarm::PreAnnounce);
        assert_eq!(
            passes(&mut station),
            [
                Action::EraseAwakeNeighbors,
                Action::PowerTransition { sleep: false }
            ]
        );
        shared.on_power_state(false);
        assert!(!shared.power_status().asleep);
        assert!(station
            .radio()
            .unwrap()
            .commands
            .contains(&RadioCommand::PowerTransition { sleep: true }));
    }

    #[test]
    fn without_power_save_data_goes_out_at_once() {
        let shared = shared(PsMode::Disabled);
        let timer = MockTimer::new();
        let mut station = station(&shared);
        start(&shared, &timer);

        timer.fire(&shared, Alarm::PreAnnounce);
        assert_eq!(passes(&mut station), [Action::BeaconControl]);
        assert_eq!(shared.phase(), Phase::DataWindow);

        station
            .enqueue_data_frame(&data_frame(NODE_A, OWN, BSSID, &[1]))
            .unwrap();
        assert!(station.atim_queue().is_empty());
        assert_eq!(
            passes(&mut station),
            [Action::SendData {
                destination: NODE_A
            }]
        );

        // Beacons of a non power-save IBSS carry an ATIM window of 0.
        let RadioCommand::BeaconCtrl(beacon) = &station.radio().unwrap().commands[0] else {
            panic!("no beacon handed to the radio");
        };
        let info = ibss_psm_frame::BeaconInfo::parse(beacon).unwrap();
        assert_eq!(info.atim_window_tu, Some(0));
        assert_eq!(info.bssid, BSSID);
    }

    #[test]
    fn low_duty_beacons_after_the_window() {
        let shared = shared(PsMode::Standard);
        let timer = MockTimer::new();
        let mut station = station(&shared);
        start(&shared, &timer);

        shared.set_low_duty(true);
        timer.fire(&shared, Alarm::PreAnnounce);
        assert_eq!(
            passes(&mut station),
            [Action::EraseAwakeNeighbors, Action::BeaconCancel]
        );
        timer.fire(&shared, Alarm::AnnounceWindowStart);
        passes(&mut station);
        timer.fire(&shared, Alarm::AnnounceWindowEnd);
        assert_eq!(shared.phase(), Phase::LowDutyBeaconWindow);
        assert_eq!(passes(&mut station), []);

        timer.fire(&shared, Alarm::LowDutyBeacon);
        assert_eq!(passes(&mut station), [Action::SendBeacon]);
        assert!(timer.armed(Alarm::LowDutyBeacon).is_some());
        assert!(matches!(
            station.radio().unwrap().commands.last(),
            Some(RadioCommand::SendBeacon(_))
        ));

        shared.set_low_duty(false);
        assert_eq!(passes(&mut station), [Action::BeaconControl]);
    }

    #[test]
    fn received_data_is_delivered() {
        let shared = shared(PsMode::Standard);
        let mut station = station(&shared);

        shared.on_frame_received(&with_fcs(&data_frame(OWN, NODE_A, BSSID, b"hello")));
        shared.on_frame_received(&with_fcs(&data_frame(OWN, NODE_B, NODE_C, b"foreign")));
        assert_eq!(shared.rx_backlog(), 2);

        assert_eq!(
            passes(&mut station),
            [Action::ReceiveFrame, Action::ReceiveFrame]
        );
        assert_eq!(station.upper().delivered, [(NODE_A, b"hello".to_vec())]);
        assert_eq!(shared.stats().rx_dropped, 1);
    }

    #[test]
    fn received_frames_wait_out_the_pre_announce_period() {
        let shared = shared(PsMode::Standard);
        let timer = MockTimer::new();
        let mut station = station(&shared);
        start(&shared, &timer);

        timer.fire(&shared, Alarm::PreAnnounce);
        passes(&mut station);
        shared.on_frame_received(&with_fcs(&data_frame(OWN, NODE_A, BSSID, &[1])));
        assert_eq!(passes(&mut station), []);
        assert_eq!(shared.rx_backlog(), 1);

        timer.fire(&shared, Alarm::AnnounceWindowStart);
        assert_eq!(passes(&mut station), [Action::ReceiveFrame]);
        assert_eq!(station.upper().delivered.len(), 1);
    }

    #[test]
    fn beacon_timing_is_adopted() {
        let shared = shared(PsMode::Standard);
        let mut station = station(&shared);

        shared.on_frame_received(&with_fcs(&beacon_with_timing(NODE_A, BSSID, 200, 30)));
        assert_eq!(passes(&mut station), [Action::ReceiveFrame]);
        let timing = shared.config().timing;
        assert_eq!(timing.beacon_interval.as_tu(), 200);
        assert_eq!(timing.atim_window.as_tu(), 30);

        // Unusable timing is rejected.
        shared.on_frame_received(&with_fcs(&beacon_with_timing(NODE_A, BSSID, 20, 30)));
        passes(&mut station);
        assert_eq!(shared.config().timing.beacon_interval.as_tu(), 200);
        assert_eq!(shared.stats().rx_dropped, 1);

        // Foreign IBSS.
        shared.on_frame_received(&with_fcs(&beacon_with_timing(NODE_A, NODE_B, 300, 30)));
        passes(&mut station);
        assert_eq!(shared.config().timing.beacon_interval.as_tu(), 200);
    }

    #[test]
    fn beacons_mark_their_sender_awake() {
        let shared = StationShared::new(crate::StationConfig {
            beacon_marks_awake: true,
            ..config(PsMode::Standard)
        })
        .unwrap();
        let timer = MockTimer::new();
        let mut station = station(&shared);
        start(&shared, &timer);

        timer.fire(&shared, Alarm::PreAnnounce);
        passes(&mut station);
        timer.fire(&shared, Alarm::AnnounceWindowStart);
        shared.on_frame_received(&with_fcs(&beacon_with_timing(NODE_A, BSSID, 100, 20)));
        passes(&mut station);
        assert!(shared.is_awake(&NODE_A));
    }

    #[test]
    fn full_tx_queue_rejects_frames() {
        let shared = shared(PsMode::Standard);
        let mut station = station(&shared);
        let capacity = station.tx_queue().capacity();

        for _ in 0..capacity {
            station
                .enqueue_data_frame(&data_frame(NODE_A, OWN, BSSID, &[]))
                .unwrap();
        }
        assert_eq!(
            station.enqueue_data_frame(&data_frame(NODE_A, OWN, BSSID, &[])),
            Err(Error::CapacityExceeded)
        );
        assert_eq!(station.tx_queue().len(), capacity);
        assert_eq!(shared.stats().tx_dropped, 1);

        // Not a data frame.
        assert!(station
            .enqueue_data_frame(&atim_frame(NODE_A, OWN, BSSID))
            .is_err());
        assert_eq!(shared.stats().tx_dropped, 2);
    }

    #[test]
    fn lost_data_status_is_resent() {
        let shared = shared(PsMode::Disabled);
        let timer = MockTimer::new();
        let mut station = station(&shared);
        start(&shared, &timer);

        station
            .enqueue_data_frame(&data_frame(NODE_A, OWN, BSSID, &[1]))
            .unwrap();
        assert_eq!(
            passes(&mut station),
            [Action::SendData {
                destination: NODE_A
            }]
        );

        // The data flag survives one boundary. Beacon control waits for
        // the radio to become idle.
        timer.fire(&shared, Alarm::PreAnnounce);
        assert_eq!(passes(&mut station), []);
        timer.fire(&shared, Alarm::PreAnnounce);
        assert_eq!(
            passes(&mut station),
            [
                Action::BeaconControl,
                Action::SendData {
                    destination: NODE_A
                }
            ]
        );
        assert_eq!(shared.stats().stale_data_cleared, 1);
        assert_eq!(station.tx_queue().len(), 1);
    }

    #[test]
    fn detached_station_does_nothing() {
        let shared = shared(PsMode::Standard);
        let timer = MockTimer::new();
        let mut station = station(&shared);
        start(&shared, &timer);
        station
            .enqueue_data_frame(&data_frame(NODE_A, OWN, BSSID, &[1]))
            .unwrap();
        timer.fire(&shared, Alarm::PreAnnounce);

        let radio = station.detach().unwrap();
        assert_eq!(radio.address, OWN);
        assert!(!shared.is_attached());
        assert_eq!(station.schedule(), None);
        assert!(station.tx_queue().is_empty());
        assert_eq!(
            station.enqueue_data_frame(&data_frame(NODE_A, OWN, BSSID, &[1])),
            Err(Error::DeviceAbsent)
        );
        assert_eq!(
            shared.start(&timer, StationInstant::new(0)),
            Err(Error::DeviceAbsent)
        );
    }

    /// Random interleavings of interrupts and scheduler passes never put a
    /// second command on the radio.
    #[test]
    fn at_most_one_command_outstanding() {
        let _ = env_logger::builder().is_test(true).try_init();

        for seed in 0..8 {
            let mut rng = StdRng::seed_from_u64(seed);
            let shared = shared(PsMode::MultiHop);
            let timer = MockTimer::new();
            let mut station = station(&shared);
            station.next_hops_mut().insert(NODE_C, NODE_B).unwrap();
            start(&shared, &timer);

            let nodes = [NODE_A, NODE_B, NODE_C];
            let mut in_air = false;
            let mut power_target = None;
            let mut sent = 0;

            for _ in 0..2000 {
                match rng.random_range(0..7) {
                    0 => {
                        let node = nodes[rng.random_range(0..nodes.len())];
                        let addr3 = if node == NODE_C { NODE_C } else { BSSID };
                        let _ = station.enqueue_data_frame(&data_frame(node, OWN, addr3, &[0]));
                    }
                    1 => {
                        let alarm = timer.next().unwrap();
                        timer.fire(&shared, alarm);
                        if shared.outstanding_command().is_none() {
                            // Status lost, flag cleared at the boundary.
                            in_air = false;
                        }
                    }
                    2 if in_air && rng.random_bool(0.8) => {
                        shared.on_tx_status(rng.random_bool(0.5));
                        in_air = false;
                    }
                    3 => {
                        let node = nodes[rng.random_range(0..nodes.len())];
                        shared.notify_announcement_received(node);
                    }
                    4 => {
                        if let Some(sleep) = power_target.take() {
                            shared.on_power_state(sleep);
                        }
                    }
                    _ => {
                        let before = shared.outstanding_command();
                        let action = station.schedule();
                        match action {
                            Some(Action::SendAnnouncement { .. }) | Some(Action::SendData { .. }) => {
                                assert_eq!(before, None);
                                assert!(!in_air);
                                assert!(!shared.power_status().asleep);
                                assert!(shared.outstanding_command().is_some());
                                in_air = true;
                                sent += 1;
                            }
                            Some(Action::PowerTransition { sleep }) => power_target = Some(sleep),
                            _ => {}
                        }
                    }
                }
                assert!(station.atim_queue().len() <= station.atim_queue().capacity());
            }
            assert_eq!(station.radio().unwrap().sent().len(), sent);
        }
    }

    #[test]
    fn announced_neighbors_leave_the_atim_queue() {
        let shared = shared(PsMode::Standard);
        let timer = MockTimer::new();
        let mut station = station(&shared);
        start(&shared, &timer);

        for destination in [NODE_A, NODE_B, NODE_C] {
            station
                .enqueue_data_frame(&data_frame(destination, OWN, BSSID, &[1]))
                .unwrap();
        }
        timer.fire(&shared, Alarm::PreAnnounce);
        passes(&mut station);
        timer.fire(&shared, Alarm::AnnounceWindowStart);
        shared.notify_announcement_received(NODE_A);
        shared.notify_announcement_received(NODE_C);

        assert_eq!(
            station.schedule(),
            Some(Action::SendAnnouncement {
                destination: NODE_B
            })
        );
        assert_eq!(station.atim_queue().len(), 1);
        shared.on_tx_status(true);
        assert_eq!(passes(&mut station), []);
        assert!(station.atim_queue().is_empty());
    }

    #[test]
    fn completion_survives_a_full_event_queue() {
        let shared = shared(PsMode::Disabled);
        let timer = MockTimer::new();
        let mut station = station(&shared);
        start(&shared, &timer);

        for payload in [1, 2] {
            station
                .enqueue_data_frame(&data_frame(NODE_A, OWN, BSSID, &[payload]))
                .unwrap();
        }
        assert_eq!(
            station.schedule(),
            Some(Action::SendData {
                destination: NODE_A
            })
        );

        while shared.events.send(Event::FrameReceived).is_ok() {}
        shared.on_tx_status(true);
        assert_eq!(
            passes(&mut station),
            [Action::SendData {
                destination: NODE_A
            }]
        );
        assert_eq!(station.tx_queue().len(), 1);

        shared.on_tx_status(true);
        assert_eq!(passes(&mut station), []);
        assert!(station.tx_queue().is_empty());
        assert_eq!(station.in_flight(), None);
        assert_eq!(shared.stats().events_dropped, 0);
    }

    #[test]
    fn stop_releases_the_in_flight_command() {
        let shared = shared(PsMode::Standard);
        let timer = MockTimer::new();
        let mut station = station(&shared);
        start(&shared, &timer);

        station
            .enqueue_data_frame(&data_frame(NODE_A, OWN, BSSID, &[1]))
            .unwrap();
        timer.fire(&shared, Alarm::PreAnnounce);
        passes(&mut station);
        timer.fire(&shared, Alarm::AnnounceWindowStart);
        passes(&mut station);
        shared.on_tx_status(true);
        timer.fire(&shared, Alarm::AnnounceWindowEnd);
        assert_eq!(
            passes(&mut station),
            [Action::SendData {
                destination: NODE_A
            }]
        );

        shared.stop(&timer);
        assert_eq!(timer.next(), None);
        assert_eq!(shared.outstanding_command(), None);
        assert!(!shared.is_awake(&NODE_A));

        // The frame waits for the next announcement.
        assert_eq!(passes(&mut station), []);
        assert_eq!(station.in_flight(), None);
        assert_eq!(station.tx_queue().len(), 1);
    }

    struct NoopWaker;

    impl Wake for NoopWaker {
        fn wake(self: Arc<Self>) {}
    }

    fn poll_once<F: Future>(future: Pin<&mut F>) -> Poll<F::Output> {
        let waker = Waker::from(Arc::new(NoopWaker));
        let mut cx = Context::from_waker(&waker);
        future.poll(&mut cx)
    }

    #[test]
    fn run_loop_waits_for_events() {
        let shared = shared(PsMode::Standard);
        let timer = MockTimer::new();
        let mut station = station(&shared);
        start(&shared, &timer);
        timer.fire(&shared, Alarm::PreAnnounce);

        {
            let mut run = pin!(station.run());
            assert!(poll_once(run.as_mut()).is_pending());
            assert!(poll_once(run.as_mut()).is_pending());
        }
        assert!(shared.events.is_empty());
        assert!(matches!(
            station.radio().unwrap().commands[..],
            [RadioCommand::BeaconCtrl(_)]
        ));
    }

    #[pollster::test]
    async fn interrupts_wake_the_scheduler() {
        let shared = shared(PsMode::Standard);
        let timer = MockTimer::new();
        start(&shared, &timer);

        timer.fire(&shared, Alarm::PreAnnounce);
        assert_eq!(shared.events.receive().await, Event::BeaconControl);
        assert_eq!(shared.events.receive().await, Event::EraseAwakeNeighbors);
    }
}
