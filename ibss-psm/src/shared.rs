//! The interrupt-shared half of a station.
//!
//! Timer, radio and RX interrupts call into [`StationShared`]. Handlers only
//! update state inside short critical sections and post [`Event`]s for the
//! cooperative [`crate::Station`]. They never block and never touch the
//! radio.
use heapless::Vec;
use ibss_psm_driver::{
    const_config::{AWAKE_NODES_CAPACITY, EVENT_QUEUE_CAPACITY, RX_QUEUE_CAPACITY},
    Alarm, AlarmTimer, StationInstant,
};
use ibss_psm_frame::{fcs, AtimRepr, MacAddress};
use ibss_psm_util::{
    debug, error, trace,
    sync::{EventChannel, IrqCell},
    warn,
};
use portable_atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::{
    command::{AnnouncementRecord, Completion, Outcome, OutstandingCommands},
    rx::{classify, RxClass},
    stats::{Counter, Statistics, StatisticsSnapshot},
    AwakeNeighbors, BeaconCycle, CommandKind, Error, Event, FrameBuffer, FrameQueue, Phase,
    PowerState, PsMode, Result, StationConfig, StayAwake,
};

/// Events posted by a single handler invocation.
type Events = Vec<Event, 8>;

#[derive(Debug, Default)]
struct InterruptState {
    cycle: BeaconCycle,
    power: PowerState,
    commands: OutstandingCommands,
}

impl InterruptState {
    const fn new() -> Self {
        Self {
            cycle: BeaconCycle::new(),
            power: PowerState::new(),
            commands: OutstandingCommands::new(),
        }
    }

    fn update_power(&mut self, mode: PsMode, events: &mut Events) {
        if let Some(sleep) = self.power.update(mode.is_enabled(), self.cycle.phase()) {
            push(events, Event::PowerTransition { sleep });
        }
    }
}

fn push(events: &mut Events, event: Event) {
    // Sized for the longest handler.
    let _ = events.push(event);
}

/// Radio power as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerStatus {
    pub asleep: bool,
    pub in_transition: bool,
    pub stay_awake: StayAwake,
}

/// State of a station shared between interrupt handlers and the cooperative
/// scheduler.
pub struct StationShared {
    attached: AtomicBool,
    address: IrqCell<MacAddress>,
    config: IrqCell<StationConfig>,
    state: IrqCell<InterruptState>,
    awake: IrqCell<AwakeNeighbors<AWAKE_NODES_CAPACITY>>,
    rx_queue: IrqCell<FrameQueue<FrameBuffer, RX_QUEUE_CAPACITY>>,
    pub(crate) events: EventChannel<Event, EVENT_QUEUE_CAPACITY>,
    tx_backlog: AtomicUsize,
    stats: Statistics,
}

impl StationShared {
    pub fn new(config: StationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            attached: AtomicBool::new(false),
            address: IrqCell::new(MacAddress::default()),
            config: IrqCell::new(config),
            state: IrqCell::new(InterruptState::new()),
            awake: IrqCell::new(AwakeNeighbors::new()),
            rx_queue: IrqCell::new(FrameQueue::new()),
            events: EventChannel::new(),
            tx_backlog: AtomicUsize::new(0),
            stats: Statistics::new(),
        })
    }

    pub(crate) fn attach(&self, address: MacAddress) {
        self.address.set(address);
        self.attached.store(true, Ordering::Release);
        debug!("station: attached as {}", address);
    }

    pub(crate) fn detach(&self) {
        self.attached.store(false, Ordering::Release);
        critical_section::with(|cs| {
            self.state.lock_in(cs, |state| *state = InterruptState::new());
            self.awake.lock_in(cs, |awake| awake.clear());
            self.rx_queue.lock_in(cs, |rx_queue| rx_queue.erase_all());
        });
        self.events.clear();
        self.tx_backlog.store(0, Ordering::Relaxed);
        debug!("station: detached");
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    /// Rejects calls while no radio is attached.
    fn check_attached(&self) -> Result<()> {
        if self.is_attached() {
            Ok(())
        } else {
            error!("station: radio detached");
            Err(Error::DeviceAbsent)
        }
    }

    pub fn address(&self) -> MacAddress {
        self.address.get()
    }

    pub fn config(&self) -> StationConfig {
        self.config.lock(|config| config.clone())
    }

    pub fn ps_mode(&self) -> PsMode {
        self.config.lock(|config| config.ps_mode)
    }

    pub(crate) fn update_config(&self, f: impl FnOnce(&mut StationConfig)) {
        self.config.lock(f)
    }

    pub fn phase(&self) -> Phase {
        self.state.lock(|state| state.cycle.phase())
    }

    /// Number of beacon intervals started since [`StationShared::start()`].
    pub fn intervals(&self) -> u32 {
        self.state.lock(|state| state.cycle.intervals())
    }

    pub fn power_status(&self) -> PowerStatus {
        self.state.lock(|state| PowerStatus {
            asleep: state.power.is_asleep(),
            in_transition: state.power.in_transition(),
            stay_awake: state.power.stay_awake(),
        })
    }

    pub fn outstanding_command(&self) -> Option<CommandKind> {
        self.state.lock(|state| state.commands.outstanding())
    }

    /// Takes the outcome of the last command, if the scheduler has not seen
    /// it yet.
    pub(crate) fn take_outcome(&self) -> Option<Outcome> {
        self.state.lock(|state| state.commands.take_outcome())
    }

    pub fn stats(&self) -> StatisticsSnapshot {
        self.stats.snapshot()
    }

    pub(crate) fn count(&self, counter: Counter) {
        self.stats.count(counter);
    }

    pub(crate) fn set_tx_backlog(&self, len: usize) {
        self.tx_backlog.store(len, Ordering::Relaxed);
    }

    /// Posts events in order. A full queue sheds pending wake-ups to make
    /// room for requests. Wake-ups and forwarding requests that are already
    /// pending are not posted twice.
    fn post(&self, events: Events) {
        for event in events {
            let coalesce =
                event.is_wake_up() || matches!(event, Event::ForwardAnnouncement { .. });
            if coalesce && self.events.contains(&event) {
                continue;
            }
            if self.events.send_evicting(event, Event::is_wake_up).is_err() {
                // The pending events wake up the scheduler anyway.
                if event.is_wake_up() {
                    continue;
                }
                warn!("station: event queue full, dropping {:?}", event);
                self.stats.count(Counter::EventDropped);
            }
        }
    }

    /// Starts the beacon-interval cycle with the first target beacon
    /// transmission time.
    pub fn start<T: AlarmTimer>(&self, timer: &T, first_tbtt: StationInstant) -> Result<()> {
        self.check_attached()?;
        self.state.lock(|state| state.cycle.reset());
        timer.arm(Alarm::PreAnnounce, first_tbtt);
        debug!("station: first interval at {} us", first_tbtt.tick());
        Ok(())
    }

    /// Stops the cycle. The station stays awake in the data window.
    ///
    /// No boundary clears the outstanding flags after this, so a command
    /// still in flight is abandoned. The awake-neighbor set is emptied.
    pub fn stop<T: AlarmTimer>(&self, timer: &T) {
        for alarm in Alarm::ALL {
            timer.disarm(alarm);
        }
        let mut events = Events::new();
        critical_section::with(|cs| {
            let stale = self.state.lock_in(cs, |state| {
                state.cycle.reset();
                state.power.reset_stay_awake();
                // Without power save the station never sleeps.
                state.update_power(PsMode::Disabled, &mut events);
                state.commands.abandon_all()
            });
            if stale.announcement || stale.data {
                debug!("station: stopped with a command in flight");
                push(&mut events, Event::CommandFinished);
            }
            self.awake.lock_in(cs, |awake| awake.clear());
        });
        self.post(events);
    }

    /// Enables or disables low-duty operation, in which the station only
    /// beacons after the ATIM window.
    pub fn set_low_duty(&self, enabled: bool) {
        let changed = self.state.lock(|state| state.cycle.set_low_duty(enabled));
        if !changed {
            return;
        }
        let mut events = Events::new();
        push(
            &mut events,
            if enabled {
                Event::BeaconCancel
            } else {
                Event::BeaconControl
            },
        );
        self.post(events);
    }

    /// Requests the awake-neighbor set to be rebuilt. The request is
    /// executed by the scheduler during the next pre-announce period.
    pub fn request_awake_erase(&self) {
        let mut events = Events::new();
        push(&mut events, Event::EraseAwakeNeighbors);
        self.post(events);
    }

    /// Timer interrupt handler. `at` is the instant the alarm was armed for.
    pub fn on_alarm<T: AlarmTimer>(&self, timer: &T, alarm: Alarm, at: StationInstant) {
        if self.check_attached().is_err() {
            return;
        }
        trace!("station: alarm {:?} at {} us", alarm, at.tick());
        match alarm {
            Alarm::PreAnnounce => self.pre_announce(timer, at),
            Alarm::AnnounceWindowStart => self.announce_window_start(timer, at),
            Alarm::AnnounceWindowEnd => self.announce_window_end(timer, at),
            Alarm::LowDutyBeacon => self.low_duty_beacon(timer, at),
        }
    }

    fn pre_announce<T: AlarmTimer>(&self, timer: &T, at: StationInstant) {
        let (mode, timing) = self.config.lock(|config| (config.ps_mode, config.timing));
        let mut events = Events::new();

        let (consistent, stale, start_beaconing) = self.state.lock(|state| {
            let consistent = state.cycle.begin_interval(mode.is_enabled());
            let stale = state.commands.clear_stale();
            if mode.is_enabled() {
                state.power.reset_stay_awake();
            }
            state.update_power(mode, &mut events);
            let start_beaconing = state.cycle.intervals() == 1 && !state.cycle.is_low_duty();
            (consistent, stale, start_beaconing)
        });

        timer.disarm(Alarm::LowDutyBeacon);
        timer.arm(Alarm::PreAnnounce, at + timing.beacon_interval);

        if let Err(err) = consistent {
            warn!("station: interval boundary: {}", err);
            self.stats.count(Counter::PhaseInconsistency);
        }
        if stale.announcement {
            warn!("station: announcement status lost");
            self.stats.count(Counter::StaleAnnounceCleared);
            push(&mut events, Event::CommandFinished);
        }
        if stale.data {
            warn!("station: data status lost");
            self.stats.count(Counter::StaleDataCleared);
            push(&mut events, Event::CommandFinished);
        }
        if start_beaconing {
            push(&mut events, Event::BeaconControl);
        }

        if mode.is_enabled() {
            timer.arm(Alarm::AnnounceWindowStart, at + timing.pre_announce);
            push(&mut events, Event::EraseAwakeNeighbors);
            push(&mut events, Event::CreateAnnouncements);
            push(&mut events, Event::PhaseChanged(Phase::PreAnnounce));
        }
        self.post(events);
    }

    fn announce_window_start<T: AlarmTimer>(&self, timer: &T, at: StationInstant) {
        let atim_window = self.config.lock(|config| config.timing.atim_window);
        let mut events = Events::new();
        let opened = self.state.lock(|state| {
            let opened = state.cycle.open_announce_window()?;
            if opened {
                self.enter_announce_window(state, &mut events);
            }
            Ok::<_, Error>(opened)
        });

        match opened {
            Ok(opened) => {
                if !opened {
                    trace!("station: announce window entered early");
                }
                timer.arm(Alarm::AnnounceWindowEnd, at + atim_window);
            }
            Err(err) => {
                error!("station: announce window start: {}", err);
                self.stats.count(Counter::PhaseInconsistency);
            }
        }
        self.post(events);
    }

    fn enter_announce_window(&self, state: &mut InterruptState, events: &mut Events) {
        if self.tx_backlog.load(Ordering::Relaxed) > 0 {
            state.power.set_stay_awake(StayAwake::DATA);
        }
        push(events, Event::PhaseChanged(Phase::AnnounceWindow));
    }

    fn announce_window_end<T: AlarmTimer>(&self, timer: &T, at: StationInstant) {
        let (mode, period) = self
            .config
            .lock(|config| (config.ps_mode, config.timing.low_duty_beacon_period));
        let mut events = Events::new();
        let closed = self.state.lock(|state| {
            let phase = state.cycle.close_announce_window()?;
            state.update_power(mode, &mut events);
            Ok::<_, Error>(phase)
        });

        match closed {
            Ok(phase) => {
                push(&mut events, Event::AnnounceWindowClosed);
                push(&mut events, Event::PhaseChanged(phase));
                if phase == Phase::LowDutyBeaconWindow {
                    timer.arm(Alarm::LowDutyBeacon, at + period);
                }
            }
            Err(err) => {
                error!("station: announce window end: {}", err);
                self.stats.count(Counter::PhaseInconsistency);
            }
        }
        self.post(events);
    }

    fn low_duty_beacon<T: AlarmTimer>(&self, timer: &T, at: StationInstant) {
        let period = self
            .config
            .lock(|config| config.timing.low_duty_beacon_period);
        match self.state.lock(|state| state.cycle.low_duty_tick()) {
            Ok(()) => {
                timer.arm(Alarm::LowDutyBeacon, at + period);
                let mut events = Events::new();
                push(&mut events, Event::SendBeacon);
                self.post(events);
            }
            Err(err) => {
                warn!("station: low duty beacon: {}", err);
                self.stats.count(Counter::PhaseInconsistency);
            }
        }
    }

    /// The hardware sent our beacon. Enters the ATIM window early if the
    /// pre-announce period is still running.
    pub fn on_beacon_sent(&self) {
        if self.check_attached().is_err() {
            return;
        }
        let mode = self.ps_mode();
        let mut events = Events::new();
        self.state.lock(|state| {
            state.power.set_stay_awake(StayAwake::BEACON);
            if mode.is_enabled() && state.cycle.phase() == Phase::PreAnnounce {
                // Cannot fail in the pre-announce period.
                if let Ok(true) = state.cycle.open_announce_window() {
                    self.enter_announce_window(state, &mut events);
                }
            }
            state.update_power(mode, &mut events);
        });
        self.post(events);
    }

    /// Power transition response of the radio.
    pub fn on_power_state(&self, asleep: bool) {
        if self.check_attached().is_err() {
            return;
        }
        let mode = self.ps_mode();
        let mut events = Events::new();
        self.state.lock(|state| {
            if let Some(sleep) =
                state
                    .power
                    .complete(asleep, mode.is_enabled(), state.cycle.phase())
            {
                push(&mut events, Event::PowerTransition { sleep });
            }
        });
        push(&mut events, Event::PowerStateChanged { asleep });
        self.post(events);
    }

    /// TX status of the outstanding data frame or announcement.
    pub fn on_tx_status(&self, success: bool) {
        if self.check_attached().is_err() {
            return;
        }
        let (mode, bssid) = self.config.lock(|config| (config.ps_mode, config.bssid));
        let mut events = Events::new();

        critical_section::with(|cs| {
            let (completion, phase) = self.state.lock_in(cs, |state| {
                (state.commands.complete(success), state.cycle.phase())
            });

            match completion {
                None => {
                    warn!("station: late TX status");
                    self.stats.count(Counter::LateStatus);
                    return;
                }
                Some(Completion::Data) => {}
                Some(Completion::Announcement(record)) => {
                    if phase != Phase::AnnounceWindow {
                        warn!("station: announcement status in {:?}", phase);
                    }
                    if success || record.destination.is_broadcast() {
                        self.awake.lock_in(cs, |awake| {
                            self.insert_awake(awake, record.destination);
                            if let Some(final_destination) = record.final_destination {
                                if mode == PsMode::MultiHop
                                    && final_destination != bssid
                                    && !final_destination.is_group()
                                {
                                    self.insert_awake(awake, final_destination);
                                }
                            }
                        });
                    }
                }
            }

            if !success {
                self.stats.count(Counter::TxFailure);
            }
            push(&mut events, Event::CommandFinished);
        });
        self.post(events);
    }

    fn insert_awake(&self, awake: &mut AwakeNeighbors<AWAKE_NODES_CAPACITY>, address: MacAddress) {
        if awake
            .insert_if_absent(address, AWAKE_NODES_CAPACITY)
            .is_err()
        {
            warn!("station: awake set full, dropping {}", address);
            self.stats.count(Counter::AwakeOverflow);
        }
    }

    /// Marks `source` awake after an announcement from it.
    ///
    /// Ignored during the pre-announce period, where the set is rebuilt.
    fn announcement_received(&self, source: MacAddress) -> bool {
        let mode = self.ps_mode();
        if !mode.is_enabled() {
            return false;
        }

        let mut events = Events::new();
        let accepted = critical_section::with(|cs| {
            self.state.lock_in(cs, |state| {
                let phase = state.cycle.phase();
                if !matches!(phase, Phase::PreAnnounce | Phase::AnnounceWindow) {
                    return false;
                }
                if phase != Phase::PreAnnounce {
                    self.awake
                        .lock_in(cs, |awake| self.insert_awake(awake, source));
                }
                state.power.set_stay_awake(StayAwake::ANNOUNCEMENT);
                state.update_power(mode, &mut events);
                true
            })
        });
        self.post(events);
        accepted
    }

    /// Announcement received by a radio that parses ATIMs itself.
    pub fn notify_announcement_received(&self, source: MacAddress) {
        if self.check_attached().is_err() {
            return;
        }
        if !self.announcement_received(source) {
            trace!("station: announcement from {} ignored", source);
        }
    }

    /// Announcement acknowledged, reported by a radio that tracks ATIM ACKs
    /// itself.
    pub fn notify_announcement_ack(&self, destination: MacAddress) {
        if self.check_attached().is_err() {
            return;
        }
        self.awake
            .lock(|awake| self.insert_awake(awake, destination));
    }

    /// Marks the sender of a beacon of our IBSS awake, same gate as for
    /// received announcements.
    pub(crate) fn mark_awake(&self, address: MacAddress) {
        critical_section::with(|cs| {
            if self.state.lock_in(cs, |state| state.cycle.phase()) == Phase::PreAnnounce {
                return;
            }
            self.awake
                .lock_in(cs, |awake| self.insert_awake(awake, address));
        });
    }

    /// Whether `address` is known to be awake in the current interval.
    ///
    /// Without power save every neighbor is awake. During the pre-announce
    /// period no neighbor is.
    pub fn is_awake(&self, address: &MacAddress) -> bool {
        if !self.ps_mode().is_enabled() {
            return true;
        }
        critical_section::with(|cs| {
            if self.state.lock_in(cs, |state| state.cycle.phase()) == Phase::PreAnnounce {
                return false;
            }
            self.awake.lock_in(cs, |awake| awake.contains(address))
        })
    }

    pub(crate) fn with_awake_neighbors<R>(
        &self,
        f: impl FnOnce(&AwakeNeighbors<AWAKE_NODES_CAPACITY>) -> R,
    ) -> R {
        self.awake.lock(|awake| f(awake))
    }

    /// Clears the awake-neighbor set. Only allowed during the pre-announce
    /// period.
    pub(crate) fn erase_awake_neighbors(&self) -> Result<()> {
        critical_section::with(|cs| {
            if self.state.lock_in(cs, |state| state.cycle.phase()) != Phase::PreAnnounce {
                return Err(Error::InconsistentPhase);
            }
            self.awake.lock_in(cs, |awake| awake.clear());
            Ok(())
        })
    }

    /// Atomically checks that the radio may transmit in `phase` and that no
    /// command is outstanding, then marks a data send as outstanding.
    pub(crate) fn begin_data(&self) -> bool {
        self.state.lock(|state| {
            state.cycle.phase() == Phase::DataWindow
                && state.power.can_transmit()
                && state.commands.begin_data()
        })
    }

    /// Like [`Self::begin_data()`] for an announcement in the ATIM window.
    pub(crate) fn begin_announcement(&self, record: AnnouncementRecord) -> bool {
        self.state.lock(|state| {
            state.cycle.phase() == Phase::AnnounceWindow
                && state.power.can_transmit()
                && state.commands.begin_announcement(record)
        })
    }

    /// No command is outstanding and the radio is awake.
    pub(crate) fn is_idle(&self) -> bool {
        self.state
            .lock(|state| state.commands.is_idle() && state.power.can_transmit())
    }

    /// Marks data enqueued during the ATIM window as pending for the data
    /// window.
    pub(crate) fn note_data_pending(&self) {
        self.state.lock(|state| {
            if state.cycle.phase() == Phase::AnnounceWindow {
                state.power.set_stay_awake(StayAwake::DATA);
            }
        });
    }

    /// RX interrupt handler. `mpdu` includes the FCS.
    pub fn on_frame_received(&self, mpdu: &[u8]) {
        if self.check_attached().is_err() {
            return;
        }
        let (verify_fcs, mode, bssid) = self
            .config
            .lock(|config| (config.verify_fcs, config.ps_mode, config.bssid));

        let mpdu = if verify_fcs {
            fcs::check_and_strip(mpdu)
        } else {
            fcs::strip(mpdu)
        };
        let Ok(mpdu) = mpdu else {
            trace!("station: bad FCS");
            self.stats.count(Counter::RxDropped);
            return;
        };

        let class = match classify(mpdu, self.address()) {
            Ok(class) => class,
            Err(_) => {
                self.stats.count(Counter::RxDropped);
                return;
            }
        };

        match class {
            RxClass::Announcement(atim) => self.receive_announcement(&atim, mode, bssid),
            RxClass::Queued => self.queue_received(mpdu),
            RxClass::Ignored => {}
        }
    }

    fn receive_announcement(&self, atim: &AtimRepr, mode: PsMode, bssid: MacAddress) {
        if !self.announcement_received(atim.source) {
            trace!("station: announcement from {} dropped", atim.source);
            self.stats.count(Counter::RxDropped);
            return;
        }

        if mode == PsMode::MultiHop
            && !atim.destination.is_broadcast()
            && atim.addr3 != self.address()
            && atim.addr3 != bssid
            && !atim.addr3.is_group()
        {
            let mut events = Events::new();
            push(
                &mut events,
                Event::ForwardAnnouncement {
                    final_destination: atim.addr3,
                },
            );
            self.post(events);
        }
    }

    fn queue_received(&self, mpdu: &[u8]) {
        let Ok(frame) = FrameBuffer::from_slice(mpdu) else {
            self.stats.count(Counter::RxDropped);
            return;
        };
        let queued = self
            .rx_queue
            .lock(|rx_queue| rx_queue.push_tail(frame, RX_QUEUE_CAPACITY).is_ok());
        if !queued {
            warn!("station: RX queue full");
            self.stats.count(Counter::RxDropped);
            return;
        }
        let mut events = Events::new();
        push(&mut events, Event::FrameReceived);
        self.post(events);
    }

    /// Takes the oldest received frame. Received frames are held back during
    /// the pre-announce period.
    pub(crate) fn pop_received(&self) -> Option<FrameBuffer> {
        critical_section::with(|cs| {
            if self.state.lock_in(cs, |state| state.cycle.phase()) == Phase::PreAnnounce {
                return None;
            }
            self.rx_queue.lock_in(cs, |rx_queue| rx_queue.pop_front())
        })
    }

    pub fn rx_backlog(&self) -> usize {
        self.rx_queue.lock(|rx_queue| rx_queue.len())
    }
}
