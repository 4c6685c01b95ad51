//! The cooperative half of a station.
use ibss_psm_driver::{
    const_config::{ATIM_QUEUE_CAPACITY, NEXT_HOP_CAPACITY, TX_QUEUE_CAPACITY},
    RadioDriverApi,
};
use ibss_psm_frame::{BeaconRepr, MacAddress};
use ibss_psm_util::{debug, error, warn};

use crate::{
    scheduler::Requests, stats::Counter, AtimEngine, CommandKind, Error, FrameBuffer, FrameQueue,
    NextHopMap, Phase, PsMode, QueuedFrame, Result, StationShared,
};

/// Receiver of the payload of data frames accepted by the station.
pub trait UpperLayer {
    fn deliver(&mut self, source: MacAddress, payload: &[u8]);
}

/// Owns the radio and all transmit state of a station.
///
/// The station is driven by [`Station::run()`] or, for custom executors, by
/// calling [`Station::schedule()`] whenever an event was posted to the
/// [`StationShared`] half.
pub struct Station<'a, R: RadioDriverApi, U: UpperLayer> {
    pub(crate) shared: &'a StationShared,
    pub(crate) radio: Option<R>,
    pub(crate) upper: U,
    pub(crate) tx_queue: FrameQueue<QueuedFrame, TX_QUEUE_CAPACITY>,
    pub(crate) atim_queue: FrameQueue<QueuedFrame, ATIM_QUEUE_CAPACITY>,
    pub(crate) next_hops: NextHopMap<NEXT_HOP_CAPACITY>,
    pub(crate) atim: AtimEngine,
    pub(crate) requests: Requests,
    /// The command whose frame sits at the head of its queue.
    pub(crate) in_flight: Option<CommandKind>,
}

impl<'a, R: RadioDriverApi, U: UpperLayer> Station<'a, R, U> {
    /// Attaches `radio` to `shared`.
    pub fn new(shared: &'a StationShared, radio: R, upper: U) -> Self {
        let address = radio.mac_address();
        let config = shared.config();
        shared.attach(address);
        Self {
            shared,
            radio: Some(radio),
            upper,
            tx_queue: FrameQueue::new(),
            atim_queue: FrameQueue::new(),
            next_hops: NextHopMap::new(),
            atim: AtimEngine::new(config.ps_mode, address, config.bssid),
            requests: Requests::default(),
            in_flight: None,
        }
    }

    /// Tears the station down and hands the radio back. Pending frames are
    /// dropped.
    pub fn detach(&mut self) -> Option<R> {
        self.shared.detach();
        self.tx_queue.erase_all();
        self.atim_queue.erase_all();
        self.requests = Requests::default();
        self.in_flight = None;
        self.radio.take()
    }

    pub(crate) fn check_attached(&self) -> Result<()> {
        if self.radio.is_some() && self.shared.is_attached() {
            Ok(())
        } else {
            error!("station: radio detached");
            Err(Error::DeviceAbsent)
        }
    }

    pub fn shared(&self) -> &'a StationShared {
        self.shared
    }

    pub fn radio(&self) -> Option<&R> {
        self.radio.as_ref()
    }

    pub fn radio_mut(&mut self) -> Option<&mut R> {
        self.radio.as_mut()
    }

    pub fn upper(&self) -> &U {
        &self.upper
    }

    pub fn upper_mut(&mut self) -> &mut U {
        &mut self.upper
    }

    pub fn tx_queue(&self) -> &FrameQueue<QueuedFrame, TX_QUEUE_CAPACITY> {
        &self.tx_queue
    }

    pub fn atim_queue(&self) -> &FrameQueue<QueuedFrame, ATIM_QUEUE_CAPACITY> {
        &self.atim_queue
    }

    /// The route table consulted for multi-hop announcements.
    pub fn next_hops_mut(&mut self) -> &mut NextHopMap<NEXT_HOP_CAPACITY> {
        &mut self.next_hops
    }

    pub fn in_flight(&self) -> Option<CommandKind> {
        self.in_flight
    }

    /// Queues a data MPDU (without FCS) for transmission.
    ///
    /// In multi-hop mode address 3 may carry the final destination, it is
    /// replaced by the BSSID before the frame is sent.
    pub fn enqueue_data_frame(&mut self, mpdu: &[u8]) -> Result<()> {
        self.check_attached()?;
        let mode = self.atim.mode();
        let frame = QueuedFrame::data(mpdu, self.atim.bssid(), mode == PsMode::MultiHop)
            .map_err(|err| {
                self.shared.count(Counter::TxDropped);
                err
            })?;

        // Frames queued after the announcements were created are announced
        // right away.
        let announce = mode.is_enabled()
            && matches!(
                self.shared.phase(),
                Phase::PreAnnounce | Phase::AnnounceWindow
            )
            && self
                .shared
                .with_awake_neighbors(|awake| self.atim.needs_announcement(&frame, awake));
        let (destination, final_destination) = (frame.destination(), frame.final_destination());

        if self.tx_queue.push_tail(frame, TX_QUEUE_CAPACITY).is_err() {
            warn!("station: TX queue full, dropping frame to {}", destination);
            self.shared.count(Counter::TxDropped);
            return Err(Error::CapacityExceeded);
        }
        self.shared.set_tx_backlog(self.tx_queue.len());

        if announce {
            self.shared.note_data_pending();
            self.announce(destination, final_destination);
        }
        Ok(())
    }

    pub(crate) fn announce(&mut self, destination: MacAddress, final_destination: Option<MacAddress>) {
        match self.atim.announce(
            &mut self.atim_queue,
            &self.next_hops,
            destination,
            final_destination,
        ) {
            Ok(_) => {}
            Err(Error::ResolutionFailure) => self.shared.count(Counter::ResolutionFailure),
            Err(err) => {
                warn!("station: announcement to {} dropped: {}", destination, err);
                self.shared.count(Counter::TxDropped);
            }
        }
    }

    /// Queues announcements for all data frames whose receivers are not
    /// known to be awake.
    pub(crate) fn create_announcements(&mut self) {
        if !self.atim.mode().is_enabled() {
            warn!("station: announcements requested without power save");
            return;
        }

        for index in 0..self.tx_queue.len() {
            let Some(frame) = self.tx_queue.peek(index) else {
                break;
            };
            let atim = &self.atim;
            if !self
                .shared
                .with_awake_neighbors(|awake| atim.needs_announcement(frame, awake))
            {
                continue;
            }
            let (destination, final_destination) =
                (frame.destination(), frame.final_destination());
            self.announce(destination, final_destination);
        }
        debug!("station: {} announcements queued", self.atim_queue.len());
    }

    /// Relays a received multi-hop announcement towards its final
    /// destination.
    pub(crate) fn forward_announcement(&mut self, final_destination: MacAddress) {
        debug!("station: forwarding announcement for {}", final_destination);
        self.announce(final_destination, Some(final_destination));
    }

    /// Emits the IBSS beacon of this station.
    pub(crate) fn beacon(&mut self) -> Result<FrameBuffer> {
        let config = self.shared.config();
        let atim_window_tu = if config.ps_mode.is_enabled() {
            config.timing.atim_window.as_tu() as u16
        } else {
            0
        };
        let repr = BeaconRepr {
            source: self.shared.address(),
            bssid: config.bssid,
            interval_tu: config.timing.beacon_interval.as_tu() as u16,
            ssid: &config.ssid,
            rates: &config.rates,
            channel: config.channel,
            atim_window_tu,
            sequence_control: self.atim.next_sequence_control(),
        };

        let mut buffer = FrameBuffer::new();
        buffer
            .resize(repr.buffer_len(), 0)
            .map_err(|_| Error::CapacityExceeded)?;
        repr.emit(&mut buffer)?;
        Ok(buffer)
    }

    /// Runs scheduler passes until none performs an action, then waits for
    /// the next event.
    pub async fn run(&mut self) -> ! {
        loop {
            while self.schedule().is_some() {}
            let event = self.shared.events.receive().await;
            self.handle_event(event);
        }
    }
}
