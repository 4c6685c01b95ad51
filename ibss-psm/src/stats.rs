use portable_atomic::{AtomicU32, Ordering};

/// Counters of recovered failures.
///
/// Updated from both contexts without locking.
#[derive(Debug, Default)]
pub struct Statistics {
    late_status: AtomicU32,
    stale_announce_cleared: AtomicU32,
    stale_data_cleared: AtomicU32,
    rx_dropped: AtomicU32,
    tx_dropped: AtomicU32,
    awake_overflow: AtomicU32,
    resolution_failures: AtomicU32,
    phase_inconsistencies: AtomicU32,
    tx_failures: AtomicU32,
    events_dropped: AtomicU32,
}

/// A point-in-time copy of [`Statistics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatisticsSnapshot {
    /// TX status reported while no command was outstanding.
    pub late_status: u32,
    pub stale_announce_cleared: u32,
    pub stale_data_cleared: u32,
    pub rx_dropped: u32,
    /// Frames rejected because a transmit queue was full.
    pub tx_dropped: u32,
    pub awake_overflow: u32,
    pub resolution_failures: u32,
    pub phase_inconsistencies: u32,
    pub tx_failures: u32,
    pub events_dropped: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Counter {
    LateStatus,
    StaleAnnounceCleared,
    StaleDataCleared,
    RxDropped,
    TxDropped,
    AwakeOverflow,
    ResolutionFailure,
    PhaseInconsistency,
    TxFailure,
    EventDropped,
}

impl Statistics {
    pub const fn new() -> Self {
        Self {
            late_status: AtomicU32::new(0),
            stale_announce_cleared: AtomicU32::new(0),
            stale_data_cleared: AtomicU32::new(0),
            rx_dropped: AtomicU32::new(0),
            tx_dropped: AtomicU32::new(0),
            awake_overflow: AtomicU32::new(0),
            resolution_failures: AtomicU32::new(0),
            phase_inconsistencies: AtomicU32::new(0),
            tx_failures: AtomicU32::new(0),
            events_dropped: AtomicU32::new(0),
        }
    }

    fn counter(&self, counter: Counter) -> &AtomicU32 {
        match counter {
            Counter::LateStatus => &self.late_status,
            Counter::StaleAnnounceCleared => &self.stale_announce_cleared,
            Counter::StaleDataCleared => &self.stale_data_cleared,
            Counter::RxDropped => &self.rx_dropped,
            Counter::TxDropped => &self.tx_dropped,
            Counter::AwakeOverflow => &self.awake_overflow,
            Counter::ResolutionFailure => &self.resolution_failures,
            Counter::PhaseInconsistency => &self.phase_inconsistencies,
            Counter::TxFailure => &self.tx_failures,
            Counter::EventDropped => &self.events_dropped,
        }
    }

    pub(crate) fn count(&self, counter: Counter) {
        self.counter(counter).fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        let load = |counter| self.counter(counter).load(Ordering::Relaxed);
        StatisticsSnapshot {
            late_status: load(Counter::LateStatus),
            stale_announce_cleared: load(Counter::StaleAnnounceCleared),
            stale_data_cleared: load(Counter::StaleDataCleared),
            rx_dropped: load(Counter::RxDropped),
            tx_dropped: load(Counter::TxDropped),
            awake_overflow: load(Counter::AwakeOverflow),
            resolution_failures: load(Counter::ResolutionFailure),
            phase_inconsistencies: load(Counter::PhaseInconsistency),
            tx_failures: load(Counter::TxFailure),
            events_dropped: load(Counter::EventDropped),
        }
    }

    pub fn reset(&self) {
        for counter in [
            Counter::LateStatus,
            Counter::StaleAnnounceCleared,
            Counter::StaleDataCleared,
            Counter::RxDropped,
            Counter::TxDropped,
            Counter::AwakeOverflow,
            Counter::ResolutionFailure,
            Counter::PhaseInconsistency,
            Counter::TxFailure,
            Counter::EventDropped,
        ] {
            self.counter(counter).store(0, Ordering::Relaxed);
        }
    }
}
