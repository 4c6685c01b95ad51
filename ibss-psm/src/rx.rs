//! Receive path.
//!
//! Interrupt context classifies frames with [`classify()`]: announcements
//! are consumed at once, data frames and beacons are queued. The scheduler
//! later drains the queue one frame per pass, see [`Station::receive()`].
use ibss_psm_driver::{RadioDriverApi, StationDuration};
use ibss_psm_frame::{AtimRepr, BeaconInfo, MacAddress, MacHeader, ManagementSubtype};
use ibss_psm_util::{debug, trace, warn};

use crate::{stats::Counter, Error, FrameBuffer, Phase, Result, Station, UpperLayer};

/// How a received frame is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RxClass {
    Announcement(AtimRepr),
    /// A data frame or beacon for the receive queue.
    Queued,
    Ignored,
}

/// Classifies a received MPDU (without FCS). Frames that do not parse or
/// that are addressed to another station are rejected.
pub(crate) fn classify(mpdu: &[u8], own: MacAddress) -> Result<RxClass> {
    let header = MacHeader::new(mpdu)?;
    let destination = header.addr1();
    if destination != own && !destination.is_broadcast() {
        trace!("rx: frame for {}", destination);
        return Err(Error::InvalidFrame);
    }

    let fc = header.frame_control();
    let class = if fc.is_atim() {
        RxClass::Announcement(AtimRepr::parse(&header)?)
    } else if fc.is_beacon() || (fc.is_data() && !fc.is_null_data()) {
        RxClass::Queued
    } else {
        trace!(
            "rx: ignoring {:?}",
            fc.management_subtype().unwrap_or(ManagementSubtype::Unknown)
        );
        RxClass::Ignored
    };
    Ok(class)
}

impl<R: RadioDriverApi, U: UpperLayer> Station<'_, R, U> {
    /// Handles one frame taken from the receive queue.
    pub(crate) fn receive(&mut self, frame: FrameBuffer) {
        let result = match MacHeader::new(&frame[..]) {
            Ok(header) if header.frame_control().is_beacon() => self.receive_beacon(&frame),
            Ok(header) => self.receive_data(&header),
            Err(err) => Err(err.into()),
        };
        if let Err(err) = result {
            trace!("rx: dropped: {}", err);
            self.shared.count(Counter::RxDropped);
        }
    }

    fn receive_data(&mut self, header: &MacHeader<&[u8]>) -> Result<()> {
        let bssid = self.atim.bssid();
        if header.addr3() != bssid {
            trace!("rx: data frame from foreign BSS {}", header.addr3());
            return Err(Error::InvalidFrame);
        }
        self.upper.deliver(header.addr2(), header.body());
        Ok(())
    }

    /// Adopts the timing of beacons from our IBSS.
    fn receive_beacon(&mut self, mpdu: &[u8]) -> Result<()> {
        let beacon = BeaconInfo::parse(mpdu)?;
        if beacon.bssid != self.atim.bssid() || !beacon.is_ibss() {
            trace!("rx: beacon of foreign BSS {}", beacon.bssid);
            return Ok(());
        }

        // Before the first boundary the station has no phase to check
        // against yet.
        let phase = self.shared.phase();
        if self.shared.intervals() > 0
            && !matches!(phase, Phase::PreAnnounce | Phase::AnnounceWindow)
        {
            trace!("rx: beacon in {:?}", phase);
            return Ok(());
        }

        let mut config = self.shared.config();
        let mut timing = config.timing;
        timing.beacon_interval = StationDuration::from_tu(beacon.interval_tu);
        if let Some(atim_window_tu) = beacon.atim_window_tu {
            timing.atim_window = StationDuration::from_tu(atim_window_tu);
        }
        if timing != config.timing {
            if timing.validate().is_err() {
                warn!(
                    "rx: unusable beacon timing {}/{} TU",
                    beacon.interval_tu,
                    beacon.atim_window_tu.unwrap_or(0)
                );
                return Err(Error::InvalidConfiguration);
            }
            debug!(
                "rx: adopting beacon interval {} TU, ATIM window {} TU",
                timing.beacon_interval.as_tu(),
                timing.atim_window.as_tu()
            );
            self.shared.update_config(|config| config.timing = timing);
            config.timing = timing;
        }

        if config.beacon_marks_awake {
            self.shared.mark_awake(beacon.source);
        }
        Ok(())
    }
}
