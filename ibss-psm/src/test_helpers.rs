//! Frame builders and mock collaborators for unit tests.
use core::cell::RefCell;
use std::{collections::HashMap, vec::Vec};

use ibss_psm_driver::{Alarm, AlarmTimer, RadioDriverApi, StationInstant};
use ibss_psm_frame::{
    fcs, AtimRepr, BeaconRepr, FrameControl, FrameControlFlags, FrameType, MacAddress, MacHeader,
    DATA_SUBTYPE_NULL, HEADER_LEN,
};

use crate::{PsMode, StationConfig, StationShared, UpperLayer, DEFAULT_BSSID};

pub const OWN: MacAddress = MacAddress::new([0x02, 0, 0, 0, 0, 0x01]);
pub const NODE_A: MacAddress = MacAddress::new([0x02, 0, 0, 0, 0, 0x0a]);
pub const NODE_B: MacAddress = MacAddress::new([0x02, 0, 0, 0, 0, 0x0b]);
pub const NODE_C: MacAddress = MacAddress::new([0x02, 0, 0, 0, 0, 0x0c]);
pub const BSSID: MacAddress = DEFAULT_BSSID;

fn header_only(fc: FrameControl, dst: MacAddress, src: MacAddress, addr3: MacAddress) -> Vec<u8> {
    let mut mpdu = vec![0u8; HEADER_LEN];
    let mut header = MacHeader::new_unchecked(&mut mpdu[..]);
    header.set_frame_control(fc);
    header.set_addr1(dst);
    header.set_addr2(src);
    header.set_addr3(addr3);
    header.set_sequence_control(0x0120);
    mpdu
}

pub fn data_frame(dst: MacAddress, src: MacAddress, addr3: MacAddress, payload: &[u8]) -> Vec<u8> {
    let mut mpdu = header_only(FrameControl::data(), dst, src, addr3);
    mpdu.extend_from_slice(payload);
    mpdu
}

pub fn null_frame(dst: MacAddress, src: MacAddress, addr3: MacAddress) -> Vec<u8> {
    let fc = FrameControl::new(FrameType::Data, DATA_SUBTYPE_NULL, FrameControlFlags::empty());
    header_only(fc, dst, src, addr3)
}

pub fn atim_frame(dst: MacAddress, src: MacAddress, addr3: MacAddress) -> Vec<u8> {
    let mut mpdu = vec![0u8; HEADER_LEN];
    AtimRepr {
        destination: dst,
        source: src,
        addr3,
        sequence_control: 0x0200,
    }
    .emit(&mut mpdu)
    .unwrap();
    mpdu
}

pub fn beacon_with_timing(src: MacAddress, bssid: MacAddress, interval_tu: u16, atim_window_tu: u16) -> Vec<u8> {
    let repr = BeaconRepr {
        source: src,
        bssid,
        interval_tu,
        ssid: b"ibss-psm",
        rates: &[0x82, 0x84],
        channel: 6,
        atim_window_tu,
        sequence_control: 0,
    };
    let mut mpdu = vec![0u8; repr.buffer_len()];
    repr.emit(&mut mpdu).unwrap();
    mpdu
}

/// A beacon with the default timing.
pub fn beacon_frame(src: MacAddress, bssid: MacAddress) -> Vec<u8> {
    beacon_with_timing(src, bssid, 100, 20)
}

pub fn with_fcs(mpdu: &[u8]) -> Vec<u8> {
    let mut frame = mpdu.to_vec();
    frame.extend_from_slice(&fcs::compute(mpdu).to_le_bytes());
    frame
}

pub fn config(mode: PsMode) -> StationConfig {
    StationConfig {
        ps_mode: mode,
        ..Default::default()
    }
}

/// A shared half attached as [`OWN`].
pub fn shared(mode: PsMode) -> StationShared {
    let shared = StationShared::new(config(mode)).unwrap();
    shared.attach(OWN);
    shared
}

/// Records the armed alarms. Tests fire them explicitly.
pub struct MockTimer {
    now: RefCell<StationInstant>,
    alarms: RefCell<HashMap<Alarm, StationInstant>>,
}

impl MockTimer {
    pub fn new() -> Self {
        Self {
            now: RefCell::new(StationInstant::new(0)),
            alarms: RefCell::new(HashMap::new()),
        }
    }

    pub fn armed(&self, alarm: Alarm) -> Option<StationInstant> {
        self.alarms.borrow().get(&alarm).copied()
    }

    /// The alarm that expires first.
    pub fn next(&self) -> Option<Alarm> {
        self.alarms
            .borrow()
            .iter()
            .min_by_key(|(_, at)| **at)
            .map(|(alarm, _)| *alarm)
    }

    /// Expires `alarm` and calls the station's handler.
    pub fn fire(&self, shared: &StationShared, alarm: Alarm) {
        let at = self
            .alarms
            .borrow_mut()
            .remove(&alarm)
            .unwrap_or_else(|| panic!("{alarm:?} not armed"));
        *self.now.borrow_mut() = at;
        shared.on_alarm(self, alarm, at);
    }
}

impl AlarmTimer for MockTimer {
    fn now(&self) -> StationInstant {
        *self.now.borrow()
    }

    fn arm(&self, alarm: Alarm, at: StationInstant) {
        self.alarms.borrow_mut().insert(alarm, at);
    }

    fn disarm(&self, alarm: Alarm) {
        self.alarms.borrow_mut().remove(&alarm);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioCommand {
    Send(Vec<u8>),
    PowerTransition { sleep: bool },
    BeaconCtrl(Vec<u8>),
    BeaconCancel,
    SendBeacon(Vec<u8>),
}

/// Records all commands. Completions are injected by the tests.
pub struct MockRadio {
    pub address: MacAddress,
    pub busy: bool,
    pub commands: Vec<RadioCommand>,
}

impl MockRadio {
    pub fn new() -> Self {
        Self {
            address: OWN,
            busy: false,
            commands: Vec::new(),
        }
    }

    /// MPDUs handed over with `send_async()`.
    pub fn sent(&self) -> Vec<&[u8]> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                RadioCommand::Send(mpdu) => Some(&mpdu[..]),
                _ => None,
            })
            .collect()
    }
}

impl RadioDriverApi for MockRadio {
    fn mac_address(&self) -> MacAddress {
        self.address
    }

    fn is_busy(&self) -> bool {
        self.busy
    }

    fn send_async(&mut self, mpdu: &[u8]) {
        self.commands.push(RadioCommand::Send(mpdu.to_vec()));
    }

    fn power_transition(&mut self, sleep: bool) {
        self.commands.push(RadioCommand::PowerTransition { sleep });
    }

    fn beacon_ctrl(&mut self, beacon: &[u8]) {
        self.commands.push(RadioCommand::BeaconCtrl(beacon.to_vec()));
    }

    fn beacon_cancel(&mut self) {
        self.commands.push(RadioCommand::BeaconCancel);
    }

    fn send_beacon(&mut self, beacon: &[u8]) {
        self.commands.push(RadioCommand::SendBeacon(beacon.to_vec()));
    }
}

#[derive(Default)]
pub struct MockUpper {
    pub delivered: Vec<(MacAddress, Vec<u8>)>,
}

impl UpperLayer for MockUpper {
    fn deliver(&mut self, source: MacAddress, payload: &[u8]) {
        self.delivered.push((source, payload.to_vec()));
    }
}
