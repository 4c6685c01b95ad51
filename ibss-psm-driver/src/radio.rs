use ibss_psm_frame::MacAddress;

/// Asynchronous radio commands required by the power-save scheduler.
///
/// All commands are fire-and-forget: they start a hardware operation and
/// return immediately. Completion is reported from interrupt context:
///
/// - transmissions started with [`RadioDriverApi::send_async()`] complete
///   with exactly one TX status,
/// - power transitions complete with a power-state response,
/// - beacons handed over with [`RadioDriverApi::send_beacon()`] or
///   programmed with [`RadioDriverApi::beacon_ctrl()`] only report a
///   "beacon sent" notification, they never produce a TX status.
///
/// SAFETY: Radio drivers are not synchronized. All methods SHALL be called
///         from the cooperative scheduler only.
pub trait RadioDriverApi {
    /// The station's own link address.
    fn mac_address(&self) -> MacAddress;

    /// Whether the radio is currently unable to accept a command.
    fn is_busy(&self) -> bool;

    /// Starts transmitting the given MPDU (without FCS).
    fn send_async(&mut self, mpdu: &[u8]);

    /// Powers the RF down (`sleep == true`) or up.
    fn power_transition(&mut self, sleep: bool);

    /// Programs the hardware to send the given beacon at every TBTT.
    fn beacon_ctrl(&mut self, beacon: &[u8]);

    /// Stops hardware beaconing.
    fn beacon_cancel(&mut self);

    /// Sends the given beacon once.
    fn send_beacon(&mut self, beacon: &[u8]);
}
