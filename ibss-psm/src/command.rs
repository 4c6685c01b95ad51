//! Bookkeeping of the single outstanding radio command.
use ibss_psm_frame::MacAddress;

/// The commands that complete with a TX status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandKind {
    Data,
    Announcement,
}

/// The announcement most recently handed to the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnouncementRecord {
    pub destination: MacAddress,
    pub final_destination: Option<MacAddress>,
}

/// What a TX status completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Data,
    Announcement(AnnouncementRecord),
}

/// How an outstanding command ended, kept until the scheduler collects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// The radio reported a TX status.
    Completed { kind: CommandKind, success: bool },
    /// The TX status never arrived. The flag was cleared without it.
    Abandoned { kind: CommandKind },
}

/// Flags cleared at an interval boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StaleCommands {
    pub announcement: bool,
    pub data: bool,
}

/// At most one of "data send pending" and "announce send pending" is set.
///
/// The outcome of a command stays here until it is taken. No new command
/// can begin before that, so an outcome is never overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutstandingCommands {
    data_send_pending: bool,
    announce_send_pending: bool,
    data_pending_at_boundary: bool,
    last_announcement: Option<AnnouncementRecord>,
    outcome: Option<Outcome>,
}

impl OutstandingCommands {
    pub const fn new() -> Self {
        Self {
            data_send_pending: false,
            announce_send_pending: false,
            data_pending_at_boundary: false,
            last_announcement: None,
            outcome: None,
        }
    }

    pub fn outstanding(&self) -> Option<CommandKind> {
        if self.announce_send_pending {
            Some(CommandKind::Announcement)
        } else if self.data_send_pending {
            Some(CommandKind::Data)
        } else {
            None
        }
    }

    pub fn is_idle(&self) -> bool {
        self.outstanding().is_none()
    }

    /// Idle, and the outcome of the previous command was collected.
    fn can_begin(&self) -> bool {
        self.is_idle() && self.outcome.is_none()
    }

    /// Takes the outcome of the last command.
    pub fn take_outcome(&mut self) -> Option<Outcome> {
        self.outcome.take()
    }

    pub fn last_announcement(&self) -> Option<AnnouncementRecord> {
        self.last_announcement
    }

    /// Marks a data send as outstanding unless another command is.
    pub fn begin_data(&mut self) -> bool {
        if !self.can_begin() {
            return false;
        }
        self.data_send_pending = true;
        true
    }

    /// Marks an announcement send as outstanding unless another command is.
    pub fn begin_announcement(&mut self, record: AnnouncementRecord) -> bool {
        if !self.can_begin() {
            return false;
        }
        self.announce_send_pending = true;
        self.last_announcement = Some(record);
        true
    }

    /// Routes a TX status to the outstanding command and records its
    /// outcome. `None` means the status is late: nothing was outstanding.
    pub fn complete(&mut self, success: bool) -> Option<Completion> {
        let completion = if self.announce_send_pending {
            self.announce_send_pending = false;
            // Set together with the flag.
            self.last_announcement.map(Completion::Announcement)
        } else if self.data_send_pending {
            self.data_send_pending = false;
            self.data_pending_at_boundary = false;
            Some(Completion::Data)
        } else {
            None
        }?;

        let kind = match completion {
            Completion::Data => CommandKind::Data,
            Completion::Announcement(_) => CommandKind::Announcement,
        };
        self.outcome = Some(Outcome::Completed { kind, success });
        Some(completion)
    }

    fn record_abandoned(&mut self, stale: StaleCommands) {
        if stale.announcement {
            self.outcome = Some(Outcome::Abandoned {
                kind: CommandKind::Announcement,
            });
        } else if stale.data {
            self.outcome = Some(Outcome::Abandoned {
                kind: CommandKind::Data,
            });
        }
    }

    /// Clears flags whose TX status never arrived: an announcement at the
    /// first boundary, data at the second consecutive one.
    pub fn clear_stale(&mut self) -> StaleCommands {
        let announcement = core::mem::take(&mut self.announce_send_pending);
        let data = self.data_send_pending && self.data_pending_at_boundary;
        if data {
            self.data_send_pending = false;
        }
        self.data_pending_at_boundary = self.data_send_pending;
        let stale = StaleCommands { announcement, data };
        self.record_abandoned(stale);
        stale
    }

    /// Clears every flag, e.g. when the cycle stops and no boundary will
    /// clear them any more.
    pub fn abandon_all(&mut self) -> StaleCommands {
        let stale = StaleCommands {
            announcement: core::mem::take(&mut self.announce_send_pending),
            data: core::mem::take(&mut self.data_send_pending),
        };
        self.data_pending_at_boundary = false;
        self.record_abandoned(stale);
        stale
    }
}
