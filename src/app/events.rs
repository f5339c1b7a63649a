//! Outbound application events.
//!
//! The dispatcher emits these through the [`EventSink`](super::ports::EventSink)
//! port.  Adapters on the other side decide what to do with them: log
//! to serial, count them, record them in tests.

use crate::error::{Error, UpdateError};
use crate::sensors::Reading;

/// What caused a sample-and-publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    ButtonPressed,
    TimerElapsed,
    RemoteRequest,
}

impl Trigger {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ButtonPressed => "button-pressed",
            Self::TimerElapsed => "timer-elapsed",
            Self::RemoteRequest => "remote-request",
        }
    }

    /// Serial console line logged after each sample attempt.
    pub const fn message(self) -> &'static str {
        match self {
            Self::ButtonPressed => "[EVENT] BUTTON-PRESSED",
            Self::TimerElapsed => "[EVENT] TIMER-ELAPSED",
            Self::RemoteRequest => "[EVENT] MQTT-READ-AND-PUBLISH-RECEIVED",
        }
    }
}

/// Outcome of a bus reconnection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// The session was down and has been re-established.
    Reestablished,
    /// The session was already up; nothing was done.
    AlreadyUp,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// A reading was encoded and handed to the message bus.
    Published { trigger: Trigger, reading: Reading, bytes: usize },

    /// Sampling failed; nothing was published.
    SampleFailed { trigger: Trigger, error: Error },

    /// End-to-end latency of a remote sample request.
    Latency { micros: u64, ok: bool },

    /// Button hold: credentials discarded, provisioning restarted.
    Reprovisioning,

    /// Reprovisioning could not be started.
    ReprovisionFailed(Error),

    FirmwareUpdateStarted,

    FirmwareUpdateFailed(UpdateError),

    LinkUp,

    LinkDown,

    /// Result of the reconnection triggered by a link-down.
    Reconnected(LinkStatus),

    ReconnectFailed(Error),

    /// The dispatcher entered its loop.
    Started,
}
