//! Unified error types for the SensorNode firmware.
//!
//! A single `Error` enum that every subsystem converts into, so the
//! dispatcher can log and count failures uniformly.  All variants are
//! `Copy`: they travel through the event sink and stats counters
//! without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The event queue rejected an event.
    Queue(QueueError),
    /// The sensor could not be read.
    Sensor(SensorError),
    /// The message bus rejected or dropped a publish.
    Publish(PublishError),
    /// The outbound document did not fit its buffer.
    Encode(EncodeError),
    /// The network link could not be brought up.
    Link(LinkError),
    /// The firmware-update trigger refused to start.
    Update(UpdateError),
    /// The sample guard could not be acquired in time.
    Guard(GuardError),
    /// Peripheral or task initialisation failed.
    Init(&'static str),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queue(e) => write!(f, "queue: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Publish(e) => write!(f, "publish: {e}"),
            Self::Encode(e) => write!(f, "encode: {e}"),
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Update(e) => write!(f, "update: {e}"),
            Self::Guard(e) => write!(f, "guard: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Event queue errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// No free slot (immediately, or within the send timeout).
    Full,
    /// The queue has been closed; no further events are accepted.
    Closed,
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "event queue full"),
            Self::Closed => write!(f, "event queue closed"),
        }
    }
}

impl From<QueueError> for Error {
    fn from(e: QueueError) -> Self {
        Self::Queue(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// I2C transfer failed (arbitration, bus fault, timeout).
    Bus,
    /// The sensor did not acknowledge its address.
    NoAcknowledge,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus => write!(f, "I2C bus error"),
            Self::NoAcknowledge => write!(f, "sensor did not acknowledge"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Message bus errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishError {
    /// Client is not connected to the broker.
    NotConnected,
    /// Broker or client rejected the message.
    Rejected,
    /// Client could not be (re)created.
    ClientInit,
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "message bus not connected"),
            Self::Rejected => write!(f, "publish rejected"),
            Self::ClientInit => write!(f, "message bus client init failed"),
        }
    }
}

impl From<PublishError> for Error {
    fn from(e: PublishError) -> Self {
        Self::Publish(e)
    }
}

// ---------------------------------------------------------------------------
// Encoder errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    /// The document does not fit in `capacity` bytes.
    Overflow { capacity: usize },
    /// The serializer failed for a reason other than space.
    Serialize,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overflow { capacity } => {
                write!(f, "document exceeds {capacity}-byte buffer")
            }
            Self::Serialize => write!(f, "serialization failed"),
        }
    }
}

impl From<EncodeError> for Error {
    fn from(e: EncodeError) -> Self {
        Self::Encode(e)
    }
}

// ---------------------------------------------------------------------------
// Network link errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

// ---------------------------------------------------------------------------
// Firmware update errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateError {
    /// An update is already in progress.
    AlreadyRunning,
    /// No update URL configured.
    NoSource,
    /// The update task could not be spawned.
    SpawnFailed,
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRunning => write!(f, "update already running"),
            Self::NoSource => write!(f, "no firmware URL configured"),
            Self::SpawnFailed => write!(f, "update task spawn failed"),
        }
    }
}

impl From<UpdateError> for Error {
    fn from(e: UpdateError) -> Self {
        Self::Update(e)
    }
}

// ---------------------------------------------------------------------------
// Sample guard errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardError {
    /// Another holder kept the guard past the configured wait.
    Timeout,
}

impl fmt::Display for GuardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timed out waiting for sample guard"),
        }
    }
}

impl From<GuardError> for Error {
    fn from(e: GuardError) -> Self {
        Self::Guard(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
