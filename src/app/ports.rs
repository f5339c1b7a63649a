//! Port traits: the hexagonal boundary between the event core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ SampleGuard / Dispatcher (domain)
//! ```
//!
//! Driven adapters (sensor, message bus, indicator, network, event sinks)
//! implement these traits.  The guard and dispatcher consume them via
//! generics, so the core never touches hardware directly and every path
//! runs on the host against mocks.

use crate::error::{LinkError, PublishError, SensorError, UpdateError};
use crate::sensors::Reading;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Blocking humidity / temperature read.
pub trait SensorPort {
    fn read(&mut self) -> Result<Reading, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Message bus port (driven adapter: domain → broker)
// ───────────────────────────────────────────────────────────────

/// Outbound side of the message-bus client.  Inbound control messages
/// reach the core through [`InboundRouter`](super::inbound::InboundRouter).
pub trait MessageBus {
    /// Publish one document to the telemetry topic.
    fn publish(&mut self, payload: &[u8]) -> Result<(), PublishError>;

    /// Re-establish the broker session.
    fn reconnect(&mut self) -> Result<(), PublishError>;

    fn is_connected(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Indicator port (driven adapter: domain → LED)
// ───────────────────────────────────────────────────────────────

/// Single visual indicator.
pub trait IndicatorPort {
    fn toggle(&mut self);

    fn set(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Network ports (driven adapters: domain → WiFi / OTA)
// ───────────────────────────────────────────────────────────────

/// Network bring-up and credential reprovisioning.
pub trait ProvisioningPort {
    /// Join the network.  With `reprovision` set, stored credentials are
    /// discarded and provisioning starts over.
    fn connect(&mut self, reprovision: bool) -> Result<(), LinkError>;

    /// Discard credentials and restart provisioning.
    fn reprovision(&mut self) -> Result<(), LinkError>;
}

/// Firmware-update trigger.  Returns once the update has been started;
/// completion (and the reboot) happen elsewhere.
pub trait FirmwareUpdatePort {
    fn start_update(&mut self) -> Result<(), UpdateError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic microsecond clock.
pub trait Clock {
    fn now_us(&self) -> u64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_us(&self) -> u64 {
        (**self).now_us()
    }
}

// ───────────────────────────────────────────────────────────────
// Composite
// ───────────────────────────────────────────────────────────────

/// Bundles the two network-side adapters so the dispatcher can take
/// them as one `&mut` argument.
pub struct NetworkServices<L, U> {
    pub link: L,
    pub update: U,
}

impl<L: ProvisioningPort, U> ProvisioningPort for NetworkServices<L, U> {
    fn connect(&mut self, reprovision: bool) -> Result<(), LinkError> {
        self.link.connect(reprovision)
    }

    fn reprovision(&mut self) -> Result<(), LinkError> {
        self.link.reprovision()
    }
}

impl<L, U: FirmwareUpdatePort> FirmwareUpdatePort for NetworkServices<L, U> {
    fn start_update(&mut self) -> Result<(), UpdateError> {
        self.update.start_update()
    }
}
