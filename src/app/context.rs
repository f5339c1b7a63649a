//! Shared runtime state, built once at startup.
//!
//! [`EventHub`] holds what producers touch (queue, latency probe, edge
//! latch) and has no generic parameters, so ISR glue, timer callbacks and
//! the message-bus callback can all hold a `&'static EventHub`.
//! [`NodeContext`] adds the sample guard and configuration for the
//! dispatcher.  Nothing here is a file-level static.

use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use crate::config::NodeConfig;
use crate::drivers::button::EdgeLatch;
use crate::error::Result;
use crate::events::EventQueue;

use super::guard::{SampleGuard, SharedDevices};
use super::ports::{IndicatorPort, MessageBus, SensorPort};

// ───────────────────────────────────────────────────────────────
// Latency probe
// ───────────────────────────────────────────────────────────────

/// Start timestamp of the remote sample request in flight.
///
/// Armed by the inbound router when it enqueues the request, taken by
/// the dispatcher when the sample completes.  A 64-bit timestamp does
/// not fit an atomic on every target, so the cell sits behind a
/// critical-section mutex.
pub struct LatencyProbe {
    start_us: Mutex<CriticalSectionRawMutex, Cell<Option<u64>>>,
}

impl LatencyProbe {
    pub const fn new() -> Self {
        Self {
            start_us: Mutex::new(Cell::new(None)),
        }
    }

    /// Record `now_us` as the start.  If a start is already recorded the
    /// earlier one is kept and `false` is returned.
    pub fn arm(&self, now_us: u64) -> bool {
        self.start_us.lock(|cell| {
            if cell.get().is_some() {
                return false;
            }
            cell.set(Some(now_us));
            true
        })
    }

    /// Take the recorded start, leaving the probe disarmed.
    pub fn take(&self) -> Option<u64> {
        self.start_us.lock(Cell::take)
    }

    pub fn is_armed(&self) -> bool {
        self.start_us.lock(|cell| cell.get().is_some())
    }
}

impl Default for LatencyProbe {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// Event hub (producer side)
// ───────────────────────────────────────────────────────────────

pub struct EventHub {
    pub queue: EventQueue,
    pub latency: LatencyProbe,
    pub edges: EdgeLatch,
}

impl EventHub {
    pub fn new(config: &NodeConfig) -> Self {
        Self {
            queue: EventQueue::new(),
            latency: LatencyProbe::new(),
            edges: EdgeLatch::from_config(config),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Node context (consumer side)
// ───────────────────────────────────────────────────────────────

pub struct NodeContext<'h, S, B, I> {
    hub: &'h EventHub,
    guard: SampleGuard<S, B, I>,
    config: NodeConfig,
}

impl<'h, S, B, I> NodeContext<'h, S, B, I>
where
    S: SensorPort,
    B: MessageBus,
    I: IndicatorPort,
{
    /// Validate `config` and wire the devices behind the sample guard.
    pub fn new(hub: &'h EventHub, devices: SharedDevices<S, B, I>, config: NodeConfig) -> Result<Self> {
        config.validate()?;
        let guard = SampleGuard::new(devices, config.guard_wait_ms);
        Ok(Self { hub, guard, config })
    }

    pub fn hub(&self) -> &'h EventHub {
        self.hub
    }

    pub fn queue(&self) -> &'h EventQueue {
        &self.hub.queue
    }

    pub fn guard(&self) -> &SampleGuard<S, B, I> {
        &self.guard
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Tear down, handing the guard (and through it the devices) back.
    pub fn into_guard(self) -> SampleGuard<S, B, I> {
        self.guard
    }
}
