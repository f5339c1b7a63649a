//! Bounded event queue.
//!
//! Events are produced by:
//! - the button task (debounced press / hold)
//! - the sample timer callback (periodic sampling)
//! - the message-bus callback (remote requests, link up / down)
//!
//! Events are consumed by the dispatcher, which processes them one at a
//! time in arrival order.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Button task │────▶│              │     │              │
//! │ Timer cb    │────▶│  Event Queue │────▶│  Dispatcher  │
//! │ Bus cb      │────▶│  (MPSC, 16)  │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use embassy_time::{Duration, with_timeout};

use crate::error::QueueError;

/// Maximum number of pending events.
pub const EVENT_QUEUE_CAP: usize = 16;

/// Everything the dispatcher reacts to.  No payloads: events are
/// signals, the data they refer to is read when they are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Event {
    /// No-op.  Also the wake-up sentinel pushed by [`EventQueue::close`].
    None                 = 0,

    // ── User input ────────────────────────────────────────
    /// Debounced press released before the hold threshold.
    ButtonPress          = 1,

    // ── Sampling ──────────────────────────────────────────
    /// Periodic sample timer fired.
    TimerElapsed         = 2,

    // ── Remote control ────────────────────────────────────
    /// `read-and-publish` received on the control topic.
    RemoteSampleRequest  = 3,
    /// `update-firmware` received on the control topic.
    RemoteFirmwareUpdate = 4,

    // ── Link ──────────────────────────────────────────────
    /// Message-bus session established.
    LinkUp               = 5,
    /// Message-bus session lost.
    LinkDown             = 6,

    /// Button held past the hold threshold.
    ButtonHold           = 7,
}

impl Event {
    /// Short name for log lines.
    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ButtonPress => "button-press",
            Self::ButtonHold => "button-hold",
            Self::TimerElapsed => "timer-elapsed",
            Self::RemoteSampleRequest => "remote-sample-request",
            Self::RemoteFirmwareUpdate => "remote-firmware-update",
            Self::LinkUp => "link-up",
            Self::LinkDown => "link-down",
        }
    }
}

/// Multi-producer / single-consumer FIFO of [`Event`]s.
///
/// `try_send` never blocks or allocates and may be called from the
/// timer task or a bus callback.  Overflow is counted, never silent.
pub struct EventQueue {
    channel: Channel<CriticalSectionRawMutex, Event, EVENT_QUEUE_CAP>,
    closed: AtomicBool,
    dropped: AtomicU32,
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
            closed: AtomicBool::new(false),
            dropped: AtomicU32::new(0),
        }
    }

    /// Enqueue without waiting.
    pub fn try_send(&self, event: Event) -> Result<(), QueueError> {
        if self.is_closed() {
            return Err(QueueError::Closed);
        }
        match self.channel.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Err(QueueError::Full)
            }
        }
    }

    /// Enqueue, waiting up to `timeout` for a free slot.
    pub async fn send(&self, event: Event, timeout: Duration) -> Result<(), QueueError> {
        if self.is_closed() {
            return Err(QueueError::Closed);
        }
        if with_timeout(timeout, self.channel.send(event)).await.is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return Err(QueueError::Full);
        }
        Ok(())
    }

    /// [`send`](Self::send) for plain threads.
    pub fn send_blocking(&self, event: Event, timeout: Duration) -> Result<(), QueueError> {
        futures_lite::future::block_on(self.send(event, timeout))
    }

    /// Next event, or `None` if nothing arrives within `timeout`.
    pub async fn receive(&self, timeout: Duration) -> Option<Event> {
        with_timeout(timeout, self.channel.receive()).await.ok()
    }

    /// Next event, waiting indefinitely.  `None` once the queue has been
    /// closed and every pending event has been drained.
    pub async fn recv(&self) -> Option<Event> {
        loop {
            if self.is_closed() && self.channel.is_empty() {
                return None;
            }
            match self.channel.receive().await {
                Event::None if self.is_closed() => {}
                event => return Some(event),
            }
        }
    }

    /// Stop accepting events and wake the consumer.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        // A full queue means the consumer is not parked.
        let _ = self.channel.try_send(Event::None);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Pending events.
    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    /// Events rejected for lack of space since boot.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
