//! Debounced button driver with press and hold detection.
//!
//! ## Hardware
//!
//! Active-low momentary switch with pull-up (pressed = low).  The GPIO
//! interrupt fires on the falling edge and only records the edge in an
//! [`EdgeLatch`]; classification happens in the button task, which polls
//! the level and runs [`ButtonMachine`].
//!
//! ## Gesture detection
//!
//! | Gesture | Condition                                  | Event         |
//! |---------|--------------------------------------------|---------------|
//! | Glitch  | Released before debounce (50 ms)           | none          |
//! | Press   | Released in [debounce, hold)               | `ButtonPress` |
//! | Hold    | Still pressed at hold (2 s), or released   | `ButtonHold`  |
//! |         | at or after it before a poll noticed       |               |
//!
//! The ISR path never classifies.  It timestamps the falling edge so the
//! task can date the press from the edge rather than from the first poll
//! that saw the level.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use log::{debug, warn};

use crate::app::ports::Clock;
use crate::config::NodeConfig;
use crate::events::{Event, EventQueue};

/// Classified button gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Press,
    Hold,
}

impl From<ButtonEvent> for Event {
    fn from(e: ButtonEvent) -> Self {
        match e {
            ButtonEvent::Press => Event::ButtonPress,
            ButtonEvent::Hold => Event::ButtonHold,
        }
    }
}

/// Debounce and hold thresholds, in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonTiming {
    pub debounce_us: u64,
    pub hold_us: u64,
}

impl ButtonTiming {
    pub fn from_config(config: &NodeConfig) -> Self {
        Self {
            debounce_us: u64::from(config.debounce_ms) * 1000,
            hold_us: u64::from(config.hold_ms) * 1000,
        }
    }
}

impl Default for ButtonTiming {
    fn default() -> Self {
        Self::from_config(&NodeConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Idle,
    Pressed { since_us: u64 },
    /// Hold already reported; waiting for release.
    Held,
}

/// Poll-driven press / hold classifier.  Owned by the button task.
#[derive(Debug)]
pub struct ButtonMachine {
    timing: ButtonTiming,
    state: ButtonState,
}

impl ButtonMachine {
    pub fn new(timing: ButtonTiming) -> Self {
        Self {
            timing,
            state: ButtonState::Idle,
        }
    }

    pub fn state(&self) -> ButtonState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == ButtonState::Idle
    }

    /// Feed one level sample.  `pressed` is the logical (already
    /// inverted) level; `now_us` a monotonic timestamp.
    pub fn poll(&mut self, pressed: bool, now_us: u64) -> Option<ButtonEvent> {
        self.poll_with_edge(pressed, now_us, None)
    }

    /// As [`poll`](Self::poll), with the time of a falling edge seen since
    /// the previous sample.  A press that starts here is dated from the
    /// edge; otherwise the edge is ignored.
    pub fn poll_with_edge(
        &mut self,
        pressed: bool,
        now_us: u64,
        edge_us: Option<u64>,
    ) -> Option<ButtonEvent> {
        match (self.state, pressed) {
            (ButtonState::Idle, true) => {
                let since_us = edge_us.map_or(now_us, |edge| edge.min(now_us));
                self.state = ButtonState::Pressed { since_us };
                None
            }
            (ButtonState::Idle, false) | (ButtonState::Held, true) => None,

            (ButtonState::Pressed { since_us }, true) => {
                if now_us.saturating_sub(since_us) >= self.timing.hold_us {
                    self.state = ButtonState::Held;
                    return Some(ButtonEvent::Hold);
                }
                None
            }

            (ButtonState::Pressed { since_us }, false) => {
                self.state = ButtonState::Idle;
                let held_us = now_us.saturating_sub(since_us);
                if held_us < self.timing.debounce_us {
                    None
                } else if held_us < self.timing.hold_us {
                    Some(ButtonEvent::Press)
                } else {
                    Some(ButtonEvent::Hold)
                }
            }

            (ButtonState::Held, false) => {
                self.state = ButtonState::Idle;
                None
            }
        }
    }
}

// ── ISR edge latch ─────────────────────────────────────────────

/// Falling-edge record shared between the GPIO ISR and the button task.
///
/// Timestamps are truncated to `u32` microseconds; comparisons use
/// wrapping arithmetic, so intervals up to ~71 minutes compare correctly.
pub struct EdgeLatch {
    last_edge_us: AtomicU32,
    seen: AtomicBool,
    pending: AtomicU32,
    debounce_us: u32,
}

impl EdgeLatch {
    pub const fn new(debounce_us: u32) -> Self {
        Self {
            last_edge_us: AtomicU32::new(0),
            seen: AtomicBool::new(false),
            pending: AtomicU32::new(0),
            debounce_us,
        }
    }

    pub fn from_config(config: &NodeConfig) -> Self {
        Self::new(config.debounce_ms.saturating_mul(1000))
    }

    /// Record an edge.  Safe to call from interrupt context (atomics only).
    /// Returns `false` if the edge fell inside the debounce interval of
    /// the previously accepted one.
    pub fn on_edge(&self, now_us: u64) -> bool {
        let now = now_us as u32;
        if self.seen.load(Ordering::Acquire)
            && now.wrapping_sub(self.last_edge_us.load(Ordering::Relaxed)) < self.debounce_us
        {
            return false;
        }
        self.last_edge_us.store(now, Ordering::Relaxed);
        self.seen.store(true, Ordering::Release);
        self.pending.fetch_add(1, Ordering::AcqRel);
        true
    }

    /// Accepted edges since the last call.
    pub fn take_pending(&self) -> u32 {
        self.pending.swap(0, Ordering::AcqRel)
    }

    /// Consume pending edges and return when the latest one happened, on
    /// the `now_us` timeline.
    pub fn take_edge(&self, now_us: u64) -> Option<u64> {
        if self.take_pending() == 0 {
            return None;
        }
        let ago = (now_us as u32).wrapping_sub(self.last_edge_us.load(Ordering::Relaxed));
        Some(now_us.saturating_sub(u64::from(ago)))
    }

    pub fn pending(&self) -> u32 {
        self.pending.load(Ordering::Acquire)
    }
}

// ── Button task ────────────────────────────────────────────────

/// Level poller feeding [`ButtonMachine`] and enqueueing its events.
pub struct ButtonTask<'a> {
    machine: ButtonMachine,
    queue: &'a EventQueue,
    edges: &'a EdgeLatch,
    send_timeout: embassy_time::Duration,
    poll: core::time::Duration,
}

impl<'a> ButtonTask<'a> {
    pub fn new(config: &NodeConfig, queue: &'a EventQueue, edges: &'a EdgeLatch) -> Self {
        Self {
            machine: ButtonMachine::new(ButtonTiming::from_config(config)),
            queue,
            edges,
            send_timeout: embassy_time::Duration::from_millis(u64::from(config.send_timeout_ms)),
            poll: core::time::Duration::from_millis(u64::from(config.button_poll_ms)),
        }
    }

    pub fn machine(&self) -> &ButtonMachine {
        &self.machine
    }

    /// One poll.  Returns how long to sleep before the next one.
    pub fn step(&mut self, pressed: bool, now_us: u64) -> core::time::Duration {
        let edge_us = self.edges.take_edge(now_us);

        if let Some(gesture) = self.machine.poll_with_edge(pressed, now_us, edge_us) {
            let event = Event::from(gesture);
            match self.queue.send_blocking(event, self.send_timeout) {
                Ok(()) => debug!("button: {} queued", event.label()),
                Err(e) => warn!("button: {} lost: {e}", event.label()),
            }
        }

        self.poll
    }

    /// Poll forever.  `is_pressed` reads the logical button level.
    pub fn run(mut self, mut is_pressed: impl FnMut() -> bool, clock: &impl Clock) -> ! {
        loop {
            let pause = self.step(is_pressed(), clock.now_us());
            std::thread::sleep(pause);
        }
    }
}
