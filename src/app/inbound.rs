//! Inbound control messages and link notifications.
//!
//! The message-bus client calls into [`InboundRouter`] from its own
//! callback context.  The router never blocks: it translates the
//! notification into an [`Event`] and `try_send`s it.

use log::{debug, info, warn};

use crate::events::Event;

use super::context::EventHub;
use super::ports::Clock;

/// Control messages understood on the control topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    ReadAndPublish,
    UpdateFirmware,
}

impl ControlMessage {
    pub const READ_AND_PUBLISH: &'static str = "read-and-publish";
    pub const UPDATE_FIRMWARE: &'static str = "update-firmware";

    /// Match a raw payload.  Surrounding ASCII whitespace and NUL
    /// terminators are ignored; anything else must match exactly.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        let trimmed = trim(payload);
        if trimmed == Self::READ_AND_PUBLISH.as_bytes() {
            Some(Self::ReadAndPublish)
        } else if trimmed == Self::UPDATE_FIRMWARE.as_bytes() {
            Some(Self::UpdateFirmware)
        } else {
            None
        }
    }

    pub const fn event(self) -> Event {
        match self {
            Self::ReadAndPublish => Event::RemoteSampleRequest,
            Self::UpdateFirmware => Event::RemoteFirmwareUpdate,
        }
    }
}

fn trim(payload: &[u8]) -> &[u8] {
    let skip = |b: &u8| b.is_ascii_whitespace() || *b == 0;
    let start = payload.iter().position(|b| !skip(b)).unwrap_or(payload.len());
    let end = payload.iter().rposition(|b| !skip(b)).map_or(start, |i| i + 1);
    &payload[start..end]
}

/// Translates bus callbacks into queue events.
pub struct InboundRouter<'a, C> {
    hub: &'a EventHub,
    clock: C,
}

impl<'a, C: Clock> InboundRouter<'a, C> {
    pub fn new(hub: &'a EventHub, clock: C) -> Self {
        Self { hub, clock }
    }

    /// A message arrived on the control topic.  Returns the event that
    /// was queued, if any.
    pub fn on_message(&self, payload: &[u8]) -> Option<Event> {
        let Some(msg) = ControlMessage::parse(payload) else {
            debug!("inbound: ignoring {}-byte control message", payload.len());
            return None;
        };

        let armed = msg == ControlMessage::ReadAndPublish
            && self.hub.latency.arm(self.clock.now_us());

        let event = msg.event();
        match self.hub.queue.try_send(event) {
            Ok(()) => {
                info!("inbound: {} queued", event.label());
                Some(event)
            }
            Err(e) => {
                if armed {
                    let _ = self.hub.latency.take();
                }
                warn!("inbound: {} lost: {e}", event.label());
                None
            }
        }
    }

    pub fn on_connected(&self) {
        self.forward(Event::LinkUp);
    }

    pub fn on_disconnected(&self) {
        self.forward(Event::LinkDown);
    }

    fn forward(&self, event: Event) {
        if let Err(e) = self.hub.queue.try_send(event) {
            warn!("inbound: {} lost: {e}", event.label());
        }
    }
}
