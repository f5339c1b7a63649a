//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade (ESP-IDF logger → UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Published { trigger, reading, bytes } => {
                info!(
                    "PUBLISH | trigger={} | RH={:.1}% T={:.1}\u{00b0}C | raw_rh={:02x}{:02x} \
                     raw_t={:02x}{:02x} | bytes={}",
                    trigger.as_str(),
                    reading.humidity,
                    reading.temperature,
                    reading.humidity_raw[0],
                    reading.humidity_raw[1],
                    reading.temperature_raw[0],
                    reading.temperature_raw[1],
                    bytes,
                );
            }
            AppEvent::SampleFailed { trigger, error } => {
                warn!("SAMPLE | trigger={} | failed: {}", trigger.as_str(), error);
            }
            AppEvent::Latency { micros, ok } => {
                info!("TIMING | remote request {} us | ok={}", micros, ok);
            }
            AppEvent::Reprovisioning => info!("LINK | reprovisioning"),
            AppEvent::ReprovisionFailed(e) => warn!("LINK | reprovisioning failed: {}", e),
            AppEvent::FirmwareUpdateStarted => info!("OTA | update started"),
            AppEvent::FirmwareUpdateFailed(e) => warn!("OTA | not started: {}", e),
            AppEvent::LinkUp => info!("LINK | bus up"),
            AppEvent::LinkDown => warn!("LINK | bus down"),
            AppEvent::Reconnected(status) => info!("LINK | reconnect: {:?}", status),
            AppEvent::ReconnectFailed(e) => warn!("LINK | reconnect failed: {}", e),
            AppEvent::Started => info!("START | dispatcher running"),
        }
    }
}
