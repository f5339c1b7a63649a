//! Node configuration parameters
//!
//! All tunable timing, indicator and message-bus parameters for the
//! SensorNode.  Defaults match the shipped hardware; a JSON blob can
//! override any subset of fields.

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Maximum length of a topic or broker URL.
pub const TOPIC_CAP: usize = 64;

/// Slowest button poll cadence that still resolves the press window.
pub const MAX_BUTTON_POLL_MS: u32 = 10;

/// Bounded string used for topics and URLs.
pub type TopicString = String<TOPIC_CAP>;

/// Core node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    // --- Button ---
    /// Minimum press duration accepted as a press (milliseconds)
    pub debounce_ms: u32,
    /// Press duration that counts as a hold (milliseconds)
    pub hold_ms: u32,
    /// Button level poll cadence (milliseconds, at most `MAX_BUTTON_POLL_MS`)
    pub button_poll_ms: u32,

    // --- Sampling ---
    /// Periodic sample interval (milliseconds)
    pub sample_period_ms: u32,
    /// How long a task-context producer waits for queue space (milliseconds)
    pub send_timeout_ms: u32,
    /// Sample guard wait bound (milliseconds, 0 = wait forever)
    pub guard_wait_ms: u32,

    // --- Indicator ---
    /// Half-period of one indicator blink (milliseconds)
    pub blink_period_ms: u32,
    /// Blinks after a link-down reconnection
    pub link_down_blinks: u8,
    /// Blinks once initialisation completes
    pub startup_blinks: u8,
    /// Toggles acknowledging a boot-time reprovision request
    pub reprovision_flash_count: u8,
    /// Toggle interval of the reprovision acknowledgement (milliseconds)
    pub reprovision_flash_ms: u32,

    // --- Message bus ---
    /// Broker URL (`mqtt://host:port`)
    pub broker_url: TopicString,
    /// Topic sensor documents are published to
    pub publish_topic: TopicString,
    /// Topic control messages arrive on
    pub control_topic: TopicString,
    /// Topic replies to control messages go to
    pub response_topic: TopicString,

    // --- Firmware update ---
    /// Image location fetched on `update-firmware` (empty = updates disabled)
    pub firmware_url: TopicString,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            // Button
            debounce_ms: 50,
            hold_ms: 2000,
            button_poll_ms: 10,

            // Sampling
            sample_period_ms: 5000, // 0.2 Hz
            send_timeout_ms: 100,
            guard_wait_ms: 0,

            // Indicator
            blink_period_ms: 100,
            link_down_blinks: 5,
            startup_blinks: 10,
            reprovision_flash_count: 20,
            reprovision_flash_ms: 50,

            // Message bus
            broker_url: bounded("mqtt://broker.local:1883"),
            publish_topic: bounded("/sensornode/telemetry"),
            control_topic: bounded("/sensornode/control"),
            response_topic: bounded("/sensornode/control/response"),

            // Firmware update
            firmware_url: bounded("http://ota.local/sensornode.bin"),
        }
    }
}

impl NodeConfig {
    /// Reject combinations the button machine and timers cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.debounce_ms == 0 {
            return Err(Error::Config("debounce_ms must be non-zero"));
        }
        if self.button_poll_ms == 0 || self.button_poll_ms >= self.debounce_ms {
            return Err(Error::Config("button_poll_ms must be in 1..debounce_ms"));
        }
        if self.button_poll_ms > MAX_BUTTON_POLL_MS {
            return Err(Error::Config("button_poll_ms must not exceed 10"));
        }
        if self.hold_ms <= self.debounce_ms {
            return Err(Error::Config("hold_ms must exceed debounce_ms"));
        }
        if self.sample_period_ms == 0 {
            return Err(Error::Config("sample_period_ms must be non-zero"));
        }
        if self.publish_topic.is_empty() || self.control_topic.is_empty() {
            return Err(Error::Config("topics must not be empty"));
        }
        Ok(())
    }

    /// Parse a JSON override on top of the defaults and validate it.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let config: Self =
            serde_json::from_slice(bytes).map_err(|_| Error::Config("malformed config JSON"))?;
        config.validate()?;
        Ok(config)
    }
}

/// Copy `s` into a bounded string, truncating at a char boundary.
pub fn bounded(s: &str) -> TopicString {
    let mut out = TopicString::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
