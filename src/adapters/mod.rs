//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements          | Connects to              |
//! |------------|---------------------|--------------------------|
//! | `log_sink` | EventSink           | Serial log output        |
//! | `mqtt`     | MessageBus          | ESP-IDF MQTT client      |
//! | `ota`      | FirmwareUpdatePort  | HTTP download + esp-ota  |
//! | `time`     | Clock               | ESP32 system timer       |
//! | `wifi`     | ProvisioningPort    | ESP-IDF WiFi STA         |

pub mod log_sink;
#[cfg(target_os = "espidf")]
pub mod mqtt;
pub mod ota;
pub mod time;
pub mod wifi;
