//! Sensor subsystem.
//!
//! One physical sensor (ChipCap2 on I²C) producing a combined humidity /
//! temperature [`Reading`].  Drivers implement [`crate::app::ports::SensorPort`]
//! so the sample guard never depends on a concrete bus.

pub mod chipcap2;

/// One humidity / temperature measurement.
///
/// Lives for one dispatch cycle: read, encoded, published, dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Relative humidity in %RH.
    pub humidity: f32,
    /// Temperature in °C.
    pub temperature: f32,
    /// Humidity bytes as received (status bits cleared).
    pub humidity_raw: [u8; 2],
    /// Temperature bytes as received (unused bits cleared).
    pub temperature_raw: [u8; 2],
}

impl Reading {
    /// A reading built from engineering values only (no raw frame).
    pub fn from_values(humidity: f32, temperature: f32) -> Self {
        Self {
            humidity,
            temperature,
            humidity_raw: [0; 2],
            temperature_raw: [0; 2],
        }
    }
}
