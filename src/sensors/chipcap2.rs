//! ChipCap2 capacitive humidity / temperature sensor (I²C, 0x28).
//!
//! A measurement is a write of a single zero byte (measurement request),
//! a conversion wait, then a 4-byte data fetch:
//!
//! ```text
//! byte 0: [S1 S0 H13..H8]   S = status bits
//! byte 1: [H7 .. H0]
//! byte 2: [T13 .. T6]
//! byte 3: [T5 .. T0 x x]    x = unused
//! ```
//!
//! Status bits are masked off and not interpreted; a stale frame decodes
//! the same way as a fresh one.
//!
//! ## Dual-target design
//!
//! Generic over `embedded_hal` I²C and delay traits.  On ESP-IDF main
//! wires in `esp_idf_hal::i2c::I2cDriver` and `esp_idf_hal::delay::Delay`; tests use a
//! scripted in-memory bus.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorKind, I2c};

use super::Reading;
use crate::app::ports::SensorPort;
use crate::error::SensorError;
use crate::pins::CHIPCAP2_ADDR;

/// Conversion time between measurement request and data fetch.
pub const CONVERSION_DELAY_MS: u32 = 30;

const STATUS_MASK: u8 = 0b0011_1111;
const UNUSED_MASK: u8 = 0b1111_1100;
const FULL_SCALE: f32 = 16384.0;

/// Convert a raw 4-byte data-fetch frame into engineering units.
pub fn decode(frame: [u8; 4]) -> Reading {
    let rh_hi = frame[0] & STATUS_MASK;
    let rh_lo = frame[1];
    let t_hi = frame[2];
    let t_lo = frame[3] & UNUSED_MASK;

    let humidity = (f32::from(rh_hi) * 256.0 + f32::from(rh_lo)) / FULL_SCALE * 100.0;
    let temperature =
        (f32::from(t_hi) * 64.0 + f32::from(t_lo) / 4.0) / FULL_SCALE * 165.0 - 40.0;

    Reading {
        humidity,
        temperature,
        humidity_raw: [rh_hi, rh_lo],
        temperature_raw: [t_hi, t_lo],
    }
}

pub struct ChipCap2<I, D> {
    i2c: I,
    delay: D,
    address: u8,
}

impl<I: I2c, D: DelayNs> ChipCap2<I, D> {
    pub fn new(i2c: I, delay: D) -> Self {
        Self::with_address(i2c, delay, CHIPCAP2_ADDR)
    }

    pub fn with_address(i2c: I, delay: D, address: u8) -> Self {
        Self { i2c, delay, address }
    }

    /// Release the bus and delay provider.
    pub fn release(self) -> (I, D) {
        (self.i2c, self.delay)
    }

    /// Measurement request, conversion wait, data fetch.
    pub fn measure(&mut self) -> Result<Reading, SensorError> {
        self.i2c.write(self.address, &[0]).map_err(map_bus_error)?;
        self.delay.delay_ms(CONVERSION_DELAY_MS);

        let mut frame = [0u8; 4];
        self.i2c.read(self.address, &mut frame).map_err(map_bus_error)?;
        Ok(decode(frame))
    }
}

impl<I: I2c, D: DelayNs> SensorPort for ChipCap2<I, D> {
    fn read(&mut self) -> Result<Reading, SensorError> {
        self.measure()
    }
}

fn map_bus_error(e: impl embedded_hal::i2c::Error) -> SensorError {
    match e.kind() {
        ErrorKind::NoAcknowledge(_) => SensorError::NoAcknowledge,
        _ => SensorError::Bus,
    }
}
