//! GPIO / peripheral pin assignments for the ESP32-C3 SuperMini node board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// User button (active-low, internal pull-up)
// ---------------------------------------------------------------------------

/// BOOT push-button.  LOW = pressed.
pub const BUTTON_GPIO: i32 = 9;

// ---------------------------------------------------------------------------
// Status LED (on-board blue LED, active-low)
// ---------------------------------------------------------------------------

pub const LED_GPIO: i32 = 8;

// ---------------------------------------------------------------------------
// I²C bus (ChipCap2 humidity / temperature sensor)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 6;
pub const I2C_SCL_GPIO: i32 = 7;
/// Standard-mode bus clock.
pub const I2C_FREQ_HZ: u32 = 100_000;
/// ChipCap2 7-bit address (0b0101000).
pub const CHIPCAP2_ADDR: u8 = 0x28;
