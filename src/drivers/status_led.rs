//! Single-colour status LED.
//!
//! The on-board LED is wired active-low (pin low = lit).  The driver
//! caches the logical state so `toggle()` never reads the pin back.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the GPIO via hw_init.
//! On host/test: writes the simulated level mask in hw_init.

use crate::app::ports::IndicatorPort;
use crate::drivers::hw_init;

pub struct StatusLed {
    gpio: i32,
    lit: bool,
}

impl StatusLed {
    /// Takes over `gpio` and turns the LED off.
    pub fn new(gpio: i32) -> Self {
        let mut led = Self { gpio, lit: false };
        led.apply();
        led
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    fn apply(&mut self) {
        hw_init::gpio_write(self.gpio, !self.lit);
    }
}

impl IndicatorPort for StatusLed {
    fn toggle(&mut self) {
        self.lit = !self.lit;
        self.apply();
    }

    fn set(&mut self, on: bool) {
        self.lit = on;
        self.apply();
    }
}
