//! Button, indicator and timer drivers, hardware initialisation, task spawning.

pub mod button;
pub mod hw_init;
pub mod hw_timer;
pub mod status_led;
pub mod task;
