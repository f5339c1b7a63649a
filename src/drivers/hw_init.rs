//! One-shot hardware peripheral initialization.
//!
//! Configures the button input (pull-up, falling-edge interrupt) and the
//! status LED output using raw ESP-IDF sys calls.  Called once from
//! `main()` before any task starts.
//!
//! On host builds the GPIO bank is simulated by an atomic level mask so
//! drivers and tests exercise the same read / write paths.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU32, Ordering};

#[cfg(target_os = "espidf")]
use crate::drivers::button::EdgeLatch;
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
    IsrHandlerFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
            Self::IsrHandlerFailed(rc) => write!(f, "GPIO ISR handler add failed (rc={})", rc),
        }
    }
}

impl std::error::Error for HwInitError {}

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before any task is spawned.
    unsafe {
        init_button_input()?;
        init_led_output()?;
    }
    info!("hw_init: button + LED configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── GPIO Inputs ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_button_input() -> Result<(), HwInitError> {
    let btn_cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::BUTTON_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_NEGEDGE,
    };
    let ret = unsafe { gpio_config(&btn_cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: gpio_get_level is a read-only register access on an
    // already-configured input pin.
    (unsafe { gpio_get_level(pin) }) != 0
}

/// Simulated level mask, one bit per GPIO.  Pins idle high (pull-up).
#[cfg(not(target_os = "espidf"))]
static SIM_LEVELS: AtomicU32 = AtomicU32::new(u32::MAX);

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(pin: i32) -> bool {
    SIM_LEVELS.load(Ordering::Acquire) & (1 << pin) != 0
}

/// Drive a simulated pin level (host only).
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_level(pin: i32, high: bool) {
    if high {
        SIM_LEVELS.fetch_or(1 << pin, Ordering::AcqRel);
    } else {
        SIM_LEVELS.fetch_and(!(1 << pin), Ordering::AcqRel);
    }
}

/// Logical button state (active-low).
pub fn button_pressed() -> bool {
    !gpio_read(pins::BUTTON_GPIO)
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_led_output() -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::LED_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
    // Active-low: high = dark.
    unsafe { gpio_set_level(pins::LED_GPIO, 1) };
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an already-configured output pin.
    unsafe { gpio_set_level(pin, if high { 1 } else { 0 }); }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(pin: i32, high: bool) {
    sim_set_level(pin, high);
}

// ── GPIO ISR Service ──────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn button_gpio_isr(arg: *mut core::ffi::c_void) {
    // SAFETY: `arg` is the `&'static EdgeLatch` registered in
    // init_isr_service(); the latch only uses atomics.
    let latch = unsafe { &*(arg as *const EdgeLatch) };
    // SAFETY: esp_timer_get_time is a RTC counter read; safe in ISR context.
    let now_us = unsafe { esp_timer_get_time() } as u64;
    latch.on_edge(now_us);
}

/// Install the per-pin GPIO ISR service and hook the button edge to `latch`.
/// Call after init_peripherals() and before the button task starts.
#[cfg(target_os = "espidf")]
pub fn init_isr_service(latch: &'static EdgeLatch) -> Result<(), HwInitError> {
    // SAFETY: ESP_ERR_INVALID_STATE means the service was already
    // installed (acceptable).  The handler only touches `latch`, which
    // outlives the program.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
            return Err(HwInitError::IsrInstallFailed(ret));
        }

        let ret = gpio_isr_handler_add(
            pins::BUTTON_GPIO,
            Some(button_gpio_isr),
            latch as *const EdgeLatch as *mut core::ffi::c_void,
        );
        if ret != ESP_OK as i32 { return Err(HwInitError::IsrHandlerFailed(ret)); }
        gpio_intr_enable(pins::BUTTON_GPIO);
    }
    info!("hw_init: button ISR registered (NEGEDGE)");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_isr_service(_latch: &'static crate::drivers::button::EdgeLatch) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): ISR service skipped");
    Ok(())
}
