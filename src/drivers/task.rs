//! Named thread spawning with explicit priority and stack size.
//!
//! Wraps `esp_pthread_set_cfg()` so that `std::thread::spawn` creates a
//! FreeRTOS task with the requested priority and stack.  The ESP32-C3 is
//! single-core, so no core affinity is set.  On non-ESP targets, falls
//! back to a plain `std::thread::Builder`.
//!
//! `esp_pthread_set_cfg()` sets thread-local configuration that applies
//! to the *next* `pthread_create()` from the calling thread, so the
//! config→spawn pair must not be interleaved with other thread creation.

use log::info;

use crate::error::Error;

/// Spawn a named task.  `name` must be NUL-terminated (e.g. `"button\0"`).
#[cfg(target_os = "espidf")]
pub fn spawn_task(
    name: &'static str,
    priority: u8,
    stack_kb: usize,
    f: impl FnOnce() + Send + 'static,
) -> Result<std::thread::JoinHandle<()>, Error> {
    // SAFETY: the config struct is fully initialised by the default
    // constructor; `name` is 'static and NUL-terminated.
    unsafe {
        let mut cfg = esp_idf_sys::esp_create_default_pthread_config();
        cfg.prio = i32::from(priority);
        cfg.stack_size = (stack_kb * 1024) as _;
        cfg.thread_name = name.as_ptr() as *const _;
        let ret = esp_idf_sys::esp_pthread_set_cfg(&cfg);
        if ret != esp_idf_sys::ESP_OK as i32 {
            log::error!("esp_pthread_set_cfg failed: {ret}");
            return Err(Error::Init("pthread config"));
        }
    }

    let display_name = name.trim_end_matches('\0');
    info!("Spawning '{}' (pri={}, stack={}KB)", display_name, priority, stack_kb);

    std::thread::Builder::new()
        .name(display_name.into())
        .spawn(f)
        .map_err(|_| Error::Init("task spawn"))
}

/// Simulation fallback: ignores priority.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_task(
    name: &'static str,
    _priority: u8,
    stack_kb: usize,
    f: impl FnOnce() + Send + 'static,
) -> Result<std::thread::JoinHandle<()>, Error> {
    let display_name = name.trim_end_matches('\0');
    info!("Spawning '{}' (sim, stack={}KB)", display_name, stack_kb);

    std::thread::Builder::new()
        .name(display_name.into())
        .stack_size(stack_kb * 1024)
        .spawn(f)
        .map_err(|_| Error::Init("task spawn"))
}
