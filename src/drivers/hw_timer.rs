//! Periodic sample timer using ESP-IDF's esp_timer API.
//!
//! The callback executes in the ESP timer task context (not ISR) and
//! does exactly one thing: `try_send(TimerElapsed)`.  No I/O, no
//! blocking.  On simulation targets a parked thread approximates the
//! period.

use log::{info, warn};

use crate::events::{Event, EventQueue};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(not(target_os = "espidf"))]
use std::sync::Arc;
#[cfg(not(target_os = "espidf"))]
use std::sync::atomic::{AtomicBool, Ordering};

/// Timer callback body.
pub fn on_sample_tick(queue: &EventQueue) {
    if let Err(e) = queue.try_send(Event::TimerElapsed) {
        warn!("hw_timer: sample tick lost: {e}");
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn sample_tick_cb(arg: *mut core::ffi::c_void) {
    // SAFETY: `arg` is the `&'static EventQueue` handed to SampleTimer::start.
    let queue = unsafe { &*(arg as *const EventQueue) };
    on_sample_tick(queue);
}

/// Running periodic timer.  Stopped and released on drop.
pub struct SampleTimer {
    #[cfg(target_os = "espidf")]
    handle: esp_timer_handle_t,
    #[cfg(not(target_os = "espidf"))]
    stop: Arc<AtomicBool>,
    #[cfg(not(target_os = "espidf"))]
    thread: Option<std::thread::JoinHandle<()>>,
}

impl SampleTimer {
    /// Start firing `TimerElapsed` into `queue` every `period_ms`.
    #[cfg(target_os = "espidf")]
    pub fn start(queue: &'static EventQueue, period_ms: u32) -> Result<Self, crate::error::Error> {
        let args = esp_timer_create_args_t {
            callback: Some(sample_tick_cb),
            arg: queue as *const EventQueue as *mut core::ffi::c_void,
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: c"sample".as_ptr(),
            skip_unhandled_events: true,
        };
        let mut handle: esp_timer_handle_t = core::ptr::null_mut();

        // SAFETY: `args` outlives the call; the callback argument is a
        // 'static reference.
        let ret = unsafe { esp_timer_create(&args, &mut handle) };
        if ret != ESP_OK as i32 {
            log::error!("hw_timer: sample timer create failed (rc={})", ret);
            return Err(crate::error::Error::Init("sample timer create"));
        }
        // SAFETY: `handle` was just created.
        let ret = unsafe { esp_timer_start_periodic(handle, u64::from(period_ms) * 1000) };
        if ret != ESP_OK as i32 {
            log::error!("hw_timer: sample timer start failed (rc={})", ret);
            // SAFETY: not started, safe to delete.
            unsafe { esp_timer_delete(handle) };
            return Err(crate::error::Error::Init("sample timer start"));
        }

        info!("hw_timer: sample timer every {} ms", period_ms);
        Ok(Self { handle })
    }

    /// Start firing `TimerElapsed` into `queue` every `period_ms`.
    #[cfg(not(target_os = "espidf"))]
    pub fn start(queue: &'static EventQueue, period_ms: u32) -> Result<Self, crate::error::Error> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let period = std::time::Duration::from_millis(u64::from(period_ms));

        let thread = std::thread::Builder::new()
            .name("sample-timer".into())
            .spawn(move || {
                let mut next = std::time::Instant::now() + period;
                loop {
                    let now = std::time::Instant::now();
                    if now < next {
                        std::thread::park_timeout(next - now);
                    }
                    if flag.load(Ordering::Acquire) {
                        break;
                    }
                    if std::time::Instant::now() >= next {
                        on_sample_tick(queue);
                        next += period;
                    }
                }
            })
            .map_err(|_| crate::error::Error::Init("sample timer thread"))?;

        info!("hw_timer(sim): sample timer every {} ms", period_ms);
        Ok(Self { stop, thread: Some(thread) })
    }
}

impl Drop for SampleTimer {
    #[cfg(target_os = "espidf")]
    fn drop(&mut self) {
        // SAFETY: handle is valid until deleted here.
        unsafe {
            esp_timer_stop(self.handle);
            esp_timer_delete(self.handle);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            thread.thread().unpark();
            let _ = thread.join();
        }
    }
}
