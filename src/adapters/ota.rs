//! Firmware-update trigger: backed by the `esp-ota` crate.
//!
//! `start_update()` returns as soon as the download task is running; the
//! dispatcher never waits for it.  The task streams the image from
//! `firmware_url` over HTTP into the inactive OTA partition, marks it
//! bootable and restarts.  Only one update may run at a time.
//!
//! On simulation targets the task just sleeps briefly and reports success.

use core::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{error, info};

use crate::app::ports::FirmwareUpdatePort;
use crate::config::TopicString;
use crate::drivers::task::spawn_task;
use crate::error::UpdateError;

const OTA_TASK_PRIORITY: u8 = 5;
const OTA_TASK_STACK_KB: usize = 8;

// ── Error type ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaError {
    Connect,
    HttpStatus(u16),
    Read,
    BeginFailed,
    WriteFailed,
    VerifyFailed,
    BootSetFailed,
}

impl fmt::Display for OtaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "firmware server unreachable"),
            Self::HttpStatus(code) => write!(f, "firmware server returned HTTP {code}"),
            Self::Read => write!(f, "firmware download interrupted"),
            Self::BeginFailed => write!(f, "OTA begin failed"),
            Self::WriteFailed => write!(f, "OTA write failed"),
            Self::VerifyFailed => write!(f, "OTA image verification failed"),
            Self::BootSetFailed => write!(f, "set boot partition failed"),
        }
    }
}

// ── Trigger ───────────────────────────────────────────────────

pub struct OtaTrigger {
    url: TopicString,
    running: Arc<AtomicBool>,
}

impl OtaTrigger {
    pub fn new(url: TopicString) -> Self {
        Self {
            url,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl FirmwareUpdatePort for OtaTrigger {
    fn start_update(&mut self) -> Result<(), UpdateError> {
        if self.url.is_empty() {
            return Err(UpdateError::NoSource);
        }
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(UpdateError::AlreadyRunning);
        }

        let url = self.url.clone();
        let running = Arc::clone(&self.running);
        let spawned = spawn_task("ota\0", OTA_TASK_PRIORITY, OTA_TASK_STACK_KB, move || {
            info!("OTA: fetching {}", url);
            match run_update(&url) {
                Ok(()) => info!("OTA: image written"),
                Err(e) => error!("OTA: failed: {e}"),
            }
            running.store(false, Ordering::Release);
        });

        match spawned {
            Ok(_) => Ok(()),
            Err(_) => {
                self.running.store(false, Ordering::Release);
                Err(UpdateError::SpawnFailed)
            }
        }
    }
}

// ── Boot-time rollback check ──────────────────────────────────

/// Confirm the running image so the bootloader does not roll back.
/// Call once the node has reached its event loop.
#[cfg(target_os = "espidf")]
pub fn check_rollback() {
    match esp_ota::mark_app_valid() {
        Ok(()) => info!("OTA: firmware marked valid"),
        Err(e) => log::warn!("OTA: mark_app_valid failed: {:?}", e),
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn check_rollback() {
    info!("OTA(sim): rollback check skipped");
}

// ── Platform-specific ─────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn run_update(url: &str) -> Result<(), OtaError> {
    use esp_idf_svc::http::Method;
    use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
    use log::warn;

    let mut conn = EspHttpConnection::new(&Configuration {
        buffer_size: Some(2048),
        ..Default::default()
    })
    .map_err(|_| OtaError::Connect)?;
    conn.initiate_request(Method::Get, url, &[])
        .map_err(|_| OtaError::Connect)?;
    conn.initiate_response().map_err(|_| OtaError::Connect)?;
    let status = conn.status();
    if status != 200 {
        return Err(OtaError::HttpStatus(status));
    }

    let mut update = esp_ota::OtaUpdate::begin().map_err(|e| {
        warn!("esp-ota begin failed: {:?}", e);
        OtaError::BeginFailed
    })?;

    let mut chunk = [0u8; 1024];
    let mut total = 0usize;
    loop {
        let n = conn.read(&mut chunk).map_err(|_| OtaError::Read)?;
        if n == 0 {
            break;
        }
        update.write(&chunk[..n]).map_err(|e| {
            warn!("esp-ota write failed at {}: {:?}", total, e);
            OtaError::WriteFailed
        })?;
        total += n;
    }
    info!("OTA: {} bytes received", total);

    let mut completed = update.finalize().map_err(|e| {
        warn!("esp-ota finalize failed: {:?}", e);
        OtaError::VerifyFailed
    })?;
    completed.set_as_boot_partition().map_err(|e| {
        warn!("esp-ota set_as_boot_partition failed: {:?}", e);
        OtaError::BootSetFailed
    })?;

    info!("OTA: rebooting into new image");
    completed.restart()
}

#[cfg(not(target_os = "espidf"))]
fn run_update(url: &str) -> Result<(), OtaError> {
    std::thread::sleep(std::time::Duration::from_millis(50));
    info!("OTA(sim): pretended to flash {}", url);
    Ok(())
}
