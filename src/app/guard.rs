//! Sample guard: the one critical section of the node.
//!
//! The sensor, the message bus and the indicator sit behind a single
//! async mutex.  Sample-and-publish, bus reconnection and indicator
//! bursts each run under one acquisition, so a reconnect can never
//! interleave with a publish and two samples never overlap.
//!
//! ```text
//!  dispatcher ──▶ ┌──────────────────────────┐
//!                 │ Mutex<SharedDevices>     │──▶ SensorPort
//!  (tests:        │  sample · reconnect ·    │──▶ MessageBus
//!   N threads) ──▶│  blink                   │──▶ IndicatorPort
//!                 └──────────────────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};
use embassy_time::{Duration, Timer, with_timeout};
use log::{debug, info, warn};

use crate::codec::{self, DOCUMENT_ENVELOPE};
use crate::error::{Error, GuardError};
use crate::sensors::Reading;

use super::events::{LinkStatus, Trigger};
use super::ports::{IndicatorPort, MessageBus, SensorPort};

/// Everything the critical section protects.
pub struct SharedDevices<S, B, I> {
    pub sensor: S,
    pub bus: B,
    pub indicator: I,
}

/// Successful sample-and-publish.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleReport {
    pub reading: Reading,
    /// Encoded document length.
    pub bytes: usize,
}

pub type DevicesGuard<'a, S, B, I> = MutexGuard<'a, CriticalSectionRawMutex, SharedDevices<S, B, I>>;

pub struct SampleGuard<S, B, I> {
    inner: Mutex<CriticalSectionRawMutex, SharedDevices<S, B, I>>,
    /// `None` waits forever.
    wait: Option<Duration>,
}

impl<S, B, I> SampleGuard<S, B, I>
where
    S: SensorPort,
    B: MessageBus,
    I: IndicatorPort,
{
    /// `wait_ms == 0` means acquisition never times out.
    pub fn new(devices: SharedDevices<S, B, I>, wait_ms: u32) -> Self {
        Self {
            inner: Mutex::new(devices),
            wait: (wait_ms > 0).then(|| Duration::from_millis(u64::from(wait_ms))),
        }
    }

    /// Take the critical section.  Released when the returned guard drops.
    pub async fn acquire(&self) -> Result<DevicesGuard<'_, S, B, I>, GuardError> {
        match self.wait {
            None => Ok(self.inner.lock().await),
            Some(limit) => with_timeout(limit, self.inner.lock())
                .await
                .map_err(|_| GuardError::Timeout),
        }
    }

    /// Whether someone currently holds the critical section.
    pub fn is_held(&self) -> bool {
        self.inner.try_lock().is_err()
    }

    /// Toggle the indicator, read the sensor, encode and publish, all
    /// under one acquisition.  The trigger line is logged whatever the
    /// outcome once the section is held.
    pub async fn sample_and_publish(&self, trigger: Trigger) -> Result<SampleReport, Error> {
        let mut devices = self.acquire().await?;
        let result = Self::sample_locked(&mut *devices, trigger);
        info!("{}", trigger.message());
        result
    }

    fn sample_locked(
        devices: &mut SharedDevices<S, B, I>,
        trigger: Trigger,
    ) -> Result<SampleReport, Error> {
        devices.indicator.toggle();

        // The first conversion after idle returns a bad humidity word;
        // only the second result is used.
        let _ = devices.sensor.read();
        let reading = devices.sensor.read().map_err(|e| {
            warn!("[CHIPCAP2-ERROR] measurement failed ({}): {e}", trigger.as_str());
            Error::from(e)
        })?;

        let mut buf = [0u8; DOCUMENT_ENVELOPE];
        let len = codec::encode_into(&reading, &mut buf)?;
        devices.bus.publish(&buf[..len])?;

        if let Ok(doc) = core::str::from_utf8(&buf[..len]) {
            debug!("sensor document: {doc}");
        }

        Ok(SampleReport { reading, bytes: len })
    }

    /// Re-establish the bus session unless it is already up.  Waits for
    /// any in-flight sample to finish first.
    pub async fn reconnect_bus(&self) -> Result<LinkStatus, Error> {
        let mut devices = self.acquire().await?;
        if devices.bus.is_connected() {
            debug!("bus already connected; skipping reconnect");
            return Ok(LinkStatus::AlreadyUp);
        }
        info!("Re-initialising message bus ...");
        devices.bus.reconnect()?;
        info!("Message bus re-initialised.");
        Ok(LinkStatus::Reestablished)
    }

    /// Indicator burst: `count` toggles, `period` apart, ending dark.
    pub async fn blink(&self, count: u8, period: Duration) -> Result<(), Error> {
        let mut devices = self.acquire().await?;
        devices.indicator.set(false);
        for _ in 0..count {
            devices.indicator.toggle();
            Timer::after(period).await;
        }
        devices.indicator.set(false);
        Ok(())
    }

    /// Run `f` with exclusive access to the devices.
    pub async fn with_devices<R>(
        &self,
        f: impl FnOnce(&mut SharedDevices<S, B, I>) -> R,
    ) -> Result<R, Error> {
        let mut devices = self.acquire().await?;
        Ok(f(&mut *devices))
    }

    pub fn into_inner(self) -> SharedDevices<S, B, I> {
        self.inner.into_inner()
    }
}
