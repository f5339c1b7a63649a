//! Event dispatcher: the single consumer of the event queue.
//!
//! ```text
//!  EventQueue ──▶ ┌──────────────┐ ──▶ SampleGuard (sample · reconnect · blink)
//!                 │  Dispatcher  │ ──▶ ProvisioningPort / FirmwareUpdatePort
//!                 └──────────────┘ ──▶ EventSink
//! ```
//!
//! | Event                | Action                                           |
//! |----------------------|--------------------------------------------------|
//! | ButtonPress          | sample and publish                               |
//! | ButtonHold           | reprovision (outside the guard)                  |
//! | TimerElapsed         | sample and publish                               |
//! | RemoteSampleRequest  | sample and publish, report end-to-end latency    |
//! | RemoteFirmwareUpdate | start the update, do not wait for it             |
//! | LinkUp               | log                                              |
//! | LinkDown             | reconnect under the guard, then indicator burst  |
//! | None                 | nothing                                          |
//!
//! Every failure is counted, logged and emitted; none ends the loop.

use embassy_time::Duration;
use log::{info, warn};

use crate::error::Error;
use crate::events::Event;

use super::context::NodeContext;
use super::events::{AppEvent, LinkStatus, Trigger};
use super::guard::SampleReport;
use super::ports::{
    Clock, EventSink, FirmwareUpdatePort, IndicatorPort, MessageBus, ProvisioningPort, SensorPort,
};

/// Running totals since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub events: u32,
    pub samples_published: u32,
    pub sensor_errors: u32,
    pub publish_errors: u32,
    pub encode_errors: u32,
    pub guard_timeouts: u32,
    pub reconnects: u32,
    pub reconnect_failures: u32,
    pub reprovisions: u32,
    pub updates_started: u32,
}

impl DispatchStats {
    fn record_sample_error(&mut self, error: &Error) {
        match error {
            Error::Sensor(_) => self.sensor_errors += 1,
            Error::Publish(_) => self.publish_errors += 1,
            Error::Encode(_) => self.encode_errors += 1,
            Error::Guard(_) => self.guard_timeouts += 1,
            _ => {}
        }
    }
}

pub struct Dispatcher<'a, S, B, I, C> {
    ctx: &'a NodeContext<'a, S, B, I>,
    clock: C,
    stats: DispatchStats,
}

impl<'a, S, B, I, C> Dispatcher<'a, S, B, I, C>
where
    S: SensorPort,
    B: MessageBus,
    I: IndicatorPort,
    C: Clock,
{
    pub fn new(ctx: &'a NodeContext<'a, S, B, I>, clock: C) -> Self {
        Self {
            ctx,
            clock,
            stats: DispatchStats::default(),
        }
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Drain the queue until it is closed.  On the device it never is.
    pub async fn run<N, K>(&mut self, net: &mut N, sink: &mut K)
    where
        N: ProvisioningPort + FirmwareUpdatePort,
        K: EventSink,
    {
        sink.emit(&AppEvent::Started);
        info!("dispatcher started");

        while let Some(event) = self.ctx.queue().recv().await {
            self.dispatch(event, net, sink).await;
        }

        info!("event queue closed; dispatcher stopping");
        self.log_stats();
    }

    /// Wait up to `timeout` for one event and handle it.
    pub async fn step<N, K>(&mut self, timeout: Duration, net: &mut N, sink: &mut K) -> Option<Event>
    where
        N: ProvisioningPort + FirmwareUpdatePort,
        K: EventSink,
    {
        let event = self.ctx.queue().receive(timeout).await?;
        self.dispatch(event, net, sink).await;
        Some(event)
    }

    pub async fn dispatch<N, K>(&mut self, event: Event, net: &mut N, sink: &mut K)
    where
        N: ProvisioningPort + FirmwareUpdatePort,
        K: EventSink,
    {
        self.stats.events += 1;

        match event {
            Event::None => {}

            Event::ButtonPress => {
                let _ = self.sample(Trigger::ButtonPressed, sink).await;
            }

            Event::TimerElapsed => {
                let _ = self.sample(Trigger::TimerElapsed, sink).await;
            }

            Event::RemoteSampleRequest => {
                let start_us = self
                    .ctx
                    .hub()
                    .latency
                    .take()
                    .unwrap_or_else(|| self.clock.now_us());
                let ok = self.sample(Trigger::RemoteRequest, sink).await.is_ok();
                let micros = self.clock.now_us().saturating_sub(start_us);
                info!("[TIMING] {} ms", micros / 1000);
                sink.emit(&AppEvent::Latency { micros, ok });
            }

            Event::ButtonHold => {
                info!("[EVENT] BUTTON-HOLD");
                info!("Reprovisioning the WiFi ...");
                match net.reprovision() {
                    Ok(()) => {
                        self.stats.reprovisions += 1;
                        info!("WiFi provisioned again.");
                        sink.emit(&AppEvent::Reprovisioning);
                    }
                    Err(e) => {
                        warn!("reprovisioning failed: {e}");
                        sink.emit(&AppEvent::ReprovisionFailed(e.into()));
                    }
                }
            }

            Event::RemoteFirmwareUpdate => {
                info!("[EVENT] MQTT-UPDATE-FIRMWARE-RECEIVED");
                match net.start_update() {
                    Ok(()) => {
                        self.stats.updates_started += 1;
                        sink.emit(&AppEvent::FirmwareUpdateStarted);
                    }
                    Err(e) => {
                        warn!("firmware update not started: {e}");
                        sink.emit(&AppEvent::FirmwareUpdateFailed(e));
                    }
                }
            }

            Event::LinkUp => {
                info!("[EVENT] MQTT-CONNECTED");
                sink.emit(&AppEvent::LinkUp);
            }

            Event::LinkDown => {
                info!("[EVENT] MQTT-DISCONNECTED");
                sink.emit(&AppEvent::LinkDown);
                self.recover_link(sink).await;
            }
        }
    }

    async fn sample<K: EventSink>(&mut self, trigger: Trigger, sink: &mut K) -> Result<SampleReport, Error> {
        let result = self.ctx.guard().sample_and_publish(trigger).await;
        match &result {
            Ok(report) => {
                self.stats.samples_published += 1;
                sink.emit(&AppEvent::Published {
                    trigger,
                    reading: report.reading,
                    bytes: report.bytes,
                });
            }
            Err(e) => {
                self.stats.record_sample_error(e);
                warn!("sample ({}) failed: {e}", trigger.as_str());
                sink.emit(&AppEvent::SampleFailed { trigger, error: *e });
            }
        }
        result
    }

    async fn recover_link<K: EventSink>(&mut self, sink: &mut K) {
        let guard = self.ctx.guard();
        match guard.reconnect_bus().await {
            Ok(status) => {
                if status == LinkStatus::Reestablished {
                    self.stats.reconnects += 1;
                }
                sink.emit(&AppEvent::Reconnected(status));
            }
            Err(e) => {
                self.stats.reconnect_failures += 1;
                warn!("message bus reconnect failed: {e}");
                sink.emit(&AppEvent::ReconnectFailed(e));
            }
        }

        let config = self.ctx.config();
        let period = Duration::from_millis(u64::from(config.blink_period_ms));
        if let Err(e) = guard.blink(config.link_down_blinks, period).await {
            warn!("indicator burst skipped: {e}");
        }
    }

    pub fn log_stats(&self) {
        let s = &self.stats;
        info!(
            "STATS | events={} published={} sensor_err={} publish_err={} encode_err={} \
             guard_timeouts={} reconnects={}/{} reprovisions={} updates={} queue_drops={}",
            s.events,
            s.samples_published,
            s.sensor_errors,
            s.publish_errors,
            s.encode_errors,
            s.guard_timeouts,
            s.reconnects,
            s.reconnects + s.reconnect_failures,
            s.reprovisions,
            s.updates_started,
            self.ctx.queue().dropped(),
        );
    }
}
