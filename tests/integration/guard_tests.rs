//! Sample guard: mutual exclusion, bounded waits, reconnect ordering.

use std::sync::atomic::Ordering;

use embassy_time::Duration;
use futures_lite::future::block_on;

use sensornode::app::context::EventHub;
use sensornode::app::events::{LinkStatus, Trigger};
use sensornode::app::guard::SharedDevices;
use sensornode::config::NodeConfig;
use sensornode::error::{Error, GuardError, PublishError, SensorError};
use sensornode::sensors::Reading;

use crate::mock_hw::{
    MockBus, MockIndicator, MockSensor, capture_logs, context, devices, fast_config,
    logged_on_this_thread,
};

#[test]
fn concurrent_samples_never_overlap() {
    let config = fast_config();
    let hub = EventHub::new(&config);
    let mut sensor = MockSensor::new();
    sensor.read_delay = Some(std::time::Duration::from_millis(1));
    let overlaps = sensor.overlaps.clone();
    let devs = SharedDevices { sensor, bus: MockBus::new(), indicator: MockIndicator::new() };
    let ctx = context(&hub, devs, config);

    const THREADS: usize = 4;
    const PER_THREAD: usize = 5;
    std::thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                for _ in 0..PER_THREAD {
                    block_on(ctx.guard().sample_and_publish(Trigger::TimerElapsed)).unwrap();
                }
            });
        }
    });

    assert_eq!(overlaps.load(Ordering::Relaxed), 0);
    let (published, reads) =
        block_on(ctx.guard().with_devices(|d| (d.bus.published.len(), d.sensor.reads))).unwrap();
    assert_eq!(published, THREADS * PER_THREAD);
    assert_eq!(reads as usize, 2 * THREADS * PER_THREAD);
}

#[test]
fn bounded_wait_times_out_while_held() {
    let config = NodeConfig { guard_wait_ms: 20, ..fast_config() };
    let hub = EventHub::new(&config);
    let ctx = context(&hub, devices(), config);
    let guard = ctx.guard();

    let held = block_on(guard.acquire()).unwrap();
    assert!(guard.is_held());
    let r = block_on(guard.sample_and_publish(Trigger::ButtonPressed));
    assert_eq!(r, Err(Error::Guard(GuardError::Timeout)));
    assert_eq!(held.sensor.reads, 0, "nothing ran without the guard");
    drop(held);

    assert!(!guard.is_held());
    assert!(block_on(guard.sample_and_publish(Trigger::ButtonPressed)).is_ok());
}

#[test]
fn reconnect_waits_for_in_flight_holder() {
    let config = fast_config();
    let hub = EventHub::new(&config);
    let devs = SharedDevices {
        sensor: MockSensor::new(),
        bus: MockBus::disconnected(),
        indicator: MockIndicator::new(),
    };
    let ctx = context(&hub, devs, config);
    let guard = ctx.guard();

    std::thread::scope(|s| {
        let held = block_on(guard.acquire()).unwrap();
        let reconnect = s.spawn(|| block_on(guard.reconnect_bus()));

        std::thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(held.bus.reconnects, 0, "reconnect must not run under another holder");
        drop(held);

        assert_eq!(reconnect.join().unwrap(), Ok(LinkStatus::Reestablished));
    });

    let reconnects = block_on(guard.with_devices(|d| d.bus.reconnects)).unwrap();
    assert_eq!(reconnects, 1);
}

#[test]
fn reconnect_skipped_when_connected() {
    let config = fast_config();
    let hub = EventHub::new(&config);
    let ctx = context(&hub, devices(), config);

    assert_eq!(block_on(ctx.guard().reconnect_bus()), Ok(LinkStatus::AlreadyUp));
    let reconnects = block_on(ctx.guard().with_devices(|d| d.bus.reconnects)).unwrap();
    assert_eq!(reconnects, 0);
}

#[test]
fn blink_toggles_count_times_and_ends_dark() {
    let config = fast_config();
    let hub = EventHub::new(&config);
    let mut devs = devices();
    devs.indicator.lit = true;
    let ctx = context(&hub, devs, config);

    block_on(ctx.guard().blink(3, Duration::from_millis(1))).unwrap();

    let (toggles, lit, sets) = block_on(
        ctx.guard()
            .with_devices(|d| (d.indicator.toggles, d.indicator.lit, d.indicator.sets.clone())),
    )
    .unwrap();
    assert_eq!(toggles, 3);
    assert!(!lit);
    assert_eq!(sets, [false, false]);
}

#[test]
fn sample_toggles_indicator_before_reading() {
    let config = fast_config();
    let hub = EventHub::new(&config);
    let ctx = context(&hub, devices(), config);

    let report = block_on(ctx.guard().sample_and_publish(Trigger::RemoteRequest)).unwrap();
    assert!((report.reading.humidity - 42.3).abs() < 1e-4);
    assert!(report.bytes > 0);

    let devs = ctx.into_guard().into_inner();
    assert_eq!(devs.indicator.toggles, 1);
    assert_eq!(devs.bus.published[0].len(), report.bytes);
}

#[test]
fn trigger_line_logged_when_sample_fails() {
    capture_logs();
    let config = fast_config();
    let hub = EventHub::new(&config);

    let mut bus = MockBus::new();
    bus.fail_publish = Some(PublishError::Rejected);
    let devs = SharedDevices { sensor: MockSensor::new(), bus, indicator: MockIndicator::new() };
    let ctx = context(&hub, devs, config.clone());
    let r = block_on(ctx.guard().sample_and_publish(Trigger::ButtonPressed));
    assert_eq!(r, Err(Error::Publish(PublishError::Rejected)));

    let sensor = MockSensor::new()
        .then(Ok(Reading::from_values(0.0, 0.0)))
        .then(Err(SensorError::Bus));
    let devs = SharedDevices { sensor, bus: MockBus::new(), indicator: MockIndicator::new() };
    let ctx = context(&hub, devs, config);
    let r = block_on(ctx.guard().sample_and_publish(Trigger::RemoteRequest));
    assert_eq!(r, Err(Error::Sensor(SensorError::Bus)));

    let lines = logged_on_this_thread();
    assert!(lines.iter().any(|l| l == Trigger::ButtonPressed.message()), "{lines:?}");
    assert!(lines.iter().any(|l| l == Trigger::RemoteRequest.message()), "{lines:?}");
}
