//! Dispatcher: event → action table, failure handling, loop lifetime.

use embassy_time::Duration;
use futures_lite::future::block_on;

use sensornode::adapters::time::MonotonicClock;
use sensornode::app::context::EventHub;
use sensornode::app::dispatcher::Dispatcher;
use sensornode::app::events::{AppEvent, LinkStatus, Trigger};
use sensornode::app::guard::SharedDevices;
use sensornode::app::inbound::InboundRouter;
use sensornode::error::{Error, LinkError, PublishError, SensorError, UpdateError};
use sensornode::events::Event;

use crate::mock_hw::{
    FakeClock, MockBus, MockIndicator, MockNet, MockSensor, RecordingSink, context, devices,
    fast_config,
};

const STEP: Duration = Duration::from_millis(50);

// ── Sampling ──────────────────────────────────────────────────

#[test]
fn button_press_samples_and_publishes() {
    let config = fast_config();
    let hub = EventHub::new(&config);
    let ctx = context(&hub, devices(), config);
    let clock = FakeClock::default();
    let mut dispatcher = Dispatcher::new(&ctx, &clock);
    let (mut net, mut sink) = (MockNet::new(), RecordingSink::new());

    hub.queue.try_send(Event::ButtonPress).unwrap();
    let handled = block_on(dispatcher.step(STEP, &mut net, &mut sink));
    assert_eq!(handled, Some(Event::ButtonPress));

    let (reads, toggles, doc) = block_on(ctx.guard().with_devices(|d| {
        (d.sensor.reads, d.indicator.toggles, d.bus.last_document())
    }))
    .unwrap();
    assert_eq!(reads, 2, "first conversion is discarded");
    assert_eq!(toggles, 1);

    let doc = doc.expect("one JSON document published");
    let entries = doc["sensor-data"].as_array().unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[1]["unit"], "% (RH)");

    assert!(matches!(
        sink.events.as_slice(),
        [AppEvent::Published { trigger: Trigger::ButtonPressed, .. }]
    ));
    assert_eq!(dispatcher.stats().samples_published, 1);
}

#[test]
fn events_are_handled_in_arrival_order() {
    let config = fast_config();
    let hub = EventHub::new(&config);
    let ctx = context(&hub, devices(), config);
    let clock = FakeClock::default();
    let mut dispatcher = Dispatcher::new(&ctx, &clock);
    let (mut net, mut sink) = (MockNet::new(), RecordingSink::new());

    hub.queue.try_send(Event::TimerElapsed).unwrap();
    hub.queue.try_send(Event::ButtonPress).unwrap();
    hub.queue.try_send(Event::RemoteSampleRequest).unwrap();
    while block_on(dispatcher.step(STEP, &mut net, &mut sink)).is_some() {}

    let triggers: Vec<Trigger> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::Published { trigger, .. } => Some(*trigger),
            _ => None,
        })
        .collect();
    assert_eq!(
        triggers,
        [Trigger::TimerElapsed, Trigger::ButtonPressed, Trigger::RemoteRequest]
    );
}

#[test]
fn sensor_failure_is_reported_and_nothing_published() {
    let config = fast_config();
    let hub = EventHub::new(&config);
    let sensor = MockSensor::new()
        .then(Ok(sensornode::sensors::Reading::from_values(0.0, 0.0)))
        .then(Err(SensorError::NoAcknowledge));
    let devs = SharedDevices { sensor, bus: MockBus::new(), indicator: MockIndicator::new() };
    let ctx = context(&hub, devs, config);
    let clock = FakeClock::default();
    let mut dispatcher = Dispatcher::new(&ctx, &clock);
    let (mut net, mut sink) = (MockNet::new(), RecordingSink::new());

    hub.queue.try_send(Event::TimerElapsed).unwrap();
    hub.queue.try_send(Event::TimerElapsed).unwrap();
    block_on(dispatcher.step(STEP, &mut net, &mut sink));
    block_on(dispatcher.step(STEP, &mut net, &mut sink));

    assert_eq!(
        sink.events[0],
        AppEvent::SampleFailed {
            trigger: Trigger::TimerElapsed,
            error: Error::Sensor(SensorError::NoAcknowledge),
        }
    );
    assert!(matches!(sink.events[1], AppEvent::Published { .. }), "next event still served");

    let published = block_on(ctx.guard().with_devices(|d| d.bus.published.len())).unwrap();
    assert_eq!(published, 1);
    assert_eq!(dispatcher.stats().sensor_errors, 1);
}

#[test]
fn publish_failure_is_counted() {
    let config = fast_config();
    let hub = EventHub::new(&config);
    let mut bus = MockBus::new();
    bus.fail_publish = Some(PublishError::Rejected);
    let devs = SharedDevices { sensor: MockSensor::new(), bus, indicator: MockIndicator::new() };
    let ctx = context(&hub, devs, config);
    let clock = FakeClock::default();
    let mut dispatcher = Dispatcher::new(&ctx, &clock);
    let (mut net, mut sink) = (MockNet::new(), RecordingSink::new());

    hub.queue.try_send(Event::ButtonPress).unwrap();
    block_on(dispatcher.step(STEP, &mut net, &mut sink));

    assert_eq!(
        sink.events,
        [AppEvent::SampleFailed {
            trigger: Trigger::ButtonPressed,
            error: Error::Publish(PublishError::Rejected),
        }]
    );
    assert_eq!(dispatcher.stats().publish_errors, 1);
}

#[test]
fn failing_sensor_never_publishes_or_stalls() {
    let config = fast_config();
    let hub = EventHub::new(&config);
    let mut sensor = MockSensor::new();
    sensor.script.extend((0..10).map(|_| Err(SensorError::Bus)));
    let devs = SharedDevices { sensor, bus: MockBus::new(), indicator: MockIndicator::new() };
    let ctx = context(&hub, devs, config);
    let clock = FakeClock::default();
    let mut dispatcher = Dispatcher::new(&ctx, &clock);
    let (mut net, mut sink) = (MockNet::new(), RecordingSink::new());

    for _ in 0..5 {
        hub.queue.try_send(Event::TimerElapsed).unwrap();
    }
    hub.queue.close();
    block_on(dispatcher.run(&mut net, &mut sink));

    let failures = sink
        .events
        .iter()
        .filter(|e| {
            matches!(e, AppEvent::SampleFailed { error: Error::Sensor(SensorError::Bus), .. })
        })
        .count();
    assert_eq!(failures, 5);
    assert_eq!(sink.published_count(), 0);
    assert_eq!(dispatcher.stats().sensor_errors, 5);
    assert!(!ctx.guard().is_held());
}

// ── Remote requests ───────────────────────────────────────────

#[test]
fn remote_request_latency_spans_enqueue_to_publish() {
    let config = fast_config();
    let hub = EventHub::new(&config);
    let ctx = context(&hub, devices(), config);
    let clock = FakeClock::at(1_000);
    let router = InboundRouter::new(&hub, &clock);
    let mut dispatcher = Dispatcher::new(&ctx, &clock);
    let (mut net, mut sink) = (MockNet::new(), RecordingSink::new());

    assert_eq!(router.on_message(b"read-and-publish"), Some(Event::RemoteSampleRequest));
    clock.advance_us(5_000);
    block_on(dispatcher.step(STEP, &mut net, &mut sink));

    assert!(sink.events.contains(&AppEvent::Latency { micros: 5_000, ok: true }));
    assert!(!hub.latency.is_armed());
}

#[test]
fn remote_latency_covers_the_sample_itself() {
    let config = fast_config();
    let hub = EventHub::new(&config);
    let mut sensor = MockSensor::new();
    sensor.read_delay = Some(std::time::Duration::from_millis(5));
    let devs = SharedDevices { sensor, bus: MockBus::new(), indicator: MockIndicator::new() };
    let ctx = context(&hub, devs, config);
    let clock = MonotonicClock::new();
    let router = InboundRouter::new(&hub, &clock);
    let mut dispatcher = Dispatcher::new(&ctx, &clock);
    let (mut net, mut sink) = (MockNet::new(), RecordingSink::new());

    router.on_message(b"read-and-publish");
    block_on(dispatcher.step(STEP, &mut net, &mut sink));

    let micros = sink.events.iter().find_map(|e| match e {
        AppEvent::Latency { micros, ok: true } => Some(*micros),
        _ => None,
    });
    assert!(micros.is_some_and(|us| us >= 10_000), "two 5 ms reads: {micros:?}");
}

#[test]
fn remote_request_without_probe_measures_from_dispatch() {
    let config = fast_config();
    let hub = EventHub::new(&config);
    let ctx = context(&hub, devices(), config);
    let clock = FakeClock::at(7_000);
    let mut dispatcher = Dispatcher::new(&ctx, &clock);
    let (mut net, mut sink) = (MockNet::new(), RecordingSink::new());

    hub.queue.try_send(Event::RemoteSampleRequest).unwrap();
    block_on(dispatcher.step(STEP, &mut net, &mut sink));

    assert!(sink.events.contains(&AppEvent::Latency { micros: 0, ok: true }));
}

#[test]
fn failed_remote_sample_still_reports_latency() {
    let config = fast_config();
    let hub = EventHub::new(&config);
    let mut bus = MockBus::new();
    bus.fail_publish = Some(PublishError::NotConnected);
    let devs = SharedDevices { sensor: MockSensor::new(), bus, indicator: MockIndicator::new() };
    let ctx = context(&hub, devs, config);
    let clock = FakeClock::default();
    let mut dispatcher = Dispatcher::new(&ctx, &clock);
    let (mut net, mut sink) = (MockNet::new(), RecordingSink::new());

    hub.queue.try_send(Event::RemoteSampleRequest).unwrap();
    block_on(dispatcher.step(STEP, &mut net, &mut sink));

    assert!(sink.events.contains(&AppEvent::Latency { micros: 0, ok: false }));
}

#[test]
fn firmware_update_is_started_not_awaited() {
    let config = fast_config();
    let hub = EventHub::new(&config);
    let ctx = context(&hub, devices(), config);
    let clock = FakeClock::default();
    let mut dispatcher = Dispatcher::new(&ctx, &clock);
    let (mut net, mut sink) = (MockNet::new(), RecordingSink::new());

    hub.queue.try_send(Event::RemoteFirmwareUpdate).unwrap();
    block_on(dispatcher.step(STEP, &mut net, &mut sink));
    assert_eq!(net.updates, 1);
    assert_eq!(sink.events, [AppEvent::FirmwareUpdateStarted]);

    net.fail_update = Some(UpdateError::AlreadyRunning);
    hub.queue.try_send(Event::RemoteFirmwareUpdate).unwrap();
    block_on(dispatcher.step(STEP, &mut net, &mut sink));
    assert_eq!(sink.events[1], AppEvent::FirmwareUpdateFailed(UpdateError::AlreadyRunning));
    assert_eq!(dispatcher.stats().updates_started, 1);
}

// ── Button hold ───────────────────────────────────────────────

#[test]
fn hold_reprovisions_without_sampling() {
    let config = fast_config();
    let hub = EventHub::new(&config);
    let ctx = context(&hub, devices(), config);
    let clock = FakeClock::default();
    let mut dispatcher = Dispatcher::new(&ctx, &clock);
    let (mut net, mut sink) = (MockNet::new(), RecordingSink::new());

    hub.queue.try_send(Event::ButtonHold).unwrap();
    block_on(dispatcher.step(STEP, &mut net, &mut sink));

    assert_eq!(net.reprovisions, 1);
    assert_eq!(sink.events, [AppEvent::Reprovisioning]);
    let reads = block_on(ctx.guard().with_devices(|d| d.sensor.reads)).unwrap();
    assert_eq!(reads, 0);
}

#[test]
fn failed_reprovision_is_reported() {
    let config = fast_config();
    let hub = EventHub::new(&config);
    let ctx = context(&hub, devices(), config);
    let clock = FakeClock::default();
    let mut dispatcher = Dispatcher::new(&ctx, &clock);
    let mut net = MockNet { fail_link: Some(LinkError::ConnectionFailed), ..MockNet::new() };
    let mut sink = RecordingSink::new();

    hub.queue.try_send(Event::ButtonHold).unwrap();
    block_on(dispatcher.step(STEP, &mut net, &mut sink));

    assert_eq!(
        sink.events,
        [AppEvent::ReprovisionFailed(Error::Link(LinkError::ConnectionFailed))]
    );
}

// ── Link events ───────────────────────────────────────────────

#[test]
fn link_down_reconnects_then_blinks() {
    let config = fast_config();
    let blinks = config.link_down_blinks;
    let hub = EventHub::new(&config);
    let devs = SharedDevices {
        sensor: MockSensor::new(),
        bus: MockBus::disconnected(),
        indicator: MockIndicator::new(),
    };
    let ctx = context(&hub, devs, config);
    let clock = FakeClock::default();
    let mut dispatcher = Dispatcher::new(&ctx, &clock);
    let (mut net, mut sink) = (MockNet::new(), RecordingSink::new());

    hub.queue.try_send(Event::LinkDown).unwrap();
    block_on(dispatcher.step(STEP, &mut net, &mut sink));

    assert_eq!(
        sink.events,
        [AppEvent::LinkDown, AppEvent::Reconnected(LinkStatus::Reestablished)]
    );
    let (reconnects, toggles, lit) = block_on(
        ctx.guard()
            .with_devices(|d| (d.bus.reconnects, d.indicator.toggles, d.indicator.lit)),
    )
    .unwrap();
    assert_eq!(reconnects, 1);
    assert_eq!(toggles, u32::from(blinks));
    assert!(!lit, "burst ends dark");
    assert_eq!(dispatcher.stats().reconnects, 1);
}

#[test]
fn repeated_link_down_reconnects_once() {
    let config = fast_config();
    let hub = EventHub::new(&config);
    let devs = SharedDevices {
        sensor: MockSensor::new(),
        bus: MockBus::disconnected(),
        indicator: MockIndicator::new(),
    };
    let ctx = context(&hub, devs, config);
    let clock = FakeClock::default();
    let mut dispatcher = Dispatcher::new(&ctx, &clock);
    let (mut net, mut sink) = (MockNet::new(), RecordingSink::new());

    hub.queue.try_send(Event::LinkDown).unwrap();
    hub.queue.try_send(Event::LinkDown).unwrap();
    block_on(dispatcher.step(STEP, &mut net, &mut sink));
    block_on(dispatcher.step(STEP, &mut net, &mut sink));

    assert!(sink.events.contains(&AppEvent::Reconnected(LinkStatus::AlreadyUp)));
    let reconnects = block_on(ctx.guard().with_devices(|d| d.bus.reconnects)).unwrap();
    assert_eq!(reconnects, 1);
}

#[test]
fn failed_reconnect_still_blinks() {
    let config = fast_config();
    let hub = EventHub::new(&config);
    let mut bus = MockBus::disconnected();
    bus.fail_reconnect = true;
    let devs = SharedDevices { sensor: MockSensor::new(), bus, indicator: MockIndicator::new() };
    let ctx = context(&hub, devs, config);
    let clock = FakeClock::default();
    let mut dispatcher = Dispatcher::new(&ctx, &clock);
    let (mut net, mut sink) = (MockNet::new(), RecordingSink::new());

    hub.queue.try_send(Event::LinkDown).unwrap();
    block_on(dispatcher.step(STEP, &mut net, &mut sink));

    assert_eq!(
        sink.events[1],
        AppEvent::ReconnectFailed(Error::Publish(PublishError::ClientInit))
    );
    let toggles = block_on(ctx.guard().with_devices(|d| d.indicator.toggles)).unwrap();
    assert!(toggles > 0);
    assert_eq!(dispatcher.stats().reconnect_failures, 1);
}

#[test]
fn link_up_and_none_have_no_side_effects() {
    let config = fast_config();
    let hub = EventHub::new(&config);
    let ctx = context(&hub, devices(), config);
    let clock = FakeClock::default();
    let mut dispatcher = Dispatcher::new(&ctx, &clock);
    let (mut net, mut sink) = (MockNet::new(), RecordingSink::new());

    hub.queue.try_send(Event::LinkUp).unwrap();
    hub.queue.try_send(Event::None).unwrap();
    block_on(dispatcher.step(STEP, &mut net, &mut sink));
    block_on(dispatcher.step(STEP, &mut net, &mut sink));

    assert_eq!(sink.events, [AppEvent::LinkUp]);
    let (reads, toggles) =
        block_on(ctx.guard().with_devices(|d| (d.sensor.reads, d.indicator.toggles))).unwrap();
    assert_eq!((reads, toggles), (0, 0));
    assert_eq!(dispatcher.stats().events, 2);
}

// ── Loop lifetime ─────────────────────────────────────────────

#[test]
fn run_drains_then_stops_when_closed() {
    let config = fast_config();
    let hub = EventHub::new(&config);
    let ctx = context(&hub, devices(), config);
    let clock = FakeClock::default();
    let mut dispatcher = Dispatcher::new(&ctx, &clock);
    let (mut net, mut sink) = (MockNet::new(), RecordingSink::new());

    hub.queue.try_send(Event::ButtonPress).unwrap();
    hub.queue.try_send(Event::TimerElapsed).unwrap();
    hub.queue.try_send(Event::LinkUp).unwrap();
    hub.queue.close();

    block_on(dispatcher.run(&mut net, &mut sink));

    assert_eq!(sink.events.first(), Some(&AppEvent::Started));
    assert_eq!(sink.published_count(), 2);
    assert_eq!(dispatcher.stats().events, 3);
}

#[test]
fn run_serves_producers_on_other_threads() {
    let config = fast_config();
    let hub = EventHub::new(&config);
    let ctx = context(&hub, devices(), config);
    let clock = FakeClock::default();
    let (mut net, mut sink) = (MockNet::new(), RecordingSink::new());

    std::thread::scope(|s| {
        s.spawn(|| {
            for _ in 0..5 {
                hub.queue
                    .send_blocking(Event::TimerElapsed, Duration::from_millis(500))
                    .unwrap();
                std::thread::sleep(std::time::Duration::from_millis(2));
            }
            hub.queue.close();
        });

        let mut dispatcher = Dispatcher::new(&ctx, &clock);
        block_on(dispatcher.run(&mut net, &mut sink));
    });

    assert_eq!(sink.published_count(), 5);
    assert_eq!(hub.queue.dropped(), 0);
}
