//! SensorNode Firmware: Main Entry Point
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Producers                                                   │
//! │  button task · sample timer · MQTT callback (InboundRouter)  │
//! │                          │ try_send / send_blocking          │
//! │                          ▼                                   │
//! │                EventQueue (16 × Event)                       │
//! │                          │ recv                              │
//! │                          ▼                                   │
//! │  Dispatcher ──▶ SampleGuard { ChipCap2, MqttBus, StatusLed } │
//! │             ──▶ WifiLink · OtaTrigger · LogEventSink         │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use anyhow::{Context, Result};
use esp_idf_hal::delay::Delay;
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::Hertz;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use futures_lite::future::block_on;
use log::{info, warn};

use sensornode::adapters::log_sink::LogEventSink;
use sensornode::adapters::mqtt::{MqttBus, Router};
use sensornode::adapters::ota::{self, OtaTrigger};
use sensornode::adapters::time::MonotonicClock;
use sensornode::adapters::wifi::WifiLink;
use sensornode::app::boot;
use sensornode::app::context::{EventHub, NodeContext};
use sensornode::app::dispatcher::Dispatcher;
use sensornode::app::guard::SharedDevices;
use sensornode::app::inbound::InboundRouter;
use sensornode::app::ports::NetworkServices;
use sensornode::config::NodeConfig;
use sensornode::drivers::button::ButtonTask;
use sensornode::drivers::hw_init;
use sensornode::drivers::hw_timer::SampleTimer;
use sensornode::drivers::status_led::StatusLed;
use sensornode::drivers::task::spawn_task;
use sensornode::error::Error;
use sensornode::pins;
use sensornode::sensors::chipcap2::ChipCap2;

const BUTTON_TASK_PRIORITY: u8 = 6;
const BUTTON_TASK_STACK_KB: usize = 4;

// Station credentials are baked in at build time; provisioning UX is
// out of scope for this firmware.
const WIFI_SSID: &str = match option_env!("SENSORNODE_WIFI_SSID") {
    Some(s) => s,
    None => "",
};
const WIFI_PASSWORD: &str = match option_env!("SENSORNODE_WIFI_PASSWORD") {
    Some(s) => s,
    None => "",
};

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  SensorNode v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = NodeConfig::default();
    config.validate()?;

    // ── 2. Peripherals ────────────────────────────────────────
    hw_init::init_peripherals().context("GPIO init")?;
    let peripherals = Peripherals::take()?;

    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio6,
        peripherals.pins.gpio7,
        &I2cConfig::new().baudrate(Hertz(pins::I2C_FREQ_HZ)),
    )?;
    let sensor = ChipCap2::with_address(i2c, Delay::new_default(), pins::CHIPCAP2_ADDR);
    let mut led = StatusLed::new(pins::LED_GPIO);

    // ── 3. Shared hub (lives for the whole program) ───────────
    let hub: &'static EventHub = Box::leak(Box::new(EventHub::new(&config)));
    if let Err(e) = hw_init::init_isr_service(&hub.edges) {
        warn!("ISR service init failed: {}; button presses dated by polling only", e);
    }

    // ── 4. Boot-time reprovision request ──────────────────────
    let reprovision = block_on(boot::check_reprovision_request(
        &config,
        hw_init::button_pressed,
        &mut led,
    ));

    // ── 5. Network bring-up ───────────────────────────────────
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let wifi = BlockingWifi::wrap(EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))?, sysloop)?;
    let mut link = WifiLink::new(wifi);
    if let Err(e) = link.set_credentials(WIFI_SSID, WIFI_PASSWORD) {
        warn!("WiFi credentials rejected: {}", e);
    }
    boot::bring_up_link(&mut link, reprovision)?;

    let router: &'static Router = Box::leak(Box::new(InboundRouter::new(hub, MonotonicClock::new())));
    let bus = MqttBus::start(&config, router).map_err(Error::from)?;

    // ── 6. Context ────────────────────────────────────────────
    let ctx = NodeContext::new(
        hub,
        SharedDevices { sensor, bus, indicator: led },
        config.clone(),
    )?;

    // ── 7. Producers ──────────────────────────────────────────
    let _sample_timer = SampleTimer::start(&hub.queue, config.sample_period_ms)?;

    let button_config = config.clone();
    spawn_task("button\0", BUTTON_TASK_PRIORITY, BUTTON_TASK_STACK_KB, move || {
        ButtonTask::new(&button_config, &hub.queue, &hub.edges)
            .run(hw_init::button_pressed, &MonotonicClock::new())
    })?;

    block_on(boot::signal_ready(&ctx))?;
    ota::check_rollback();
    info!("System ready. Entering event loop.");

    // ── 8. Dispatcher (runs on the main task) ─────────────────
    let mut net = NetworkServices {
        link,
        update: OtaTrigger::new(config.firmware_url.clone()),
    };
    let mut sink = LogEventSink::new();
    let mut dispatcher = Dispatcher::new(&ctx, MonotonicClock::new());
    block_on(dispatcher.run(&mut net, &mut sink));

    Ok(())
}
