//! Boot sequence: reprovision request, link bring-up, ready burst.

use std::cell::Cell;

use futures_lite::future::block_on;

use sensornode::app::boot;
use sensornode::app::context::EventHub;
use sensornode::config::NodeConfig;
use sensornode::error::{Error, LinkError};

use crate::mock_hw::{MockIndicator, MockNet, context, devices, fast_config};

fn boot_config() -> NodeConfig {
    NodeConfig { hold_ms: 60, ..fast_config() }
}

#[test]
fn released_button_means_normal_boot() {
    let config = boot_config();
    let mut led = MockIndicator::new();
    let reprovision = block_on(boot::check_reprovision_request(&config, || false, &mut led));
    assert!(!reprovision);
    assert_eq!(led.toggles, 0);
}

#[test]
fn button_held_through_hold_requests_reprovision() {
    let config = boot_config();
    let mut led = MockIndicator::new();
    let reprovision = block_on(boot::check_reprovision_request(&config, || true, &mut led));
    assert!(reprovision);
    assert_eq!(led.toggles, u32::from(config.reprovision_flash_count));
}

#[test]
fn button_released_before_hold_is_ignored() {
    let config = boot_config();
    let mut led = MockIndicator::new();
    let polls = Cell::new(0u32);
    let pressed = || {
        polls.set(polls.get() + 1);
        polls.get() == 1
    };
    let reprovision = block_on(boot::check_reprovision_request(&config, pressed, &mut led));
    assert!(!reprovision);
    assert_eq!(polls.get(), 2, "level sampled before and after the hold interval");
    assert_eq!(led.toggles, 0);
}

#[test]
fn link_bring_up_forwards_reprovision_flag() {
    let mut net = MockNet::new();
    boot::bring_up_link(&mut net, true).unwrap();
    boot::bring_up_link(&mut net, false).unwrap();
    assert_eq!(net.connects, [true, false]);
}

#[test]
fn link_bring_up_failure_propagates() {
    let mut net = MockNet { fail_link: Some(LinkError::NoCredentials), ..MockNet::new() };
    assert_eq!(
        boot::bring_up_link(&mut net, false),
        Err(Error::Link(LinkError::NoCredentials))
    );
}

#[test]
fn ready_burst_uses_startup_blinks() {
    let config = fast_config();
    let blinks = config.startup_blinks;
    let hub = EventHub::new(&config);
    let ctx = context(&hub, devices(), config);

    block_on(boot::signal_ready(&ctx)).unwrap();

    let devs = ctx.into_guard().into_inner();
    assert_eq!(devs.indicator.toggles, u32::from(blinks));
    assert!(!devs.indicator.lit);
}
