//! Fuzz target: `ControlMessage::parse` and `InboundRouter::on_message`
//!
//! Arbitrary payloads must never panic, only the two exact commands
//! (modulo surrounding whitespace / NUL) may be recognised, and the
//! router must never queue more than one event per message.
//!
//! cargo fuzz run fuzz_control_message

#![no_main]

use libfuzzer_sys::fuzz_target;
use sensornode::app::context::EventHub;
use sensornode::app::inbound::{ControlMessage, InboundRouter};
use sensornode::app::ports::Clock;
use sensornode::config::NodeConfig;

struct Zero;

impl Clock for Zero {
    fn now_us(&self) -> u64 {
        0
    }
}

fuzz_target!(|data: &[u8]| {
    if let Some(msg) = ControlMessage::parse(data) {
        let text = match msg {
            ControlMessage::ReadAndPublish => ControlMessage::READ_AND_PUBLISH,
            ControlMessage::UpdateFirmware => ControlMessage::UPDATE_FIRMWARE,
        };
        let trimmed: Vec<u8> = data
            .iter()
            .copied()
            .skip_while(|b| b.is_ascii_whitespace() || *b == 0)
            .collect();
        assert!(trimmed.starts_with(text.as_bytes()), "accepted a non-command");
    }

    let hub = EventHub::new(&NodeConfig::default());
    let router = InboundRouter::new(&hub, Zero);
    let queued = router.on_message(data);
    assert_eq!(hub.queue.len(), usize::from(queued.is_some()));
    assert_eq!(hub.latency.is_armed(), queued == Some(ControlMessage::ReadAndPublish.event()));
});
