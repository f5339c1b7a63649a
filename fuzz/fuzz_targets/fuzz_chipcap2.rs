//! Fuzz target: ChipCap2 frame decode → sensor document encode
//!
//! Every 4-byte frame must decode into the sensor's physical range and
//! the resulting document must fit the fixed envelope.
//!
//! cargo fuzz run fuzz_chipcap2

#![no_main]

use libfuzzer_sys::fuzz_target;
use sensornode::codec::{self, DOCUMENT_ENVELOPE};
use sensornode::sensors::chipcap2::decode;

fuzz_target!(|data: &[u8]| {
    let Some(frame) = data.get(..4) else {
        return;
    };
    let frame = [frame[0], frame[1], frame[2], frame[3]];

    let reading = decode(frame);
    assert!((0.0..=100.0).contains(&reading.humidity));
    assert!((-40.0..=125.0).contains(&reading.temperature));

    let mut buf = [0u8; DOCUMENT_ENVELOPE];
    let len = codec::encode_into(&reading, &mut buf).expect("decoded reading must encode");
    assert!(len <= DOCUMENT_ENVELOPE);
});
