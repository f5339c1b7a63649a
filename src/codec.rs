//! Outbound sensor document encoder.
//!
//! Wire layout (compact JSON, fixed key order):
//!
//! ```text
//! {"sensor-data":[{"humidity":42.3},{"unit":"% (RH)"},{"temperature":21.7},{"unit":"°C"}]}
//! ```
//!
//! Serialisation goes into a fixed-capacity staging buffer first; the
//! caller's buffer is only written once the whole document is known to
//! fit.  No heap allocation.

use std::io;

use heapless::Vec;
use serde::Serialize;

use crate::error::EncodeError;
use crate::sensors::Reading;

/// Upper bound on an encoded document.
pub const DOCUMENT_ENVELOPE: usize = 200;

pub const HUMIDITY_UNIT: &str = "% (RH)";
pub const TEMPERATURE_UNIT: &str = "°C";

/// Encoded document bytes.
pub type Document = Vec<u8, DOCUMENT_ENVELOPE>;

#[derive(Serialize)]
struct SensorDocument {
    #[serde(rename = "sensor-data")]
    sensor_data: [Entry; 4],
}

#[derive(Serialize)]
#[serde(untagged)]
enum Entry {
    Humidity { humidity: f32 },
    Temperature { temperature: f32 },
    Unit { unit: &'static str },
}

impl SensorDocument {
    fn from_reading(reading: &Reading) -> Self {
        Self {
            sensor_data: [
                Entry::Humidity { humidity: reading.humidity },
                Entry::Unit { unit: HUMIDITY_UNIT },
                Entry::Temperature { temperature: reading.temperature },
                Entry::Unit { unit: TEMPERATURE_UNIT },
            ],
        }
    }
}

/// `io::Write` over a fixed buffer that refuses to grow.
struct Staging(Document);

impl io::Write for Staging {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .extend_from_slice(buf)
            .map_err(|()| io::Error::from(io::ErrorKind::WriteZero))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Encode `reading` into a fresh bounded document.
pub fn encode(reading: &Reading) -> Result<Document, EncodeError> {
    let mut staging = Staging(Document::new());
    serde_json::to_writer(&mut staging, &SensorDocument::from_reading(reading)).map_err(|e| {
        if e.is_io() {
            EncodeError::Overflow { capacity: DOCUMENT_ENVELOPE }
        } else {
            EncodeError::Serialize
        }
    })?;
    Ok(staging.0)
}

/// Encode `reading` into `out`, returning the number of bytes written.
/// On error `out` is left untouched.
pub fn encode_into(reading: &Reading, out: &mut [u8]) -> Result<usize, EncodeError> {
    let doc = encode(reading)?;
    let Some(dst) = out.get_mut(..doc.len()) else {
        return Err(EncodeError::Overflow { capacity: out.len() });
    };
    dst.copy_from_slice(&doc);
    Ok(doc.len())
}
