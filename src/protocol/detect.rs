//! Serial protocol variant detection
//!
//! Run once right after a port is opened. The meter streams readings
//! continuously, so detection simply reads a line and inspects its length
//! and marker byte (see [`variant_for_detection_line`]). A short or unreadable
//! first line gets one more attempt.

use super::serial::{variant_for_detection_line, SerialVariant};
use crate::error::{PowerOsdError, Result};
use crate::transport::LineReader;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing of the detection handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    /// How long to wait for each detection line
    #[serde(with = "duration_millis")]
    pub line_timeout: Duration,
    /// Number of lines to inspect before giving up
    pub attempts: usize,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            line_timeout: Duration::from_millis(1000),
            attempts: 2,
        }
    }
}

/// Determine the serial variant from the first lines on the wire
pub fn detect_variant<R>(reader: &mut R, settings: &DetectionSettings) -> Result<SerialVariant>
where
    R: LineReader + ?Sized,
{
    let mut last_error = None;

    for attempt in 1..=settings.attempts {
        let Some(line) = reader.read_line(settings.line_timeout)? else {
            return Err(PowerOsdError::Timeout(format!(
                "no detection line within {:?} (attempt {})",
                settings.line_timeout, attempt
            )));
        };

        match variant_for_detection_line(&line) {
            Ok(variant) => {
                tracing::info!("Detected serial protocol {} on attempt {}", variant, attempt);
                return Ok(variant);
            }
            Err(e) => {
                tracing::debug!("Detection attempt {} inconclusive: {}", attempt, e);
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) => Err(e),
        None => Err(PowerOsdError::Detection("no detection attempts configured".to_string())),
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
