//! JSON payload decoder for BLE notifications
//!
//! Payload example:
//!
//! ```text
//! {"voltage":20.1,"current":1.52,"power":30.55,"charge":0.42,"timestamp":1718000000000}
//! ```
//!
//! Missing numeric fields decode as 0.0. A missing or zero timestamp is
//! replaced by the receive time. Unknown fields are ignored.

use crate::error::{PowerOsdError, Result};
use crate::types::Sample;
use serde_json::Value;

/// Reported power may differ from V×I by this much before it is logged
const POWER_MISMATCH_TOLERANCE_W: f64 = 0.05;
const POWER_MISMATCH_TOLERANCE_REL: f64 = 0.05;

/// Decode one JSON notification
///
/// `charge` is carried into the sample's `energy` field; the energy
/// accumulator replaces it downstream.
pub fn decode_json(payload: &[u8], received_at: u64) -> Result<Sample> {
    let value: Value = serde_json::from_slice(payload)
        .map_err(|e| PowerOsdError::malformed(format!("JSON parse error: {}", e)))?;

    let Value::Object(fields) = value else {
        return Err(PowerOsdError::malformed("JSON payload is not an object"));
    };

    let number = |key: &str| fields.get(key).and_then(Value::as_f64);

    let voltage = number("voltage").unwrap_or(0.0);
    let current = number("current").unwrap_or(0.0);
    let charge = number("charge").unwrap_or(0.0);

    let computed = voltage * current;
    let power = match number("power") {
        Some(reported) => {
            let tolerance =
                POWER_MISMATCH_TOLERANCE_W.max(computed.abs() * POWER_MISMATCH_TOLERANCE_REL);
            if (reported - computed).abs() > tolerance {
                tracing::debug!(
                    "Reported power {:.3}W differs from V*I {:.3}W",
                    reported,
                    computed
                );
            }
            reported
        }
        None => computed,
    };

    let timestamp = match fields.get("timestamp").and_then(timestamp_millis) {
        Some(ts) if ts != 0 => ts,
        _ => received_at,
    };

    Ok(Sample {
        voltage,
        current,
        power,
        energy: charge,
        timestamp,
    })
}

/// Interpret a timestamp field as integer milliseconds
fn timestamp_millis(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}
