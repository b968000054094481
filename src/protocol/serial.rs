//! Hex line decoder for the serial meters
//!
//! Each reading is one ASCII line:
//!
//! ```text
//! SSSSBBBB[M]\n
//! ```
//!
//! - `SSSS` - shunt voltage, signed 16-bit, 4 hex digits
//! - `BBBB` - bus voltage, unsigned 16-bit, 4 hex digits
//! - `M` - optional raw marker byte naming the range (28 or 20)
//!
//! The meter computes in integer milliamps and millivolts; the decoder
//! truncates at the same points so its output matches the meter's display.

use crate::error::{PowerOsdError, Result};
use crate::types::Sample;
use serde::{Deserialize, Serialize};

/// Accepted trimmed line lengths
const MIN_LINE_LEN: usize = 8;
const MAX_LINE_LEN: usize = 11;

/// Raw marker byte sent by 28 V range meters
pub const MARKER_28V: u8 = 28;
/// Raw marker byte sent by 20 V range meters
pub const MARKER_20V: u8 = 20;

/// Scaling sub-protocol of a serial meter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SerialVariant {
    /// 28 V range, 50 mΩ shunt
    Range28V,
    /// 20 V range, 100 mΩ shunt; bus count is pre-divided by 8
    Range20V,
}

impl SerialVariant {
    /// Variant named by a raw marker byte
    pub fn from_marker(marker: u8) -> Option<Self> {
        match marker {
            MARKER_28V => Some(SerialVariant::Range28V),
            MARKER_20V => Some(SerialVariant::Range20V),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SerialVariant::Range28V => "serial-28v",
            SerialVariant::Range20V => "serial-20v",
        }
    }
}

impl std::fmt::Display for SerialVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Physical scaling of one variant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SerialQuanta {
    /// Millivolts per bus-voltage count
    pub voltage_quantum: f64,
    /// Milliamps per shunt-voltage count
    pub current_quantum: f64,
    /// Divisor applied to the raw bus count before scaling
    pub bus_divisor: f64,
}

/// Decode one serial line
pub fn decode_line(
    line: &[u8],
    variant: SerialVariant,
    quanta: &SerialQuanta,
    received_at: u64,
) -> Result<Sample> {
    let line = line.trim_ascii();
    if !(MIN_LINE_LEN..=MAX_LINE_LEN).contains(&line.len()) {
        return Err(PowerOsdError::malformed(format!(
            "bad {} line length {}",
            variant,
            line.len()
        )));
    }

    let shunt = parse_hex16(&line[0..4])
        .ok_or_else(|| PowerOsdError::malformed("non-hex shunt voltage field"))?
        as i16;
    let bus = parse_hex16(&line[4..8])
        .ok_or_else(|| PowerOsdError::malformed("non-hex bus voltage field"))?;

    let bus = f64::from(bus) / quanta.bus_divisor;
    let milliamps = ((f64::from(shunt) * quanta.current_quantum) as i32).unsigned_abs();
    let millivolts = (bus * quanta.voltage_quantum) as i32;

    Ok(Sample::new(
        f64::from(millivolts) / 1000.0,
        f64::from(milliamps) / 1000.0,
        received_at,
    ))
}

/// Variant announced by a line read during bring-up
///
/// A 9-byte line carries the raw marker byte. A 10-byte line whose tail is
/// two hex digits carries the marker hex-encoded. An 8-byte line has no
/// marker and is always the 20 V range.
pub fn variant_for_detection_line(line: &[u8]) -> Result<SerialVariant> {
    let line = line.trim_ascii();
    let marker = match line.len() {
        8 => return Ok(SerialVariant::Range20V),
        9 => line[8],
        10 => parse_hex8(&line[8..10]).ok_or_else(|| {
            PowerOsdError::Detection("10-byte detection line without hex marker".to_string())
        })?,
        n => {
            return Err(PowerOsdError::Detection(format!(
                "cannot obtain frame type from {}-byte line",
                n
            )))
        }
    };
    SerialVariant::from_marker(marker).ok_or_else(|| {
        PowerOsdError::Detection(format!("unknown range marker byte {}", marker))
    })
}

fn parse_hex16(digits: &[u8]) -> Option<u16> {
    digits.iter().try_fold(0u16, |acc, &b| {
        let nibble = char::from(b).to_digit(16)?;
        Some((acc << 4) | nibble as u16)
    })
}

fn parse_hex8(digits: &[u8]) -> Option<u8> {
    parse_hex16(digits).and_then(|v| u8::try_from(v).ok())
}
