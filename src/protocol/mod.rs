//! Wire protocols spoken by USB power meters
//!
//! Every transport hands the pipeline a [`RawFrame`]: a payload tagged with
//! the protocol it was received in. [`decode`] is the single entry point that
//! turns any frame into a [`Sample`].
//!
//! # Protocols
//!
//! - **JSON over BLE** ([`ble`]): one JSON object per characteristic
//!   notification with `voltage`, `current`, `power`, `charge` and an
//!   optional `timestamp`.
//! - **Hex over serial** ([`serial`]): one ASCII line per reading with a
//!   signed shunt-voltage count and an unsigned bus-voltage count, in one of
//!   two scaling variants. The variant is detected once per connection by
//!   [`detect`].
//!
//! # Constants as data
//!
//! Scaling quanta ([`ProtocolConstants`]) and device identifiers
//! ([`DeviceProfile`]) are plain values carried in the configuration so
//! each variant can be exercised in isolation.

pub mod ble;
pub mod detect;
pub mod serial;

pub use detect::{detect_variant, DetectionSettings};
pub use serial::{SerialQuanta, SerialVariant};

use crate::error::Result;
use crate::types::Sample;
use serde::{Deserialize, Serialize};

/// A raw payload as received from a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawFrame {
    /// UTF-8 JSON text from a BLE notification
    Json(Vec<u8>),
    /// One serial line (terminator included or not) in a known variant
    Serial {
        line: Vec<u8>,
        variant: SerialVariant,
    },
}

impl RawFrame {
    /// Short protocol name for diagnostics
    pub fn protocol_name(&self) -> &'static str {
        match self {
            RawFrame::Json(_) => "json",
            RawFrame::Serial { variant, .. } => variant.name(),
        }
    }

    /// Raw payload bytes
    pub fn payload(&self) -> &[u8] {
        match self {
            RawFrame::Json(bytes) => bytes,
            RawFrame::Serial { line, .. } => line,
        }
    }
}

/// Protocol a transport's payloads are tagged with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Json,
    Serial(SerialVariant),
}

impl FrameKind {
    /// Wrap a payload received in this protocol
    pub fn frame(self, payload: Vec<u8>) -> RawFrame {
        match self {
            FrameKind::Json => RawFrame::Json(payload),
            FrameKind::Serial(variant) => RawFrame::Serial {
                line: payload,
                variant,
            },
        }
    }
}

/// Scaling constants for the serial protocol variants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConstants {
    /// 28 V range, 50 mΩ shunt
    pub range_28v: SerialQuanta,
    /// 20 V range, 100 mΩ shunt
    pub range_20v: SerialQuanta,
}

impl Default for ProtocolConstants {
    fn default() -> Self {
        Self {
            range_28v: SerialQuanta {
                voltage_quantum: 3.125,
                current_quantum: 0.2,
                bus_divisor: 1.0,
            },
            range_20v: SerialQuanta {
                voltage_quantum: 4.0,
                current_quantum: 0.06,
                bus_divisor: 8.0,
            },
        }
    }
}

impl ProtocolConstants {
    /// Quanta in effect for a variant
    pub fn quanta(&self, variant: SerialVariant) -> &SerialQuanta {
        match variant {
            SerialVariant::Range28V => &self.range_28v,
            SerialVariant::Range20V => &self.range_20v,
        }
    }
}

/// Identifiers of the supported meters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceProfile {
    /// USB vendor id of the serial adapter
    pub usb_vendor_id: u16,
    /// USB product id of the serial adapter
    pub usb_product_id: u16,
    /// Substring matched (case-insensitively) against BLE advertised names
    pub ble_name: String,
    /// GATT service carrying the measurements
    pub ble_service_uuid: String,
    /// Notifying characteristic with the JSON payload
    pub ble_data_characteristic_uuid: String,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            usb_vendor_id: 0x0483,
            usb_product_id: 0x5740,
            ble_name: "MacWake-USBPowerMeter".to_string(),
            ble_service_uuid: "01bc9d6f-5b93-41bc-b63f-da5011e34f68".to_string(),
            ble_data_characteristic_uuid: "307fc9ab-5438-4e03-83fa-b9fc3d6afde2".to_string(),
        }
    }
}

impl DeviceProfile {
    /// Whether a USB serial adapter belongs to a supported meter
    pub fn matches_usb(&self, vendor_id: u16, product_id: u16) -> bool {
        vendor_id == self.usb_vendor_id && product_id == self.usb_product_id
    }
}

/// Decode any raw frame, stamping frames without a device timestamp with
/// the current wall clock
pub fn decode(frame: &RawFrame, constants: &ProtocolConstants) -> Result<Sample> {
    decode_at(frame, constants, crate::types::now_millis())
}

/// Decode any raw frame with an explicit receive time (ms since epoch)
pub fn decode_at(
    frame: &RawFrame,
    constants: &ProtocolConstants,
    received_at: u64,
) -> Result<Sample> {
    match frame {
        RawFrame::Json(payload) => ble::decode_json(payload, received_at),
        RawFrame::Serial { line, variant } => {
            serial::decode_line(line, *variant, constants.quanta(*variant), received_at)
        }
    }
}
