//! Serial port line reader and bring-up
//!
//! Meters enumerate as a USB CDC virtual COM port and stream one hex line per
//! reading at 9600 baud, 8N1, no flow control. Some firmware revisions run
//! at 115200, so [`open_serial`] walks the configured baud rates and keeps
//! the first one on which a protocol variant can be detected.

use super::LineReader;
use crate::config::SerialConfig;
use crate::error::{PowerOsdError, Result, ResultExt};
use crate::protocol::{detect_variant, DeviceProfile, SerialVariant};
use serialport::{
    DataBits, FlowControl, Parity, SerialPort, SerialPortInfo, SerialPortType, StopBits,
};
use std::io::{ErrorKind, Read};
use std::time::{Duration, Instant};

/// Size of a single port read
const READ_CHUNK: usize = 64;

/// Lines longer than this without a terminator are discarded
const MAX_PENDING_BYTES: usize = 4096;

/// An open serial port with line framing
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    pending: Vec<u8>,
    port_name: String,
    baud_rate: u32,
}

impl SerialLink {
    /// Open a port at the given baud rate, 8N1, no flow control
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(PowerOsdError::from)
            .with_context(|| format!("Failed to open {} at {} baud", port_name, baud_rate))?;

        Ok(Self {
            port,
            pending: Vec::with_capacity(READ_CHUNK),
            port_name: port_name.to_string(),
            baud_rate,
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    fn take_line(&mut self) -> Option<Vec<u8>> {
        let pos = self.pending.iter().position(|&b| b == b'\n')?;
        Some(self.pending.drain(..=pos).collect())
    }
}

impl LineReader for SerialLink {
    fn read_line(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        let deadline = Instant::now() + timeout;
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            self.port.set_timeout(deadline - now)?;

            match self.port.read(&mut chunk) {
                Ok(0) => {}
                Ok(n) => {
                    self.pending.extend_from_slice(&chunk[..n]);
                    if self.pending.len() > MAX_PENDING_BYTES && !self.pending.contains(&b'\n') {
                        tracing::warn!(
                            "Discarding {} unterminated bytes from {}",
                            self.pending.len(),
                            self.port_name
                        );
                        self.pending.clear();
                    }
                }
                Err(e) if e.kind() == ErrorKind::TimedOut => {}
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Open a meter's port and detect its protocol variant
///
/// Tries each configured baud rate in order. Fails with the last detection
/// error when no rate yields a recognizable line.
pub fn open_serial(port_name: &str, config: &SerialConfig) -> Result<(SerialLink, SerialVariant)> {
    let mut last_error = None;

    for &baud_rate in &config.baud_rates {
        let mut link = SerialLink::open(port_name, baud_rate)?;
        match detect_variant(&mut link, &config.detection) {
            Ok(variant) => {
                tracing::info!(
                    "Connected to {} at {} baud ({})",
                    port_name,
                    baud_rate,
                    variant
                );
                return Ok((link, variant));
            }
            Err(e) => {
                tracing::warn!(
                    "No recognizable protocol on {} at {} baud: {}",
                    port_name,
                    baud_rate,
                    e
                );
                last_error = Some(e);
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| PowerOsdError::Config("no serial baud rates configured".to_string()))
        .with_context(format!("Serial bring-up on {}", port_name)))
}

/// Whether `port_name` is a USB adapter with the meter's vendor and product id
///
/// `None` when the port is not enumerated or is not a USB port, in which
/// case nothing can be said about it.
pub fn usb_identity_matches(port_name: &str, profile: &DeviceProfile) -> Option<bool> {
    match serialport::available_ports() {
        Ok(ports) => identity_in(&ports, port_name, profile),
        Err(e) => {
            tracing::debug!("Could not enumerate serial ports: {}", e);
            None
        }
    }
}

fn identity_in(ports: &[SerialPortInfo], port_name: &str, profile: &DeviceProfile) -> Option<bool> {
    let info = ports.iter().find(|p| p.port_name == port_name)?;
    match &info.port_type {
        SerialPortType::UsbPort(usb) => Some(profile.matches_usb(usb.vid, usb.pid)),
        _ => None,
    }
}
