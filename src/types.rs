//! Core data types for powerosd-rs
//!
//! This module contains the value types shared by every stage of the
//! ingestion pipeline.
//!
//! # Main Types
//!
//! - [`Sample`] - One decoded power measurement (V, A, W, Wh, timestamp)
//! - [`FieldValues`] - Per-field aggregate (voltage, current, power) returned by
//!   windowed history queries
//! - [`PdLevel`] - Nominal USB Power Delivery voltage step for a reading
//!
//! # Units
//!
//! Voltages are volts, currents amperes, power watts, energy watt-hours.
//! Timestamps are milliseconds since the Unix epoch.

use serde::{Deserialize, Serialize};

/// A single decoded power measurement
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Sample {
    /// Bus voltage in volts
    pub voltage: f64,
    /// Load current in amperes
    pub current: f64,
    /// Power in watts
    pub power: f64,
    /// Cumulative energy in watt-hours
    pub energy: f64,
    /// Capture time, milliseconds since the Unix epoch
    pub timestamp: u64,
}

impl Sample {
    /// Create a sample with power derived from voltage and current
    pub fn new(voltage: f64, current: f64, timestamp: u64) -> Self {
        Self {
            voltage,
            current,
            power: voltage * current,
            energy: 0.0,
            timestamp,
        }
    }

    /// Set the cumulative energy
    pub fn with_energy(mut self, energy: f64) -> Self {
        self.energy = energy;
        self
    }

    /// Set the power explicitly (when the device reports it)
    pub fn with_power(mut self, power: f64) -> Self {
        self.power = power;
        self
    }

    /// Voltage level this sample falls into
    pub fn pd_level(&self) -> PdLevel {
        PdLevel::classify(self.voltage)
    }
}

impl std::fmt::Display for Sample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.2}V {:.4}A {:.3}W {:.3}Wh",
            self.voltage, self.current, self.power, self.energy
        )
    }
}

/// Voltage, current and power aggregated independently over a window
///
/// The three values may come from three different samples.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldValues {
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
}

/// Nominal USB Power Delivery voltage level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PdLevel {
    /// No usable bus voltage
    #[default]
    None,
    V5,
    V9,
    V15,
    V20,
    V28,
    V36,
    V48,
}

impl PdLevel {
    /// Lower band edges in volts, ascending. A voltage belongs to the highest
    /// level whose edge it reaches.
    const BANDS: [(f64, PdLevel); 7] = [
        (4.0, PdLevel::V5),
        (7.0, PdLevel::V9),
        (12.0, PdLevel::V15),
        (17.5, PdLevel::V20),
        (24.0, PdLevel::V28),
        (32.0, PdLevel::V36),
        (42.0, PdLevel::V48),
    ];

    /// Classify a measured voltage into its nominal level
    pub fn classify(voltage: f64) -> PdLevel {
        Self::BANDS
            .iter()
            .rev()
            .find(|(edge, _)| voltage >= *edge)
            .map(|(_, level)| *level)
            .unwrap_or(PdLevel::None)
    }

    /// Nominal voltage of this level (0 for [`PdLevel::None`])
    pub fn nominal_volts(&self) -> u32 {
        match self {
            PdLevel::None => 0,
            PdLevel::V5 => 5,
            PdLevel::V9 => 9,
            PdLevel::V15 => 15,
            PdLevel::V20 => 20,
            PdLevel::V28 => 28,
            PdLevel::V36 => 36,
            PdLevel::V48 => 48,
        }
    }
}

impl std::fmt::Display for PdLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PdLevel::None => write!(f, "--"),
            level => write!(f, "{}V", level.nominal_volts()),
        }
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
