//! Display snapshot of the live values
//!
//! The live labels smooth over single-sample dips by showing the per-field
//! maxima of the newest three samples. Min/max current spans the whole
//! retained history.

use crate::history::MeasurementHistory;
use crate::types::{FieldValues, PdLevel, Sample};
use serde::Serialize;

/// Window for the live voltage/current/power labels
pub const LIVE_WINDOW: usize = 3;

/// Placeholder shown for a value that is not available yet
pub const NO_DATA: &str = "---";

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Readout {
    /// Live voltage, current and power
    pub live: Option<FieldValues>,
    /// Cumulative energy of the newest sample in Wh
    pub energy: Option<f64>,
    /// Session minimum and maximum current
    pub current_range: Option<(f64, f64)>,
    /// Voltage level of the newest sample
    pub pd_level: PdLevel,
    /// Samples currently held
    pub sample_count: usize,
}

impl Readout {
    /// Build the readout from the history and the last decoded sample
    pub fn from_history(history: &MeasurementHistory, last_raw: Option<&Sample>) -> Self {
        let Some(newest) = history.newest() else {
            return Self::default();
        };

        let live = history.max_values_last_n(LIVE_WINDOW).or_else(|| {
            last_raw.map(|s| FieldValues {
                voltage: s.voltage,
                current: s.current,
                power: s.power,
            })
        });

        Self {
            live,
            energy: Some(newest.energy),
            current_range: history.min_max_current_last_n(history.len()),
            pd_level: newest.pd_level(),
            sample_count: history.len(),
        }
    }

    pub fn has_data(&self) -> bool {
        self.live.is_some()
    }
}

impl std::fmt::Display for Readout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.live {
            Some(v) => write!(f, "{:.2}V {:.4}A {:.3}W", v.voltage, v.current, v.power)?,
            None => write!(f, "{0}V {0}A {0}W", NO_DATA)?,
        }
        match self.energy {
            Some(e) => write!(f, " {:.3}Wh", e)?,
            None => write!(f, " {}Wh", NO_DATA)?,
        }
        match self.current_range {
            Some((min, max)) => write!(f, " {:.3}-{:.3}A", min, max),
            None => write!(f, " {}A", NO_DATA),
        }
    }
}
