//! Settings for the live ingestion stages
//!
//! # Main Types
//!
//! - [`NormalizerSettings`] - Baseline offset and validity thresholds
//! - [`GapPolicy`] - What happens to samples below the validity thresholds
//! - [`EnergySettings`] - Energy integration bounds
//! - [`HistorySettings`] - Rolling history size

use serde::{Deserialize, Serialize};

/// Default rolling history capacity
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Default minimum bus voltage for a sample to count as valid
pub const DEFAULT_MIN_VOLTAGE: f64 = 2.0;

/// Default upper bound on the time between two integrated samples (1 hour)
pub const DEFAULT_MAX_GAP_MS: i64 = 3_600_000;

/// Handling of invalid (below-threshold) samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapPolicy {
    /// Push the first invalid sample after a valid one as a visible gap,
    /// suppress the rest until a valid sample arrives
    #[default]
    MarkOnce,
    /// Never push invalid samples
    SuppressAll,
}

/// Baseline current offset and validity gating
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerSettings {
    /// Samples below this current (A) are invalid
    pub min_current: f64,
    /// Samples below this voltage (V) are invalid
    pub min_voltage: f64,
    /// Baseline current subtracted from every sample, in milliamps
    pub base_current_offset_ma: i32,
    /// Handling of invalid samples
    pub gap_policy: GapPolicy,
}

impl Default for NormalizerSettings {
    fn default() -> Self {
        Self {
            min_current: 0.0,
            min_voltage: DEFAULT_MIN_VOLTAGE,
            base_current_offset_ma: 0,
            gap_policy: GapPolicy::MarkOnce,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergySettings {
    /// Deltas at or above this many milliseconds are not integrated
    pub max_gap_ms: i64,
}

impl Default for EnergySettings {
    fn default() -> Self {
        Self {
            max_gap_ms: DEFAULT_MAX_GAP_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Number of samples kept
    pub capacity: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}
