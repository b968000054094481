//! Baseline current offset and validity gating
//!
//! A meter in line with an idle cable still draws a few milliamps of its own.
//! The user can capture that as a baseline, which is then subtracted from
//! every later sample. Samples below the validity thresholds (no load, or
//! bus voltage collapsed) are gated according to [`GapPolicy`].

use crate::config::{GapPolicy, NormalizerSettings};
use crate::types::Sample;

/// Outcome of gating one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Valid sample, push it
    Accept,
    /// First invalid sample after a valid one, push it as a gap marker
    GapMarker,
    /// Drop it
    Suppress,
}

impl Admission {
    pub fn should_push(&self) -> bool {
        !matches!(self, Admission::Suppress)
    }
}

#[derive(Debug, Clone)]
pub struct SampleNormalizer {
    settings: NormalizerSettings,
    last_was_invalid: bool,
}

impl SampleNormalizer {
    pub fn new(settings: NormalizerSettings) -> Self {
        Self {
            settings,
            last_was_invalid: false,
        }
    }

    pub fn settings(&self) -> &NormalizerSettings {
        &self.settings
    }

    /// Current baseline offset in milliamps
    pub fn base_current_offset_ma(&self) -> i32 {
        self.settings.base_current_offset_ma
    }

    /// Subtract the baseline offset from the current, clamping at zero.
    ///
    /// Power is left as decoded.
    pub fn normalize(&self, mut sample: Sample) -> Sample {
        let offset = self.settings.base_current_offset_ma;
        if offset != 0 {
            sample.current = (sample.current - f64::from(offset) / 1000.0).max(0.0);
        }
        sample
    }

    /// Gate a normalized sample and update the gap latch
    pub fn admit(&mut self, sample: &Sample) -> Admission {
        let valid = sample.current >= self.settings.min_current
            && sample.voltage >= self.settings.min_voltage;

        if valid {
            self.last_was_invalid = false;
            return Admission::Accept;
        }

        match self.settings.gap_policy {
            GapPolicy::SuppressAll => Admission::Suppress,
            GapPolicy::MarkOnce if self.last_was_invalid => Admission::Suppress,
            GapPolicy::MarkOnce => {
                self.last_was_invalid = true;
                Admission::GapMarker
            }
        }
    }

    /// Normalize then gate; `None` when the sample is suppressed
    pub fn process(&mut self, sample: Sample) -> Option<Sample> {
        let sample = self.normalize(sample);
        self.admit(&sample).should_push().then_some(sample)
    }

    /// Add the newest sample's current to the baseline offset
    pub fn set_base_current(&mut self, newest: &Sample) {
        let added = (newest.current * 1000.0) as i32;
        self.settings.base_current_offset_ma =
            self.settings.base_current_offset_ma.saturating_add(added);
        tracing::info!(
            "Baseline current offset set to {} mA",
            self.settings.base_current_offset_ma
        );
    }

    pub fn reset_base_current(&mut self) {
        self.settings.base_current_offset_ma = 0;
    }

    /// Forget whether the last sample was invalid
    pub fn reset_latch(&mut self) {
        self.last_was_invalid = false;
    }
}

impl Default for SampleNormalizer {
    fn default() -> Self {
        Self::new(NormalizerSettings::default())
    }
}
