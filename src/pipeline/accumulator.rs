//! Energy integration over time
//!
//! Integrates power × elapsed time into cumulative watt-hours. The first
//! sample only primes the timestamp. Deltas that are zero, negative, or at
//! least `max_gap_ms` (clock jumps, reconnects after a long pause) move the
//! timestamp forward without adding energy.

use crate::config::DEFAULT_MAX_GAP_MS;
use crate::types::Sample;

const MS_PER_HOUR: f64 = 3_600_000.0;

#[derive(Debug, Clone)]
pub struct EnergyAccumulator {
    last_timestamp: Option<u64>,
    accumulated: f64,
    max_gap_ms: i64,
}

impl Default for EnergyAccumulator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_GAP_MS)
    }
}

impl EnergyAccumulator {
    pub fn new(max_gap_ms: i64) -> Self {
        Self {
            last_timestamp: None,
            accumulated: 0.0,
            max_gap_ms,
        }
    }

    /// Integrate one sample and return it with the running energy total
    pub fn accumulate(&mut self, sample: Sample) -> Sample {
        if let Some(last) = self.last_timestamp {
            let dt = i128::from(sample.timestamp) - i128::from(last);
            if dt > 0 && dt < i128::from(self.max_gap_ms) {
                self.accumulated += sample.power * dt as f64 / MS_PER_HOUR;
            } else if dt != 0 {
                tracing::debug!("Skipping energy integration over {} ms", dt);
            }
        }
        self.last_timestamp = Some(sample.timestamp);
        sample.with_energy(self.accumulated)
    }

    /// Accumulated energy in Wh
    pub fn energy(&self) -> f64 {
        self.accumulated
    }

    /// True once a first sample has been seen
    pub fn is_running(&self) -> bool {
        self.last_timestamp.is_some()
    }

    /// Forget the last timestamp and zero the total
    pub fn reset(&mut self) {
        self.last_timestamp = None;
        self.accumulated = 0.0;
    }
}
