//! Fixed-capacity measurement history
//!
//! [`MeasurementHistory`] is a circular buffer of [`Sample`]s with O(1)
//! insertion. Every windowed query walks backward from the newest sample,
//! so index 0 of any result is always the most recent push.
//!
//! # Windows
//!
//! A "last N" window covers the newest `min(N, len)` samples. Queries are
//! linear in the window size; callers keep N small (a graph's pixel width
//! or a handful of samples for the live labels).
//!
//! # Empty history
//!
//! Statistical queries return `None` on an empty history or a zero-sized
//! window. This is the normal state right after start-up or a reset, not
//! an error.

mod stats;

pub use stats::median;

use crate::error::{PowerOsdError, Result};
use crate::types::{FieldValues, Sample};

/// Circular buffer of samples with newest-first windowed queries
#[derive(Debug, Clone)]
pub struct MeasurementHistory {
    values: Vec<Sample>,
    /// Next write slot
    head: usize,
    /// Number of valid samples, saturates at capacity
    valid_count: usize,
}

impl MeasurementHistory {
    /// Create a history holding at most `capacity` samples
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(PowerOsdError::InvalidArgument(
                "history capacity must be > 0".to_string(),
            ));
        }
        Ok(Self {
            values: vec![Sample::default(); capacity],
            head: 0,
            valid_count: 0,
        })
    }

    /// Discard all samples, keeping the allocation
    pub fn reset(&mut self) {
        self.valid_count = 0;
        self.head = 0;
    }

    /// Reallocate for a new capacity. Discards all samples.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<()> {
        if capacity == 0 {
            return Err(PowerOsdError::InvalidArgument(
                "history capacity must be > 0".to_string(),
            ));
        }
        self.values = vec![Sample::default(); capacity];
        self.reset();
        Ok(())
    }

    /// Append a sample, overwriting the oldest one when full
    #[inline]
    pub fn push(&mut self, sample: Sample) {
        self.values[self.head] = sample;
        self.head = self.inc(self.head);
        if self.valid_count < self.values.len() {
            self.valid_count += 1;
        }
    }

    /// Maximum number of samples retained
    pub fn capacity(&self) -> usize {
        self.values.len()
    }

    /// Number of valid samples
    pub fn len(&self) -> usize {
        self.valid_count
    }

    pub fn is_empty(&self) -> bool {
        self.valid_count == 0
    }

    pub fn is_full(&self) -> bool {
        self.valid_count == self.values.len()
    }

    /// Iterate all valid samples, newest first
    pub fn iter_newest_first(&self) -> NewestFirst<'_> {
        self.window(self.valid_count)
    }

    /// Minimum and maximum current over the newest `n` samples
    pub fn min_max_current_last_n(&self, n: usize) -> Option<(f64, f64)> {
        if self.valid_count == 0 || n == 0 {
            return None;
        }
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for sample in self.window(n) {
            if sample.current < min {
                min = sample.current;
            }
            if sample.current > max {
                max = sample.current;
            }
        }
        Some((min, max))
    }

    /// Independent maxima of voltage, current and power over the newest `n` samples
    pub fn max_values_last_n(&self, n: usize) -> Option<FieldValues> {
        if self.valid_count == 0 || n == 0 {
            return None;
        }
        let init = FieldValues {
            voltage: f64::NEG_INFINITY,
            current: f64::NEG_INFINITY,
            power: f64::NEG_INFINITY,
        };
        Some(self.window(n).fold(init, |mut acc, s| {
            if s.voltage > acc.voltage {
                acc.voltage = s.voltage;
            }
            if s.current > acc.current {
                acc.current = s.current;
            }
            if s.power > acc.power {
                acc.power = s.power;
            }
            acc
        }))
    }

    /// Per-field medians over the newest `n` samples
    pub fn median_values_last_n(&self, n: usize) -> Option<FieldValues> {
        if self.valid_count == 0 || n == 0 {
            return None;
        }
        let window_len = n.min(self.valid_count);
        let mut scratch = Vec::with_capacity(window_len);
        let mut median_of = |field: fn(&Sample) -> f64| {
            scratch.clear();
            scratch.extend(self.window(n).map(field));
            median(&mut scratch)
        };
        Some(FieldValues {
            voltage: median_of(|s| s.voltage),
            current: median_of(|s| s.current),
            power: median_of(|s| s.power),
        })
    }

    /// All valid samples, newest first
    pub fn raw_history_newest_first(&self) -> Vec<Sample> {
        self.iter_newest_first().copied().collect()
    }

    /// The newest `min(n, len)` samples, newest first
    pub fn last_n_samples_newest_first(&self, n: usize) -> Vec<Sample> {
        self.window(n).copied().collect()
    }

    /// The sample pushed `age` pushes ago (0 = most recent)
    pub fn at_by_age(&self, age: usize) -> Result<&Sample> {
        if age >= self.valid_count {
            return Err(PowerOsdError::OutOfRange {
                age,
                len: self.valid_count,
            });
        }
        let len = self.values.len();
        let idx = (self.newest_index() + len - age) % len;
        Ok(&self.values[idx])
    }

    /// Most recent sample, if any
    pub fn newest(&self) -> Option<&Sample> {
        self.at_by_age(0).ok()
    }

    fn window(&self, n: usize) -> NewestFirst<'_> {
        NewestFirst {
            values: &self.values,
            idx: self.newest_index(),
            remaining: n.min(self.valid_count),
        }
    }

    #[inline]
    fn inc(&self, idx: usize) -> usize {
        (idx + 1) % self.values.len()
    }

    #[inline]
    fn newest_index(&self) -> usize {
        let len = self.values.len();
        (self.head + len - 1) % len
    }
}

/// Newest-first iterator over a history window
#[derive(Debug, Clone)]
pub struct NewestFirst<'a> {
    values: &'a [Sample],
    idx: usize,
    remaining: usize,
}

impl<'a> Iterator for NewestFirst<'a> {
    type Item = &'a Sample;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let item = &self.values[self.idx];
        let len = self.values.len();
        self.idx = (self.idx + len - 1) % len;
        self.remaining -= 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for NewestFirst<'_> {}
