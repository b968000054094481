//! Measurement ingestion pipeline
//!
//! Every transport feeds the same chain:
//!
//! ```text
//! RawFrame -> decode -> EnergyAccumulator -> SampleNormalizer -> MeasurementHistory
//! ```
//!
//! # Main Types
//!
//! - [`PowerPipeline`] - Owns one accumulator, normalizer and history
//! - [`EnergyAccumulator`] - Running watt-hour integration
//! - [`SampleNormalizer`] - Baseline offset and validity gating
//! - [`PipelineBridge`] - Channel boundary to transport threads
//!
//! The pipeline is not synchronized. Whatever thread owns it (usually via
//! [`PipelineBridge`]) is the only one that mutates or queries it.

pub mod accumulator;
pub mod bridge;
pub mod normalizer;

pub use accumulator::EnergyAccumulator;
pub use bridge::{FrameSender, PipelineBridge, PipelineCommand};
pub use normalizer::{Admission, SampleNormalizer};

use crate::analysis::Readout;
use crate::config::AppConfig;
use crate::error::Result;
use crate::history::MeasurementHistory;
use crate::protocol::{self, ProtocolConstants, RawFrame};
use crate::types::Sample;

/// Frame counters since the pipeline was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Frames handed to [`PowerPipeline::ingest`]
    pub frames: u64,
    /// Frames that failed to decode
    pub dropped: u64,
    /// Decoded samples withheld by the validity gate
    pub suppressed: u64,
}

pub struct PowerPipeline {
    constants: ProtocolConstants,
    accumulator: EnergyAccumulator,
    normalizer: SampleNormalizer,
    history: MeasurementHistory,
    last_raw: Option<Sample>,
    stats: IngestStats,
}

impl PowerPipeline {
    pub fn new(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            constants: config.protocol,
            accumulator: EnergyAccumulator::new(config.energy.max_gap_ms),
            normalizer: SampleNormalizer::new(config.normalizer),
            history: MeasurementHistory::new(config.history.capacity)?,
            last_raw: None,
            stats: IngestStats::default(),
        })
    }

    /// Decode a frame with the current wall clock and run it through the chain
    pub fn ingest(&mut self, frame: RawFrame) -> Option<Sample> {
        self.ingest_at(frame, crate::types::now_millis())
    }

    /// Same as [`ingest`](Self::ingest) with an explicit receive time
    ///
    /// Returns the sample that entered the history, or `None` when the frame
    /// was malformed or the sample was suppressed.
    pub fn ingest_at(&mut self, frame: RawFrame, received_at: u64) -> Option<Sample> {
        self.stats.frames += 1;

        let decoded = match protocol::decode_at(&frame, &self.constants, received_at) {
            Ok(sample) => sample,
            Err(e) => {
                self.stats.dropped += 1;
                tracing::warn!(
                    "Dropping {} frame {:?}: {}",
                    frame.protocol_name(),
                    String::from_utf8_lossy(frame.payload()),
                    e
                );
                return None;
            }
        };

        self.ingest_sample(decoded)
    }

    /// Run an already decoded sample through accumulation and gating
    pub fn ingest_sample(&mut self, decoded: Sample) -> Option<Sample> {
        let sample = self.accumulator.accumulate(decoded);
        self.last_raw = Some(sample);

        match self.normalizer.process(sample) {
            Some(sample) => {
                self.history.push(sample);
                Some(sample)
            }
            None => {
                self.stats.suppressed += 1;
                None
            }
        }
    }

    /// Clear the history, the energy total and the gap latch
    pub fn reset_history(&mut self) {
        self.history.reset();
        self.accumulator.reset();
        self.normalizer.reset_latch();
        self.last_raw = None;
        tracing::info!("Measurement history reset");
    }

    /// Resize the history, discarding its contents
    pub fn set_capacity(&mut self, capacity: usize) -> Result<()> {
        self.history.set_capacity(capacity)?;
        tracing::info!("History capacity set to {}", capacity);
        Ok(())
    }

    /// Add the newest sample's current to the baseline offset.
    ///
    /// Does nothing on an empty history.
    pub fn set_base_current(&mut self) {
        if let Some(newest) = self.history.newest().copied() {
            self.normalizer.set_base_current(&newest);
        }
    }

    pub fn reset_base_current(&mut self) {
        self.normalizer.reset_base_current();
    }

    pub fn readout(&self) -> Readout {
        Readout::from_history(&self.history, self.last_raw.as_ref())
    }

    pub fn history(&self) -> &MeasurementHistory {
        &self.history
    }

    /// Last decoded sample, before gating
    pub fn last_raw(&self) -> Option<&Sample> {
        self.last_raw.as_ref()
    }

    pub fn normalizer(&self) -> &SampleNormalizer {
        &self.normalizer
    }

    pub fn energy(&self) -> f64 {
        self.accumulator.energy()
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }
}
