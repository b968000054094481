//! # powerosd-rs: USB Power Delivery telemetry pipeline
//!
//! Ingests voltage, current, power and energy readings streamed by external
//! USB power meters and keeps a rolling history for on-screen display.
//!
//! ## Architecture
//!
//! - **Protocol**: Pure decoders for the JSON-over-BLE and hex-over-serial
//!   wire formats, plus serial variant detection
//! - **Pipeline**: Energy integration, baseline offset and validity gating,
//!   feeding one shared history
//! - **History**: Fixed-capacity circular buffer with newest-first windowed
//!   statistics
//! - **Transport**: Line readers for serial ports and capture files
//! - **Communication**: Crossbeam channel between transport threads and the
//!   pipeline owner
//!
//! ## Configuration
//!
//! Settings are read from `config.toml` in the platform config directory
//! under `dev.powerosd`; every field has a default.
//!
//! ## Example
//!
//! ```ignore
//! use powerosd_rs::{
//!     config::AppConfig,
//!     pipeline::{PipelineBridge, PowerPipeline},
//!     protocol::RawFrame,
//! };
//!
//! let config = AppConfig::load_or_default(None);
//! let (mut bridge, sender) = PipelineBridge::new(PowerPipeline::new(&config)?);
//!
//! // on a transport thread
//! sender.send_frame(RawFrame::Json(br#"{"voltage":20.0,"current":1.5}"#.to_vec()))?;
//!
//! // on the display thread
//! bridge.drain();
//! println!("{}", bridge.pipeline().readout());
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod history;
pub mod pipeline;
pub mod protocol;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use analysis::Readout;
pub use config::AppConfig;
pub use error::{PowerOsdError, Result};
pub use history::MeasurementHistory;
pub use pipeline::{FrameSender, PipelineBridge, PowerPipeline};
pub use protocol::{RawFrame, SerialVariant};
pub use types::{FieldValues, PdLevel, Sample};
