//! Error handling for powerosd-rs
//!
//! This module defines the crate error type and a Result alias used
//! throughout the ingestion pipeline.

use thiserror::Error;

/// Main error type for powerosd-rs operations
#[derive(Error, Debug)]
pub enum PowerOsdError {
    /// A caller passed a value the operation cannot accept (e.g. zero capacity)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Indexed access past the number of stored samples
    #[error("Sample age {age} out of range (history holds {len})")]
    OutOfRange { age: usize, len: usize },

    /// A raw frame could not be decoded into a sample
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// Serial protocol variant could not be determined
    #[error("Protocol detection failed: {0}")]
    Detection(String),

    /// Timeout errors
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Errors reported by the serial port layer
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Errors related to configuration loading
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PowerOsdError>,
    },
}

impl PowerOsdError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PowerOsdError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Shorthand for a malformed-frame error
    pub fn malformed(message: impl Into<String>) -> Self {
        PowerOsdError::MalformedFrame(message.into())
    }

    /// True for errors that mean "drop this frame and keep going"
    pub fn is_frame_error(&self) -> bool {
        match self {
            PowerOsdError::MalformedFrame(_) => true,
            PowerOsdError::WithContext { source, .. } => source.is_frame_error(),
            _ => false,
        }
    }
}

/// Result type alias for powerosd-rs operations
pub type Result<T> = std::result::Result<T, PowerOsdError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
