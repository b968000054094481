//! Derived views over the measurement history
//!
//! This module turns raw history contents into what a display shows:
//! - [`Readout`] - live labels, session current range and PD level

pub mod readout;

pub use readout::{Readout, LIVE_WINDOW, NO_DATA};
