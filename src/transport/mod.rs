//! Line-oriented transport seam
//!
//! The pipeline core never talks to a port directly. Serial bring-up and the
//! frame pump read through [`LineReader`], which is implemented by:
//!
//! - [`SerialLink`] - a real serial port via the `serialport` crate
//! - [`ReplayReader`] - any buffered reader, used for capture files and tests
//!
//! Connection management beyond opening a port and detecting its protocol
//! variant (reconnect timers, BLE discovery) lives with the UI shell.

pub mod replay;
pub mod serial;

pub use replay::{detect_capture_kind, ReplayReader};
pub use serial::{open_serial, usb_identity_matches, SerialLink};

use crate::error::Result;
use crate::pipeline::FrameSender;
use crate::protocol::FrameKind;
use std::time::Duration;

/// Source of newline-terminated lines
#[cfg_attr(test, mockall::automock)]
pub trait LineReader {
    /// Read the next complete line, including its terminator if present.
    ///
    /// Returns `Ok(None)` when no line arrived within `timeout`.
    fn read_line(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>>;

    /// True once the underlying stream can never yield another line
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// Forward every line from `reader` to the pipeline until the reader is
/// exhausted or the pipeline side goes away.
///
/// Blank lines are skipped. Returns the number of frames sent.
pub fn pump_frames<R>(
    reader: &mut R,
    kind: FrameKind,
    sender: &FrameSender,
    timeout: Duration,
) -> Result<u64>
where
    R: LineReader + ?Sized,
{
    let mut sent = 0;
    loop {
        match reader.read_line(timeout)? {
            Some(line) if line.trim_ascii().is_empty() => continue,
            Some(line) => {
                sender.send_frame(kind.frame(line))?;
                sent += 1;
            }
            None if reader.is_exhausted() => break,
            None => tracing::trace!("No line within {:?}", timeout),
        }
    }
    tracing::debug!("Frame pump finished after {} frames", sent);
    Ok(sent)
}
