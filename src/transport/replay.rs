//! Replay of recorded frames
//!
//! A capture file holds one raw frame per line, exactly as it came off the
//! wire: JSON objects for BLE captures, hex lines for serial captures.

use super::LineReader;
use crate::error::Result;
use crate::protocol::{detect_variant, DetectionSettings, FrameKind};
use std::io::{BufRead, Seek, SeekFrom};
use std::time::Duration;

/// Reads lines from any buffered source, ignoring timeouts
#[derive(Debug)]
pub struct ReplayReader<R> {
    inner: R,
    exhausted: bool,
    lines_read: u64,
}

impl<R: BufRead> ReplayReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            exhausted: false,
            lines_read: 0,
        }
    }

    /// Number of lines returned so far
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }
}

impl<R: BufRead> LineReader for ReplayReader<R> {
    fn read_line(&mut self, _timeout: Duration) -> Result<Option<Vec<u8>>> {
        if self.exhausted {
            return Ok(None);
        }
        let mut line = Vec::new();
        if self.inner.read_until(b'\n', &mut line)? == 0 {
            self.exhausted = true;
            return Ok(None);
        }
        self.lines_read += 1;
        Ok(Some(line))
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

/// Work out what a capture holds from its leading lines, then rewind it
///
/// A capture whose first non-blank byte opens a JSON object is a BLE
/// capture. Anything else goes through serial variant detection. The
/// source is rewound afterwards so no reading is lost to detection.
pub fn detect_capture_kind<R>(source: &mut R, settings: &DetectionSettings) -> Result<FrameKind>
where
    R: BufRead + Seek,
{
    let starts_with_object = source
        .fill_buf()?
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        == Some(&b'{');

    let kind = if starts_with_object {
        FrameKind::Json
    } else {
        let mut lines = ReplayReader::new(&mut *source);
        FrameKind::Serial(detect_variant(&mut lines, settings)?)
    };

    source.seek(SeekFrom::Start(0))?;
    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SerialVariant;
    use std::io::Cursor;

    #[test]
    fn test_reads_lines_then_exhausts() {
        let mut reader = ReplayReader::new(Cursor::new(b"a\nb\nc".to_vec()));
        let timeout = Duration::ZERO;
        assert_eq!(reader.read_line(timeout).unwrap(), Some(b"a\n".to_vec()));
        assert_eq!(reader.read_line(timeout).unwrap(), Some(b"b\n".to_vec()));
        assert_eq!(reader.read_line(timeout).unwrap(), Some(b"c".to_vec()));
        assert!(!reader.is_exhausted());
        assert_eq!(reader.read_line(timeout).unwrap(), None);
        assert!(reader.is_exhausted());
        assert_eq!(reader.lines_read(), 3);
    }

    #[test]
    fn test_detected_capture_keeps_every_line() {
        let mut source = Cursor::new(b"03E80BB8\x1C\n07D00BB8\x1C\n".to_vec());
        let kind = detect_capture_kind(&mut source, &DetectionSettings::default()).unwrap();
        assert_eq!(kind, FrameKind::Serial(SerialVariant::Range28V));

        let mut reader = ReplayReader::new(source);
        assert_eq!(
            reader.read_line(Duration::ZERO).unwrap(),
            Some(b"03E80BB8\x1C\n".to_vec())
        );
        assert!(reader.read_line(Duration::ZERO).unwrap().is_some());
        assert_eq!(reader.read_line(Duration::ZERO).unwrap(), None);
    }

    #[test]
    fn test_json_capture_detected_without_reading() {
        let mut source = Cursor::new(b"\n  {\"voltage\":5.0}\n".to_vec());
        let kind = detect_capture_kind(&mut source, &DetectionSettings::default()).unwrap();
        assert_eq!(kind, FrameKind::Json);
        assert_eq!(source.position(), 0);
    }

    #[test]
    fn test_unrecognized_capture_fails() {
        let mut source = Cursor::new(b"hello\nworld\n".to_vec());
        assert!(detect_capture_kind(&mut source, &DetectionSettings::default()).is_err());
    }

    #[test]
    fn test_keeps_raw_marker_bytes() {
        let mut reader = ReplayReader::new(Cursor::new(b"03E80BB8\x1C\n".to_vec()));
        let line = reader.read_line(Duration::ZERO).unwrap().unwrap();
        assert_eq!(line[8], 28);
    }
}
