//! Serial variant detection and replay of recorded captures

mod common;

use common::captures::{serial_28v_line, write_capture};
use common::test_timeout;
use powerosd_rs::config::AppConfig;
use powerosd_rs::pipeline::{PipelineBridge, PowerPipeline};
use powerosd_rs::protocol::{detect_variant, DetectionSettings, FrameKind};
use powerosd_rs::transport::{detect_capture_kind, pump_frames, LineReader, ReplayReader};
use powerosd_rs::{PowerOsdError, SerialVariant};
use std::fs::File;
use std::io::{BufReader, Cursor};
use tempfile::TempDir;

fn replay(bytes: &[u8]) -> ReplayReader<Cursor<Vec<u8>>> {
    ReplayReader::new(Cursor::new(bytes.to_vec()))
}

#[test]
fn test_hex_marker_selects_28v_range() {
    let mut reader = replay(b"03E80BB81C\r\n");
    let variant = detect_variant(&mut reader, &DetectionSettings::default()).unwrap();
    assert_eq!(variant, SerialVariant::Range28V);
}

#[test]
fn test_eight_char_line_selects_20v_range() {
    let mut reader = replay(b"03E80BB8\n");
    let variant = detect_variant(&mut reader, &DetectionSettings::default()).unwrap();
    assert_eq!(variant, SerialVariant::Range20V);
}

#[test]
fn test_detection_retries_a_truncated_first_line() {
    let mut reader = replay(b"0BB8\x1C\n03E80BB8\x1C\n");
    let variant = detect_variant(&mut reader, &DetectionSettings::default()).unwrap();
    assert_eq!(variant, SerialVariant::Range28V);
}

#[test]
fn test_empty_capture_times_out() {
    let mut reader = replay(b"");
    let err = detect_variant(&mut reader, &DetectionSettings::default()).unwrap_err();
    assert!(matches!(err, PowerOsdError::Timeout(_)));
    assert!(reader.is_exhausted());
}

#[test]
fn test_unknown_marker_fails_detection() {
    let mut reader = replay(b"03E80BB8\x05\n03E80BB8\x06\n");
    let err = detect_variant(&mut reader, &DetectionSettings::default()).unwrap_err();
    assert!(matches!(err, PowerOsdError::Detection(_)));
}

#[test]
fn test_replay_capture_file_end_to_end() {
    let dir = TempDir::new().unwrap();
    let lines = [
        serial_28v_line(0x03E8, 0x0BB8),
        serial_28v_line(0x03E8, 0x0BB8),
        serial_28v_line(0x07D0, 0x0BB8),
    ];
    let refs: Vec<&[u8]> = lines.iter().map(|l| l.as_slice()).collect();
    let path = write_capture(&dir, "capture.txt", &refs);

    let mut reader = ReplayReader::new(BufReader::new(File::open(&path).unwrap()));
    let variant = detect_variant(&mut reader, &DetectionSettings::default()).unwrap();
    assert_eq!(variant, SerialVariant::Range28V);

    let pipeline = PowerPipeline::new(&AppConfig::default()).unwrap();
    let (mut bridge, sender) = PipelineBridge::new(pipeline);

    // the first line was consumed by detection
    let kind = FrameKind::Serial(variant);
    let sent = pump_frames(&mut reader, kind, &sender, test_timeout()).unwrap();
    assert_eq!(sent, 2);

    let pushed = bridge.drain();
    assert_eq!(pushed.len(), 2);
    assert_eq!(pushed[0].current, 0.2);
    assert_eq!(pushed[1].current, 0.4);
    assert_eq!(pushed[1].voltage, 9.375);

    let readout = bridge.pipeline().readout();
    assert_eq!(readout.current_range, Some((0.2, 0.4)));
}

#[test]
fn test_auto_detected_capture_replays_every_line() {
    let dir = TempDir::new().unwrap();
    let lines = [
        serial_28v_line(0x03E8, 0x0BB8),
        serial_28v_line(0x05DC, 0x0BB8),
        serial_28v_line(0x07D0, 0x0BB8),
    ];
    let refs: Vec<&[u8]> = lines.iter().map(|l| l.as_slice()).collect();
    let path = write_capture(&dir, "capture.txt", &refs);

    let mut buffered = BufReader::new(File::open(&path).unwrap());
    let kind = detect_capture_kind(&mut buffered, &DetectionSettings::default()).unwrap();
    assert_eq!(kind, FrameKind::Serial(SerialVariant::Range28V));

    let pipeline = PowerPipeline::new(&AppConfig::default()).unwrap();
    let (mut bridge, sender) = PipelineBridge::new(pipeline);
    let mut reader = ReplayReader::new(buffered);
    let sent = pump_frames(&mut reader, kind, &sender, test_timeout()).unwrap();
    assert_eq!(sent, 3);

    let pushed = bridge.drain();
    assert_eq!(pushed.len(), 3);
    assert_eq!(pushed[0].current, 0.2);
    assert_eq!(pushed[2].current, 0.4);
}

#[test]
fn test_json_capture_replay() {
    let dir = TempDir::new().unwrap();
    let lines: [&[u8]; 3] = [
        br#"{"voltage":20.0,"current":1.5,"power":30.0,"charge":0.0,"timestamp":1000}"#,
        b"",
        br#"{"voltage":20.0,"current":1.5,"power":30.0,"charge":0.0,"timestamp":2000}"#,
    ];
    let path = write_capture(&dir, "ble.jsonl", &lines);

    let mut reader = ReplayReader::new(BufReader::new(File::open(&path).unwrap()));
    let pipeline = PowerPipeline::new(&AppConfig::default()).unwrap();
    let (mut bridge, sender) = PipelineBridge::new(pipeline);

    let sent = pump_frames(&mut reader, FrameKind::Json, &sender, test_timeout()).unwrap();
    assert_eq!(sent, 2);
    bridge.drain();

    let newest = bridge.pipeline().history().newest().copied().unwrap();
    common::assert_float_eq(newest.energy, 30.0 / 3600.0, 1e-9);
}
