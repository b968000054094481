//! Helpers for capture files used by replay tests

use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;

/// Write `lines` (each terminated with `\n`) to a capture file in `dir`
pub fn write_capture(dir: &TempDir, name: &str, lines: &[&[u8]]) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).expect("create capture");
    for line in lines {
        file.write_all(line).expect("write capture line");
        file.write_all(b"\n").expect("write capture newline");
    }
    path
}

/// A serial line for the 28 V range with the raw marker byte
pub fn serial_28v_line(shunt: u16, bus: u16) -> Vec<u8> {
    let mut line = format!("{:04X}{:04X}", shunt, bus).into_bytes();
    line.push(28);
    line
}
