//! powerosd - headless USB power meter monitor
//!
//! Reads a meter over a serial port, or replays a recorded capture, and
//! prints the live readout the display would show.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use powerosd_rs::{
    config::AppConfig,
    pipeline::{FrameSender, PipelineBridge, PowerPipeline},
    protocol::{FrameKind, SerialVariant},
    transport::{
        detect_capture_kind, open_serial, pump_frames, usb_identity_matches, ReplayReader,
    },
    Sample,
};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Read timeout for the live serial pump
const SERIAL_READ_TIMEOUT: Duration = Duration::from_millis(1000);

#[derive(Parser)]
#[command(name = "powerosd")]
#[command(about = "USB Power Delivery meter monitor", long_about = None)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print accepted samples as JSON lines instead of readouts
    #[arg(long, global = true)]
    jsonl: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a meter attached to a serial port
    Serial {
        /// Port name, e.g. /dev/ttyACM0 or COM3
        port: String,
    },

    /// Replay a capture file with one raw frame per line
    Replay {
        /// Capture file
        file: PathBuf,

        /// Protocol of the recorded frames
        #[arg(short, long, value_enum, default_value_t = ReplayProtocol::Auto)]
        protocol: ReplayProtocol,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReplayProtocol {
    /// JSON notifications
    Json,
    /// Serial lines, 28 V range
    SerialA,
    /// Serial lines, 20 V range
    SerialB,
    /// JSON if the first line is an object, otherwise detect the serial variant
    Auto,
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,powerosd_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load_or_default(cli.config.as_deref());

    let pipeline = PowerPipeline::new(&config).context("Failed to create pipeline")?;
    let (mut bridge, sender) = PipelineBridge::new(pipeline);

    let reader_handle = match cli.command {
        Commands::Serial { port } => {
            if usb_identity_matches(&port, &config.device) == Some(false) {
                tracing::warn!("{} does not report the meter's USB vendor/product id", port);
            }
            let (mut link, variant) = open_serial(&port, &config.serial)
                .with_context(|| format!("Failed to bring up {}", port))?;
            std::thread::spawn(move || {
                let result = pump_frames(
                    &mut link,
                    FrameKind::Serial(variant),
                    &sender,
                    SERIAL_READ_TIMEOUT,
                );
                finish_pump(result, &sender);
            })
        }
        Commands::Replay { file, protocol } => {
            let (mut reader, kind) = open_replay(&file, protocol, &config)?;
            tracing::info!("Replaying {:?} as {:?}", file, kind);
            std::thread::spawn(move || {
                let result = pump_frames(&mut reader, kind, &sender, Duration::ZERO);
                finish_pump(result, &sender);
            })
        }
    };

    let jsonl = cli.jsonl;
    bridge.run_until_shutdown(|pipeline, sample| {
        if jsonl {
            print_jsonl(sample);
        } else {
            let readout = pipeline.readout();
            println!("{}  [{}]", readout, readout.pd_level);
        }
    });

    if reader_handle.join().is_err() {
        tracing::error!("Reader thread panicked");
    }

    let stats = bridge.pipeline().stats();
    tracing::info!(
        "Processed {} frames ({} dropped, {} suppressed), energy {:.4} Wh",
        stats.frames,
        stats.dropped,
        stats.suppressed,
        bridge.pipeline().energy()
    );
    if !jsonl {
        println!("{}", bridge.pipeline().readout());
    }

    Ok(())
}

fn finish_pump(result: powerosd_rs::Result<u64>, sender: &FrameSender) {
    match result {
        Ok(count) => tracing::info!("Reader finished after {} frames", count),
        Err(e) => tracing::error!("Reader stopped: {}", e),
    }
    let _ = sender.shutdown();
}

fn print_jsonl(sample: &Sample) {
    match serde_json::to_string(sample) {
        Ok(line) => println!("{}", line),
        Err(e) => tracing::warn!("Failed to serialize sample: {}", e),
    }
}

fn open_replay(
    path: &Path,
    protocol: ReplayProtocol,
    config: &AppConfig,
) -> anyhow::Result<(ReplayReader<BufReader<File>>, FrameKind)> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let mut buffered = BufReader::new(file);

    let kind = match protocol {
        ReplayProtocol::Json => FrameKind::Json,
        ReplayProtocol::SerialA => FrameKind::Serial(SerialVariant::Range28V),
        ReplayProtocol::SerialB => FrameKind::Serial(SerialVariant::Range20V),
        ReplayProtocol::Auto => detect_capture_kind(&mut buffered, &config.serial.detection)
            .context("Could not detect the protocol of the capture")?,
    };

    Ok((ReplayReader::new(buffered), kind))
}
