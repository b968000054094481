//! End-to-end tests of frame ingestion through the shared pipeline

mod common;

use common::assert_float_eq;
use common::builders::{ConfigBuilder, SampleBuilder};
use powerosd_rs::config::{AppConfig, GapPolicy};
use powerosd_rs::pipeline::{PipelineBridge, PipelineCommand, PowerPipeline};
use powerosd_rs::protocol::{decode, ProtocolConstants, RawFrame};
use powerosd_rs::{PdLevel, SerialVariant};

fn json_frame(builder: SampleBuilder) -> RawFrame {
    RawFrame::Json(builder.to_json().into_bytes())
}

#[test]
fn test_json_stream_integrates_energy() {
    let mut pipeline = PowerPipeline::new(&AppConfig::default()).unwrap();

    for t in [0u64, 1000, 2000] {
        // device charge is replaced by the integrated value
        let builder = SampleBuilder::new()
            .voltage(10.0)
            .current(1.0)
            .energy(9.9)
            .at(t + 1);
        pipeline.ingest(json_frame(builder)).unwrap();
    }

    let newest = pipeline.history().newest().copied().unwrap();
    assert_float_eq(newest.energy, 10.0 * 2.0 / 3600.0, 1e-9);
    assert_float_eq(pipeline.readout().energy.unwrap(), newest.energy, 1e-12);
}

#[test]
fn test_serial_and_json_share_one_history() {
    let mut pipeline = PowerPipeline::new(&AppConfig::default()).unwrap();

    pipeline.ingest_at(json_frame(SampleBuilder::new().voltage(5.0).current(0.5)), 1_000);
    pipeline.ingest_at(
        RawFrame::Serial {
            line: b"03E89C40\r\n".to_vec(),
            variant: SerialVariant::Range20V,
        },
        2_000,
    );

    let history = pipeline.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history.at_by_age(0).unwrap().voltage, 20.0);
    assert_eq!(history.at_by_age(1).unwrap().voltage, 5.0);
    // energy integrates the newer sample, 1.2 W for one second
    assert_float_eq(history.at_by_age(0).unwrap().energy, 1.2 / 3600.0, 1e-9);
    assert_eq!(pipeline.readout().pd_level, PdLevel::V20);
}

#[test]
fn test_history_wraps_at_capacity() {
    let config = ConfigBuilder::new().capacity(4).build();
    let mut pipeline = PowerPipeline::new(&config).unwrap();

    for t in 1..=10u64 {
        let current = t as f64 / 10.0;
        pipeline.ingest(json_frame(SampleBuilder::new().voltage(5.0).current(current).at(t)));
    }

    let history = pipeline.history();
    assert_eq!(history.len(), 4);
    let timestamps: Vec<u64> = history.iter_newest_first().map(|s| s.timestamp).collect();
    assert_eq!(timestamps, vec![10, 9, 8, 7]);
    assert_eq!(history.min_max_current_last_n(100), Some((0.7, 1.0)));
}

#[test]
fn test_unplugged_cable_leaves_one_gap_marker() {
    let config = ConfigBuilder::new().min_current(0.01).build();
    let mut pipeline = PowerPipeline::new(&config).unwrap();

    pipeline.ingest(json_frame(SampleBuilder::new().at(1)));
    for t in 2..6 {
        pipeline.ingest(json_frame(SampleBuilder::new().voltage(0.0).current(0.0).at(t)));
    }
    pipeline.ingest(json_frame(SampleBuilder::new().at(6)));

    let voltages: Vec<f64> = pipeline
        .history()
        .iter_newest_first()
        .map(|s| s.voltage)
        .collect();
    assert_eq!(voltages, vec![5.0, 0.0, 5.0]);
    assert_eq!(pipeline.stats().suppressed, 3);
}

#[test]
fn test_suppress_all_keeps_history_clean() {
    let config = ConfigBuilder::new().gap_policy(GapPolicy::SuppressAll).build();
    let mut pipeline = PowerPipeline::new(&config).unwrap();

    pipeline.ingest(json_frame(SampleBuilder::new().at(1)));
    pipeline.ingest(json_frame(SampleBuilder::new().voltage(1.0).at(2)));
    assert_eq!(pipeline.history().len(), 1);
}

#[test]
fn test_malformed_frames_do_not_stop_the_stream() {
    let mut pipeline = PowerPipeline::new(&AppConfig::default()).unwrap();

    pipeline.ingest(RawFrame::Json(b"{\"voltage\":".to_vec()));
    pipeline.ingest(RawFrame::Json(b"[1,2,3]".to_vec()));
    pipeline.ingest(RawFrame::Serial {
        line: b"03E8".to_vec(),
        variant: SerialVariant::Range28V,
    });
    pipeline.ingest(json_frame(SampleBuilder::new().at(1)));

    let stats = pipeline.stats();
    assert_eq!(stats.frames, 4);
    assert_eq!(stats.dropped, 3);
    assert_eq!(pipeline.history().len(), 1);
}

#[test]
fn test_bridge_across_threads() {
    let pipeline = PowerPipeline::new(&AppConfig::default()).unwrap();
    let (mut bridge, sender) = PipelineBridge::new(pipeline);

    let producers: Vec<_> = (0..2u64)
        .map(|id| {
            let sender = sender.clone();
            std::thread::spawn(move || {
                for i in 0..50u64 {
                    let frame = json_frame(SampleBuilder::new().at(1 + id * 1000 + i));
                    sender.send_frame(frame).unwrap();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }
    sender.send(PipelineCommand::SetBaseCurrent).unwrap();
    sender.shutdown().unwrap();

    let mut pushed = 0;
    bridge.run_until_shutdown(|_, _| pushed += 1);

    assert_eq!(pushed, 100);
    assert_eq!(bridge.pipeline().history().len(), 100);
    assert_eq!(bridge.pipeline().normalizer().base_current_offset_ma(), 500);
}

#[test]
fn test_readout_after_reset() {
    let mut pipeline = PowerPipeline::new(&AppConfig::default()).unwrap();
    pipeline.ingest(json_frame(SampleBuilder::new().voltage(9.375).current(0.2).at(1)));
    assert!(pipeline.readout().has_data());

    pipeline.reset_history();
    let readout = pipeline.readout();
    assert!(!readout.has_data());
    assert_eq!(readout.to_string(), "---V ---A ---W ---Wh ---A");
}

#[test]
fn test_frame_without_timestamp_is_stamped_now() {
    let frame = RawFrame::Json(br#"{"current":1.5,"voltage":9.0}"#.to_vec());

    let decoded = decode(&frame, &ProtocolConstants::default()).unwrap();
    assert!(decoded.timestamp > 0);
    assert_eq!(decoded.energy, 0.0);
    assert_eq!(decoded.power, 13.5);

    let mut pipeline = PowerPipeline::new(&AppConfig::default()).unwrap();
    let pushed = pipeline.ingest(frame).unwrap();
    assert!(pushed.timestamp >= decoded.timestamp);
    assert_eq!(pushed.energy, 0.0);
}
