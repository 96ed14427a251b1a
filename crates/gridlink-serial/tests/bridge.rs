//! End-to-end bridge behavior over the in-memory transport.

use std::sync::Arc;
use std::time::{Duration, Instant};

use gridlink_serial::{
    BridgeConfig, BridgeError, EventDispatcher, InputDrain, LineWriter, MockTransport,
    SerialBridge, StopSignal,
};
use gridlink_telemetry::{
    Graphics, LapTime, Physics, SimulatedSource, StaticInfo, StreamIntervals, stream_channels,
};

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::test]
async fn physics_snapshot_reaches_the_wire_verbatim() -> TestResult {
    let (senders, streams) = stream_channels();
    let mock = MockTransport::new();
    let dispatcher = EventDispatcher::spawn(streams, LineWriter::new(mock.clone()));

    senders
        .physics
        .send(Physics {
            fuel: 45.5,
            rpms: 6500,
            tyre_wear: [0.90, 0.91, 0.89, 0.92],
        })
        .await?;
    senders.static_info.send(StaticInfo { max_rpm: 9000 }).await?;
    senders
        .graphics
        .send(Graphics {
            best_time: LapTime::from_millis(83_456),
        })
        .await?;
    drop(senders);
    dispatcher.join().await;

    let written = mock.written_string();
    let lines: Vec<&str> = written.lines().collect();

    // Cross-stream order is unspecified; per-stream content and order
    // are exact.
    assert!(lines.contains(&"Max RPM: 9000"));
    assert!(lines.contains(&"Best time: 1:23.456"));
    let physics_lines: Vec<&str> = lines
        .iter()
        .copied()
        .filter(|l| l.starts_with("Fuel") || l.starts_with("RPM") || l.starts_with("Tyre"))
        .collect();
    assert_eq!(
        physics_lines,
        ["Fuel: 45.5", "RPM:  6500", "Tyre wear: 0.9, 0.91, 0.89, 0.92"]
    );
    Ok(())
}

#[test]
fn concurrent_write_lines_never_interleave() -> TestResult {
    let mock = MockTransport::new();
    let writer = LineWriter::new(mock.clone());

    let mut handles = Vec::new();
    for worker in 0..6 {
        let writer = writer.clone();
        handles.push(std::thread::spawn(move || {
            for i in 0..100 {
                let _ = writer.write_line(&format!("s{worker}-{i:03}"));
            }
        }));
    }
    for handle in handles {
        handle.join().map_err(|_| "writer thread panicked")?;
    }

    let written = mock.written_string();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines.len(), 600);
    for line in lines {
        // Every line is exactly one whole formatted message.
        assert_eq!(line.len(), 6, "interleaved or split line: {line:?}");
        assert!(line.starts_with('s'));
    }
    Ok(())
}

#[test]
fn drain_terminates_within_one_tick_of_stop() -> TestResult {
    let mock = MockTransport::new();
    mock.push_inbound(&[0u8; 4096]);
    let stop = StopSignal::new();
    let tick = Duration::from_secs(1);
    let drain = InputDrain::spawn(mock.clone(), stop.clone(), tick)?;

    std::thread::sleep(Duration::from_millis(1100));
    assert!(mock.inbound_is_empty(), "first tick should have drained");

    stop.set();
    let stop_at = Instant::now();
    drain.join();
    assert!(
        stop_at.elapsed() <= tick + Duration::from_millis(200),
        "drain overstayed the tick after stop"
    );
    Ok(())
}

#[tokio::test]
async fn double_shutdown_is_one_physical_close() -> TestResult {
    let mock = MockTransport::new();
    let mut bridge = SerialBridge::start(
        Arc::new(SimulatedSource::new()),
        mock.clone(),
        mock.clone(),
        BridgeConfig {
            intervals: StreamIntervals {
                static_info: Duration::from_millis(10),
                physics: Duration::from_millis(10),
                graphics: Duration::from_millis(10),
            },
            drain_tick: Duration::from_millis(20),
        },
    )
    .await?;

    tokio::time::sleep(Duration::from_millis(50)).await;
    bridge.shutdown().await;
    bridge.shutdown().await;
    bridge.join_dispatch().await;

    assert_eq!(mock.flush_count(), 1);
    assert!(matches!(
        bridge.writer().write_line("after close"),
        Err(BridgeError::TransportUnavailable)
    ));

    // Nothing was half-written: the transcript is whole lines only.
    let written = mock.written_string();
    assert!(written.is_empty() || written.ends_with('\n'));
    Ok(())
}
