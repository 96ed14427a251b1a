//! Per-stream dispatch of telemetry snapshots into the line writer.
//!
//! One tokio task per stream: deliveries within a stream stay ordered
//! and non-overlapping, while different streams run concurrently and
//! race freely for the writer's mutex. Handlers format and hand off
//! synchronously; they never wait on another stream's data.

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use gridlink_telemetry::TelemetryStreams;

use crate::error::BridgeError;
use crate::format;
use crate::transport::Transport;
use crate::writer::LineWriter;

pub struct EventDispatcher {
    tasks: Vec<JoinHandle<()>>,
}

impl EventDispatcher {
    /// Spawn one forwarding task per stream. Tasks end naturally when
    /// their stream's sender side is dropped (source stopped or
    /// subscription revoked).
    pub fn spawn<T: Transport + 'static>(
        streams: TelemetryStreams,
        writer: LineWriter<T>,
    ) -> Self {
        let TelemetryStreams {
            mut static_info,
            mut physics,
            mut graphics,
            mut status,
        } = streams;

        let static_writer = writer.clone();
        let static_task = tokio::spawn(async move {
            while let Some(snapshot) = static_info.recv().await {
                deliver(&static_writer, &[format::static_info_line(&snapshot)]);
            }
            debug!("static info stream ended");
        });

        let physics_writer = writer.clone();
        let physics_task = tokio::spawn(async move {
            while let Some(snapshot) = physics.recv().await {
                deliver(&physics_writer, &format::physics_lines(&snapshot));
            }
            debug!("physics stream ended");
        });

        let graphics_writer = writer;
        let graphics_task = tokio::spawn(async move {
            while let Some(snapshot) = graphics.recv().await {
                deliver(&graphics_writer, &[format::graphics_line(&snapshot)]);
            }
            debug!("graphics stream ended");
        });

        // No output line for status changes; the transition is logged.
        // Reserved extension point: nothing here may assume ordering
        // relative to the other three streams.
        let status_task = tokio::spawn(async move {
            while let Some(event) = status.recv().await {
                info!(
                    previous = ?event.previous,
                    current = ?event.current,
                    "session status changed"
                );
            }
            debug!("status stream ended");
        });

        Self {
            tasks: vec![static_task, physics_task, graphics_task, status_task],
        }
    }

    /// Await all forwarding tasks. They finish once every stream's
    /// sender is gone.
    pub async fn join(self) {
        for task in self.tasks {
            if task.await.is_err() {
                warn!("dispatcher task panicked");
            }
        }
    }
}

/// Write lines in order; a closed transport or a bad write drops the
/// line and never propagates (telemetry is best-effort, at-most-once).
fn deliver<T: Transport>(writer: &LineWriter<T>, lines: &[String]) {
    for line in lines {
        match writer.write_line(line) {
            Ok(()) => {}
            Err(BridgeError::TransportUnavailable) => {
                debug!(line = %line, "transport closed, dropping line");
            }
            Err(e) => warn!(line = %line, "serial write failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use gridlink_telemetry::{Physics, StaticInfo, stream_channels};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[tokio::test]
    async fn forwards_physics_snapshot_as_three_lines_in_order() -> TestResult {
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
        drop(senders);
        dispatcher.join().await;

        assert_eq!(
            mock.written_string(),
            "Fuel: 45.5\nRPM:  6500\nTyre wear: 0.9, 0.91, 0.89, 0.92\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn forwards_static_info() -> TestResult {
        let (senders, streams) = stream_channels();
        let mock = MockTransport::new();
        let dispatcher = EventDispatcher::spawn(streams, LineWriter::new(mock.clone()));

        senders.static_info.send(StaticInfo { max_rpm: 9000 }).await?;
        drop(senders);
        dispatcher.join().await;

        assert_eq!(mock.written_string(), "Max RPM: 9000\n");
        Ok(())
    }

    #[tokio::test]
    async fn per_stream_order_is_preserved() -> TestResult {
        let (senders, streams) = stream_channels();
        let mock = MockTransport::new();
        let dispatcher = EventDispatcher::spawn(streams, LineWriter::new(mock.clone()));

        for max_rpm in [1000, 2000, 3000] {
            senders.static_info.send(StaticInfo { max_rpm }).await?;
        }
        drop(senders);
        dispatcher.join().await;

        assert_eq!(
            mock.written_string(),
            "Max RPM: 1000\nMax RPM: 2000\nMax RPM: 3000\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn closed_transport_drops_lines_without_failing_the_task() -> TestResult {
        let (senders, streams) = stream_channels();
        let mock = MockTransport::new();
        let writer = LineWriter::new(mock.clone());
        writer.close();
        let dispatcher = EventDispatcher::spawn(streams, writer);

        senders.static_info.send(StaticInfo { max_rpm: 9000 }).await?;
        drop(senders);
        // Tasks end cleanly even though every write was dropped.
        dispatcher.join().await;
        assert_eq!(mock.written_len(), 0);
        Ok(())
    }
}
