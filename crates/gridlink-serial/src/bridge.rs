//! The assembled bridge: source → dispatcher → line writer, with the
//! input drain running alongside and a shutdown coordinator owning the
//! teardown order.

use std::sync::Arc;
use std::time::Duration;

use gridlink_telemetry::{StreamIntervals, TelemetrySource};

use crate::dispatch::EventDispatcher;
use crate::drain::InputDrain;
use crate::error::BridgeError;
use crate::shutdown::ShutdownCoordinator;
use crate::stop::StopSignal;
use crate::transport::Transport;
use crate::writer::LineWriter;

#[derive(Clone, Copy, Debug)]
pub struct BridgeConfig {
    pub intervals: StreamIntervals,
    pub drain_tick: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            intervals: StreamIntervals::default(),
            drain_tick: Duration::from_secs(1),
        }
    }
}

pub struct SerialBridge<T: Transport> {
    writer: LineWriter<T>,
    dispatcher: Option<EventDispatcher>,
    coordinator: ShutdownCoordinator<T>,
    stop: StopSignal,
}

impl<T: Transport + 'static> SerialBridge<T> {
    /// Wire everything up and start delivering. The source is started
    /// last; if it fails, the already-spawned drain and the writer are
    /// unwound through the normal teardown order and the error
    /// propagates (startup faults are fatal, run-phase faults are
    /// not).
    ///
    /// # Errors
    /// Any [`TelemetryError`](gridlink_telemetry::TelemetryError) from
    /// the source, wrapped as [`BridgeError::Source`], or an
    /// [`BridgeError::Io`] if the drain thread cannot be spawned.
    pub async fn start(
        source: Arc<dyn TelemetrySource>,
        writer_half: T,
        reader_half: T,
        config: BridgeConfig,
    ) -> Result<Self, BridgeError> {
        let writer = LineWriter::new(writer_half);
        let stop = StopSignal::new();
        let drain = InputDrain::spawn(reader_half, stop.clone(), config.drain_tick)?;

        let streams = match source.start(config.intervals).await {
            Ok(streams) => streams,
            Err(e) => {
                stop.set();
                let _ = tokio::task::spawn_blocking(move || drain.join()).await;
                writer.close();
                return Err(BridgeError::Source(e));
            }
        };

        let dispatcher = EventDispatcher::spawn(streams, writer.clone());
        let coordinator = ShutdownCoordinator::new(source, stop.clone(), drain, writer.clone());

        Ok(Self {
            writer,
            dispatcher: Some(dispatcher),
            coordinator,
            stop,
        })
    }

    /// The serialized write funnel (for the status display).
    pub fn writer(&self) -> &LineWriter<T> {
        &self.writer
    }

    /// The shared stop flag; set once shutdown begins.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Tear down in order. Idempotent; see [`ShutdownCoordinator`].
    pub async fn shutdown(&mut self) {
        self.coordinator.shutdown().await;
    }

    /// Await the dispatcher tasks; they end once the stopped source
    /// drops its stream senders. Call after [`Self::shutdown`].
    pub async fn join_dispatch(&mut self) {
        if let Some(dispatcher) = self.dispatcher.take() {
            dispatcher.join().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use gridlink_telemetry::{SimulatedSource, TelemetryError};
    use async_trait::async_trait;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    struct FailingSource;

    #[async_trait]
    impl TelemetrySource for FailingSource {
        fn source_id(&self) -> &str {
            "failing"
        }

        async fn start(
            &self,
            _intervals: StreamIntervals,
        ) -> Result<gridlink_telemetry::TelemetryStreams, TelemetryError> {
            Err(TelemetryError::AlreadyStarted)
        }

        async fn stop(&self) -> Result<(), TelemetryError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn source_start_failure_unwinds_and_propagates() -> TestResult {
        let mock = MockTransport::new();
        let config = BridgeConfig {
            drain_tick: Duration::from_millis(20),
            ..BridgeConfig::default()
        };
        let result = SerialBridge::start(
            Arc::new(FailingSource),
            mock.clone(),
            mock.clone(),
            config,
        )
        .await;

        assert!(matches!(result, Err(BridgeError::Source(_))));
        // The writer half was closed during unwind.
        assert_eq!(mock.flush_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn full_cycle_with_simulated_source() -> TestResult {
        let mock = MockTransport::new();
        let config = BridgeConfig {
            intervals: StreamIntervals {
                static_info: Duration::from_millis(5),
                physics: Duration::from_millis(5),
                graphics: Duration::from_millis(5),
            },
            drain_tick: Duration::from_millis(20),
        };
        let mut bridge = SerialBridge::start(
            Arc::new(SimulatedSource::new()),
            mock.clone(),
            mock.clone(),
            config,
        )
        .await?;

        tokio::time::sleep(Duration::from_millis(100)).await;
        bridge.shutdown().await;
        bridge.join_dispatch().await;

        let written = mock.written_string();
        assert!(written.contains("Max RPM: 8500\n"));
        assert!(written.contains("Fuel: "));
        assert!(written.contains("RPM:  "));
        assert!(written.contains("Best time: "));
        Ok(())
    }

    #[tokio::test]
    async fn shutdown_twice_through_the_bridge_is_safe() -> TestResult {
        let mock = MockTransport::new();
        let mut bridge = SerialBridge::start(
            Arc::new(SimulatedSource::new()),
            mock.clone(),
            mock.clone(),
            BridgeConfig {
                drain_tick: Duration::from_millis(20),
                ..BridgeConfig::default()
            },
        )
        .await?;

        bridge.shutdown().await;
        bridge.shutdown().await;
        assert_eq!(mock.flush_count(), 1);
        assert!(matches!(
            bridge.writer().write_line("late"),
            Err(BridgeError::TransportUnavailable)
        ));
        Ok(())
    }
}
