//! Fixed-order, idempotent teardown.
//!
//! Order matters: stop the source first so no new notifications start
//! (handlers already in flight may finish), then latch the stop
//! signal, then join the drain (bounded by its one-tick exit), and
//! only then flush and close the transport. Running shutdown twice is
//! a guarded no-op — the second call must never fault or attempt a
//! second physical close.

use std::sync::Arc;

use tracing::{info, warn};

use gridlink_telemetry::TelemetrySource;

use crate::drain::InputDrain;
use crate::stop::StopSignal;
use crate::transport::Transport;
use crate::writer::LineWriter;

pub struct ShutdownCoordinator<T> {
    source: Arc<dyn TelemetrySource>,
    stop: StopSignal,
    drain: Option<InputDrain>,
    writer: LineWriter<T>,
    done: bool,
}

impl<T: Transport> ShutdownCoordinator<T> {
    pub fn new(
        source: Arc<dyn TelemetrySource>,
        stop: StopSignal,
        drain: InputDrain,
        writer: LineWriter<T>,
    ) -> Self {
        Self {
            source,
            stop,
            drain: Some(drain),
            writer,
            done: false,
        }
    }

    /// Bring everything down in order. Infallible by design: failures
    /// during teardown are logged, never propagated.
    pub async fn shutdown(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        info!("shutting down serial bridge");

        if let Err(e) = self.source.stop().await {
            warn!("telemetry source stop failed: {e}");
        }

        self.stop.set();

        if let Some(drain) = self.drain.take() {
            // The drain is a blocking thread; join it off the runtime.
            if tokio::task::spawn_blocking(move || drain.join())
                .await
                .is_err()
            {
                warn!("input drain join was aborted");
            }
        }

        self.writer.close();
        info!("serial bridge stopped");
    }

    pub fn is_shut_down(&self) -> bool {
        self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use gridlink_telemetry::SimulatedSource;
    use std::time::Duration;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn coordinator_over(mock: &MockTransport) -> Result<ShutdownCoordinator<MockTransport>, Box<dyn std::error::Error>> {
        let stop = StopSignal::new();
        let drain = InputDrain::spawn(mock.clone(), stop.clone(), Duration::from_millis(20))?;
        Ok(ShutdownCoordinator::new(
            Arc::new(SimulatedSource::new()),
            stop,
            drain,
            LineWriter::new(mock.clone()),
        ))
    }

    #[tokio::test]
    async fn shutdown_closes_writer_and_sets_signal() -> TestResult {
        let mock = MockTransport::new();
        let mut coordinator = coordinator_over(&mock)?;
        let stop = coordinator.stop.clone();

        coordinator.shutdown().await;

        assert!(stop.is_set());
        assert!(coordinator.writer.is_closed());
        assert!(coordinator.is_shut_down());
        assert_eq!(mock.flush_count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn second_shutdown_is_a_no_op() -> TestResult {
        let mock = MockTransport::new();
        let mut coordinator = coordinator_over(&mock)?;

        coordinator.shutdown().await;
        coordinator.shutdown().await;

        // One flush, one physical close.
        assert_eq!(mock.flush_count(), 1);
        Ok(())
    }
}
