//! Telemetry snapshot model and sources for the gridlink serial bridge.
//!
//! A [`TelemetrySource`] delivers four independently timed snapshot
//! streams: static session info, physics, graphics, and discrete
//! session-status transitions. Streams are bounded mpsc channels;
//! dropping a receiver revokes that subscription.
//!
//! ## Modules
//! - `snapshot` - immutable snapshot payload types
//! - `sim` - interval-driven simulated lap source
//! - `udp` - UDP datagram source with a fixed little-endian layout

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

pub mod sim;
pub mod snapshot;
pub mod udp;

pub use sim::SimulatedSource;
pub use snapshot::{Graphics, LapTime, Physics, SessionState, StaticInfo, StatusEvent};
pub use udp::UdpSource;

/// Per-stream channel capacity. Small on purpose: a full channel
/// applies backpressure to the source's forwarding task, never to the
/// serial write path, and stale samples are worthless anyway.
pub const STREAM_CAPACITY: usize = 16;

/// Delivery cadences for the interval-driven streams.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamIntervals {
    pub static_info: Duration,
    pub physics: Duration,
    pub graphics: Duration,
}

impl Default for StreamIntervals {
    fn default() -> Self {
        Self {
            static_info: Duration::from_millis(1000),
            physics: Duration::from_millis(100),
            graphics: Duration::from_millis(300),
        }
    }
}

/// The four subscription handles returned by [`TelemetrySource::start`].
///
/// Deliveries within one stream are strictly ordered and never
/// overlap; across streams no ordering is guaranteed.
#[derive(Debug)]
pub struct TelemetryStreams {
    pub static_info: mpsc::Receiver<StaticInfo>,
    pub physics: mpsc::Receiver<Physics>,
    pub graphics: mpsc::Receiver<Graphics>,
    pub status: mpsc::Receiver<StatusEvent>,
}

/// Matching sender half, used internally by source implementations.
#[derive(Clone, Debug)]
pub struct StreamSenders {
    pub static_info: mpsc::Sender<StaticInfo>,
    pub physics: mpsc::Sender<Physics>,
    pub graphics: mpsc::Sender<Graphics>,
    pub status: mpsc::Sender<StatusEvent>,
}

/// Create a bounded sender/receiver pair for all four streams.
pub fn stream_channels() -> (StreamSenders, TelemetryStreams) {
    let (static_tx, static_rx) = mpsc::channel(STREAM_CAPACITY);
    let (physics_tx, physics_rx) = mpsc::channel(STREAM_CAPACITY);
    let (graphics_tx, graphics_rx) = mpsc::channel(STREAM_CAPACITY);
    let (status_tx, status_rx) = mpsc::channel(STREAM_CAPACITY);
    (
        StreamSenders {
            static_info: static_tx,
            physics: physics_tx,
            graphics: graphics_tx,
            status: status_tx,
        },
        TelemetryStreams {
            static_info: static_rx,
            physics: physics_rx,
            graphics: graphics_rx,
            status: status_rx,
        },
    )
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("telemetry source already started")]
    AlreadyStarted,

    #[error("failed to bind udp listener on {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },

    #[error("malformed telemetry datagram: {0}")]
    Decode(String),
}

/// A producer of timed telemetry snapshot streams.
///
/// `start` may be called once per source; `stop` is idempotent and
/// halts the source's internal timers so no new deliveries begin
/// (in-flight sends are allowed to complete).
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    fn source_id(&self) -> &str;

    /// Begin delivering snapshots at the given cadences.
    ///
    /// # Errors
    /// [`TelemetryError::AlreadyStarted`] on a second call, or a
    /// source-specific startup failure (e.g. a UDP bind error).
    async fn start(&self, intervals: StreamIntervals) -> Result<TelemetryStreams, TelemetryError>;

    /// Stop delivering snapshots. Idempotent.
    async fn stop(&self) -> Result<(), TelemetryError>;
}
