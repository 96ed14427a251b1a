//! Serial bridge core for gridlink.
//!
//! Fans four independently timed telemetry streams into one serialized
//! line-oriented serial writer, keeps the transport's receive buffer
//! drained on a background cadence, and coordinates a clean, idempotent
//! shutdown across all of it.
//!
//! ## Modules
//! - `transport` - `Transport` trait and the `serialport`-backed impl
//! - `mock` - in-memory transport double for tests
//! - `writer` - `LineWriter`, the single serialized funnel to the wire
//! - `drain` - `InputDrain`, periodic discard of unread inbound bytes
//! - `stop` - `StopSignal`, set-once cooperative stop flag
//! - `format` - snapshot-to-line formatting (locale-invariant ASCII)
//! - `dispatch` - `EventDispatcher`, one task per telemetry stream
//! - `shutdown` - `ShutdownCoordinator`, fixed-order idempotent teardown
//! - `bridge` - `SerialBridge`, the assembled unit

pub mod bridge;
pub mod dispatch;
pub mod drain;
pub mod error;
pub mod format;
pub mod mock;
pub mod shutdown;
pub mod stop;
pub mod transport;
pub mod writer;

pub use bridge::{BridgeConfig, SerialBridge};
pub use dispatch::EventDispatcher;
pub use drain::InputDrain;
pub use error::BridgeError;
pub use mock::MockTransport;
pub use shutdown::ShutdownCoordinator;
pub use stop::StopSignal;
pub use transport::{SerialTransport, Transport, available_port_names};
pub use writer::LineWriter;
