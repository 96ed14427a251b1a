//! Bridge error taxonomy.
//!
//! Only `PortOpen` is fatal, and only at startup. Everything that can
//! fail once the bridge is running (a write against a closed
//! transport, a bad drain tick) is contained at the call site:
//! log-and-continue, one bad line or tick never brings the bridge down.

use std::io;

use thiserror::Error;

use gridlink_telemetry::TelemetryError;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// The named serial port could not be opened. Fatal at startup;
    /// nothing is spawned before this succeeds.
    #[error("failed to open serial port {port}: {source}")]
    PortOpen {
        port: String,
        source: serialport::Error,
    },

    /// The transport is closed (or was never opened). The line being
    /// written is dropped; no retry, no buffering.
    #[error("transport unavailable")]
    TransportUnavailable,

    /// Serial port enumeration failed (list mode only).
    #[error("failed to enumerate serial ports: {0}")]
    Enumerate(#[from] serialport::Error),

    /// The telemetry source failed to start.
    #[error("telemetry source failed: {0}")]
    Source(#[from] TelemetryError),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl BridgeError {
    /// True for the one error that should terminate the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BridgeError::PortOpen { .. })
    }
}
