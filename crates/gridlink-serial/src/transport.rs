//! Transport abstraction over the serial handle.
//!
//! The bridge never touches a raw port directly: writes go through
//! [`crate::LineWriter`], reads through [`crate::InputDrain`], and both
//! sides hold their own half of the full-duplex handle so the drain
//! never contends with the write mutex.

use std::io;
use std::time::Duration;

use serialport::{DataBits, Parity, SerialPort, StopBits};
use tracing::info;

use crate::error::BridgeError;

/// Fixed line parameters for the receiving device: 115200 baud, 8 data
/// bits, 1 stop bit, no parity. Not configurable at runtime.
pub const BAUD_RATE: u32 = 115_200;

/// Bound on blocking reads so the drain loop can never wedge on a
/// quiet port.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Minimal serial-handle surface the bridge needs. Object-safe so
/// tests can substitute [`crate::MockTransport`].
pub trait Transport: Send {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    /// Bytes currently queued inbound, readable without blocking.
    fn bytes_to_read(&self) -> io::Result<u32>;
    /// Bytes queued outbound, not yet on the wire.
    fn bytes_to_write(&self) -> io::Result<u32>;
}

/// A real serial port half, backed by the `serialport` crate.
pub struct SerialTransport {
    inner: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Open `port_name` with the fixed 115200/8N1 configuration and
    /// split it into a writer half and a reader half via `try_clone`
    /// (both refer to the same OS handle; serial ports are
    /// full-duplex, so the halves need no shared lock).
    ///
    /// # Errors
    /// [`BridgeError::PortOpen`] if the port cannot be opened or
    /// cloned. This is the bridge's one fatal startup error.
    pub fn open(port_name: &str) -> Result<(SerialTransport, SerialTransport), BridgeError> {
        let port_open = |source| BridgeError::PortOpen {
            port: port_name.to_string(),
            source,
        };
        let writer = serialport::new(port_name, BAUD_RATE)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(port_open)?;
        let reader = writer.try_clone().map_err(port_open)?;
        info!(port = port_name, baud = BAUD_RATE, "serial port opened");
        Ok((Self { inner: writer }, Self { inner: reader }))
    }
}

impl Transport for SerialTransport {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        io::Write::write_all(&mut self.inner, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::Write::flush(&mut self.inner)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(&mut self.inner, buf)
    }

    fn bytes_to_read(&self) -> io::Result<u32> {
        self.inner.bytes_to_read().map_err(io::Error::from)
    }

    fn bytes_to_write(&self) -> io::Result<u32> {
        self.inner.bytes_to_write().map_err(io::Error::from)
    }
}

/// Names of every serial port currently present, sorted. Used by the
/// CLI's list mode; nothing is opened.
///
/// # Errors
/// [`BridgeError::Enumerate`] if the platform enumeration fails.
pub fn available_port_names() -> Result<Vec<String>, BridgeError> {
    let mut names: Vec<String> = serialport::available_ports()?
        .into_iter()
        .map(|info| info.port_name)
        .collect();
    names.sort();
    names.dedup();
    Ok(names)
}
