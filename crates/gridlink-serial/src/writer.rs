//! The single serialized funnel through which every output line
//! reaches the transport.
//!
//! Line atomicity comes from one `write_all` of the whole line (plus
//! terminator) under the mutex: two concurrent callers can race for
//! which line hits the wire first, but never interleave bytes. There
//! is no queueing or batching behind the lock.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::BridgeError;
use crate::transport::Transport;

pub struct LineWriter<T> {
    slot: Arc<Mutex<Option<T>>>,
}

impl<T> Clone for LineWriter<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: Transport> LineWriter<T> {
    pub fn new(transport: T) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(transport))),
        }
    }

    /// Write `line` plus a newline to the transport as one atomic unit
    /// relative to other callers.
    ///
    /// # Errors
    /// [`BridgeError::TransportUnavailable`] once the writer is
    /// closed; callers log and drop the line. I/O failures pass
    /// through as [`BridgeError::Io`].
    pub fn write_line(&self, line: &str) -> Result<(), BridgeError> {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');

        let mut slot = self.slot.lock();
        let transport = slot.as_mut().ok_or(BridgeError::TransportUnavailable)?;
        transport.write_all(&buf)?;
        Ok(())
    }

    /// Outbound bytes not yet on the wire, for the status display.
    /// `None` once closed or if the transport cannot say.
    pub fn pending_bytes(&self) -> Option<u32> {
        self.slot
            .lock()
            .as_ref()
            .and_then(|transport| transport.bytes_to_write().ok())
    }

    /// Flush and close the transport. Idempotent: the handle is taken
    /// out of the slot, so a second call finds nothing to close and
    /// later writes fail with `TransportUnavailable`.
    pub fn close(&self) {
        let taken = self.slot.lock().take();
        match taken {
            Some(mut transport) => {
                if let Err(e) = transport.flush() {
                    warn!("flush on close failed: {e}");
                }
                debug!("transport closed");
            }
            None => debug!("transport already closed"),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.slot.lock().is_none()
    }
}
