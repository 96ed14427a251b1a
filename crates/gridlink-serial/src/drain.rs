//! Periodic discard of unread inbound bytes.
//!
//! The receiving device may echo or chatter; nothing in this
//! application interprets those bytes, but letting them pile up in the
//! driver's receive buffer can stall our write path through flow
//! control. A dedicated thread wakes once per tick and reads until the
//! port reports nothing immediately available — one partial read is
//! not enough, more bytes may already be queued behind it.
//!
//! This runs on a plain `std::thread` because `serialport` reads are
//! blocking I/O; the bounded wait on [`StopSignal`] guarantees the
//! thread observes shutdown within one tick.

use std::io;
use std::thread;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::error::BridgeError;
use crate::stop::StopSignal;
use crate::transport::Transport;

const DRAIN_BUF_SIZE: usize = 256;

pub struct InputDrain {
    handle: thread::JoinHandle<()>,
}

impl InputDrain {
    /// Spawn the drain thread over the reader half of the transport.
    /// The reader is dropped when the thread exits.
    ///
    /// # Errors
    /// [`BridgeError::Io`] if the OS refuses to spawn the thread.
    pub fn spawn<T: Transport + 'static>(
        mut reader: T,
        stop: StopSignal,
        tick: Duration,
    ) -> Result<Self, BridgeError> {
        let handle = thread::Builder::new()
            .name("gridlink-drain".into())
            .spawn(move || {
                debug!("input drain started");
                while !stop.wait_timeout(tick) {
                    if let Err(e) = drain_available(&mut reader) {
                        // Transient read errors are not fatal to the
                        // drain loop; try again next tick.
                        warn!("serial drain failed: {e}");
                    }
                }
                debug!("input drain exiting");
            })?;
        Ok(Self { handle })
    }

    /// Wait for the drain thread to finish. Call after setting the
    /// stop signal; the thread exits within one tick.
    pub fn join(self) {
        if self.handle.join().is_err() {
            warn!("input drain thread panicked");
        }
    }
}

/// Read and discard everything the port reports as immediately
/// available, looping until it reports zero.
fn drain_available<T: Transport>(reader: &mut T) -> io::Result<()> {
    let mut buf = [0u8; DRAIN_BUF_SIZE];
    loop {
        if reader.bytes_to_read()? == 0 {
            return Ok(());
        }
        match reader.read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => trace!(discarded = n, "drained inbound bytes"),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use std::time::Instant;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn drains_multiple_chunks_in_one_pass() -> TestResult {
        let mock = MockTransport::new();
        mock.push_inbound(&[0u8; 300]);
        mock.push_inbound(&[1u8; 300]);
        mock.push_inbound(b"ok");
        drain_available(&mut mock.clone())?;
        assert!(mock.inbound_is_empty());
        Ok(())
    }

    #[test]
    fn empty_port_is_a_no_op() -> TestResult {
        let mock = MockTransport::new();
        drain_available(&mut mock.clone())?;
        assert_eq!(mock.read_count(), 0);
        Ok(())
    }

    #[test]
    fn drain_thread_discards_and_exits_within_one_tick() -> TestResult {
        let mock = MockTransport::new();
        mock.push_inbound(&[0u8; 1024]);
        let stop = StopSignal::new();
        let drain = InputDrain::spawn(mock.clone(), stop.clone(), Duration::from_millis(50))?;

        // Give the loop a couple of ticks to run.
        thread::sleep(Duration::from_millis(160));
        assert!(mock.inbound_is_empty());

        stop.set();
        let joined_at = Instant::now();
        drain.join();
        assert!(joined_at.elapsed() < Duration::from_millis(100));
        Ok(())
    }

    #[test]
    fn read_failure_does_not_kill_the_loop() -> TestResult {
        let mock = MockTransport::new();
        mock.fail_reads(true);
        let stop = StopSignal::new();
        let drain = InputDrain::spawn(mock.clone(), stop.clone(), Duration::from_millis(20))?;

        thread::sleep(Duration::from_millis(80));
        mock.fail_reads(false);
        mock.push_inbound(b"late bytes");
        thread::sleep(Duration::from_millis(80));
        assert!(mock.inbound_is_empty());

        stop.set();
        drain.join();
        Ok(())
    }
}
