//! In-memory transport double.
//!
//! Records every written byte, serves scripted inbound chunks, and can
//! be flipped into a failing state to exercise the bridge's
//! log-and-continue paths. Shared state behind an `Arc` so a clone can
//! stand in for the writer half while the test keeps its own handle
//! for assertions.

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::transport::Transport;

#[derive(Default)]
struct MockState {
    written: Vec<u8>,
    inbound: VecDeque<Vec<u8>>,
    flushes: u32,
    reads: u32,
    fail_writes: bool,
    fail_reads: bool,
}

#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, as UTF-8 (lossy).
    pub fn written_string(&self) -> String {
        String::from_utf8_lossy(&self.state.lock().written).into_owned()
    }

    pub fn written_len(&self) -> usize {
        self.state.lock().written.len()
    }

    /// Queue a chunk of inbound bytes for the drain to discard.
    pub fn push_inbound(&self, bytes: &[u8]) {
        self.state.lock().inbound.push_back(bytes.to_vec());
    }

    pub fn inbound_is_empty(&self) -> bool {
        self.state.lock().inbound.is_empty()
    }

    pub fn flush_count(&self) -> u32 {
        self.state.lock().flushes
    }

    pub fn read_count(&self) -> u32 {
        self.state.lock().reads
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().fail_reads = fail;
    }
}

impl Transport for MockTransport {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock();
        if state.fail_writes {
            return Err(io::Error::other("mock write failure"));
        }
        state.written.extend_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self.state.lock();
        if state.fail_writes {
            return Err(io::Error::other("mock flush failure"));
        }
        state.flushes += 1;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        if state.fail_reads {
            return Err(io::Error::other("mock read failure"));
        }
        state.reads += 1;
        let Some(chunk) = state.inbound.front_mut() else {
            return Err(io::Error::from(io::ErrorKind::TimedOut));
        };
        let n = chunk.len().min(buf.len());
        for (dst, src) in buf.iter_mut().zip(chunk.drain(..n)) {
            *dst = src;
        }
        if chunk.is_empty() {
            state.inbound.pop_front();
        }
        Ok(n)
    }

    fn bytes_to_read(&self) -> io::Result<u32> {
        let state = self.state.lock();
        if state.fail_reads {
            return Err(io::Error::other("mock status failure"));
        }
        let total: usize = state.inbound.iter().map(Vec::len).sum();
        Ok(total as u32)
    }

    fn bytes_to_write(&self) -> io::Result<u32> {
        Ok(0)
    }
}
