//! Interactive console loop for the running bridge.
//!
//! Puts the terminal into raw mode so a single `q` (or Ctrl-C, which
//! raw mode delivers as a key event rather than SIGINT) ends the run,
//! and redraws a one-line pending-bytes status in place between polls.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;

use gridlink_serial::{LineWriter, StopSignal, Transport};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Restores cooked mode on drop so a panic or early return never
/// leaves the user's terminal raw.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self> {
        terminal::enable_raw_mode().context("failed to enable raw terminal mode")?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Block until the user quits or `stop` is set elsewhere.
///
/// Runs on a dedicated blocking thread; the dispatcher keeps feeding
/// the writer in the background while this polls the keyboard.
pub fn run_loop<T: Transport>(writer: LineWriter<T>, stop: StopSignal) -> Result<()> {
    let _guard = RawModeGuard::enable()?;
    let mut stdout = std::io::stdout();

    loop {
        if stop.is_set() {
            break;
        }

        if event::poll(POLL_INTERVAL).context("failed to poll terminal events")? {
            if let Event::Key(key) = event::read().context("failed to read terminal event")? {
                if key.kind == KeyEventKind::Press && is_quit_key(key.code, key.modifiers) {
                    break;
                }
            }
        }

        // Raw mode suppresses the usual \n translation, so redraw the
        // status on one line with a carriage return.
        let status = status_line(writer.pending_bytes());
        write!(stdout, "\r{status:<24}")?;
        stdout.flush()?;
    }

    write!(stdout, "\r\n")?;
    stdout.flush()?;
    Ok(())
}

fn is_quit_key(code: KeyCode, modifiers: KeyModifiers) -> bool {
    match code {
        KeyCode::Char('q') | KeyCode::Char('Q') => true,
        KeyCode::Char('c') => modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

/// One-line status for the in-place display. `None` means the writer
/// is already closed.
fn status_line(pending: Option<u32>) -> String {
    match pending {
        Some(bytes) => format!("{bytes:>5} B pending | q quits"),
        None => "port closed".to_string(),
    }
}
