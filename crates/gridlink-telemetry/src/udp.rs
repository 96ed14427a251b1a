//! UDP datagram telemetry source.
//!
//! Listens for fixed-layout little-endian datagrams, one snapshot per
//! datagram:
//!
//! ```text
//! offset 0..4   magic  b"GLK1"
//! offset 4      packet type (1=static, 2=physics, 3=graphics, 4=status)
//! offset 5..    payload, little-endian:
//!   static   max_rpm: u32                                  (9 bytes total)
//!   physics  fuel: f32, rpms: u32, tyre_wear: [f32; 4]     (29 bytes total)
//!   graphics best_time_ms: u32                             (9 bytes total)
//!   status   session_state: u8 (0=off 1=replay 2=live 3=pause, 6 bytes)
//! ```
//!
//! Incoming packets are gated to the configured per-stream cadence
//! (excess packets are dropped, never queued) and status packets are
//! forwarded only on an actual state transition.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};

use crate::snapshot::{Graphics, LapTime, Physics, SessionState, StaticInfo, StatusEvent};
use crate::{StreamIntervals, TelemetryError, TelemetrySource, TelemetryStreams, stream_channels};

const MAGIC: [u8; 4] = *b"GLK1";
const MAX_DATAGRAM_SIZE: usize = 64;

const TYPE_STATIC: u8 = 1;
const TYPE_PHYSICS: u8 = 2;
const TYPE_GRAPHICS: u8 = 3;
const TYPE_STATUS: u8 = 4;

// Byte offsets within a datagram.
const OFF_TYPE: usize = 4;
const OFF_PAYLOAD: usize = 5;
const OFF_PHYSICS_FUEL: usize = OFF_PAYLOAD;
const OFF_PHYSICS_RPMS: usize = OFF_PAYLOAD + 4;
const OFF_PHYSICS_WEAR: usize = OFF_PAYLOAD + 8;

const STATIC_LEN: usize = OFF_PAYLOAD + 4;
const PHYSICS_LEN: usize = OFF_PAYLOAD + 24;
const GRAPHICS_LEN: usize = OFF_PAYLOAD + 4;
const STATUS_LEN: usize = OFF_PAYLOAD + 1;

/// One decoded datagram.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Datagram {
    Static(StaticInfo),
    Physics(Physics),
    Graphics(Graphics),
    Status(SessionState),
}

fn read_u32_le(data: &[u8], offset: usize) -> Option<u32> {
    data.get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
}

fn read_f32_le(data: &[u8], offset: usize) -> Option<f32> {
    data.get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(f32::from_le_bytes)
        .filter(|v| v.is_finite())
}

/// Decode one datagram. Never panics, whatever the input bytes.
pub fn decode_datagram(data: &[u8]) -> Result<Datagram, TelemetryError> {
    if data.get(..4) != Some(&MAGIC[..]) {
        return Err(TelemetryError::Decode("bad magic".into()));
    }
    let packet_type = *data
        .get(OFF_TYPE)
        .ok_or_else(|| TelemetryError::Decode("missing packet type".into()))?;

    let expect_len = |len: usize| {
        if data.len() < len {
            Err(TelemetryError::Decode(format!(
                "datagram too short: expected {len}, got {}",
                data.len()
            )))
        } else {
            Ok(())
        }
    };

    match packet_type {
        TYPE_STATIC => {
            expect_len(STATIC_LEN)?;
            let max_rpm = read_u32_le(data, OFF_PAYLOAD).unwrap_or(0);
            Ok(Datagram::Static(StaticInfo { max_rpm }))
        }
        TYPE_PHYSICS => {
            expect_len(PHYSICS_LEN)?;
            let fuel = read_f32_le(data, OFF_PHYSICS_FUEL).unwrap_or(0.0).max(0.0);
            let rpms = read_u32_le(data, OFF_PHYSICS_RPMS).unwrap_or(0);
            let mut tyre_wear = [0.0f32; 4];
            for (i, wear) in tyre_wear.iter_mut().enumerate() {
                *wear = read_f32_le(data, OFF_PHYSICS_WEAR + i * 4)
                    .unwrap_or(0.0)
                    .clamp(0.0, 1.0);
            }
            Ok(Datagram::Physics(Physics {
                fuel,
                rpms,
                tyre_wear,
            }))
        }
        TYPE_GRAPHICS => {
            expect_len(GRAPHICS_LEN)?;
            let best_time_ms = read_u32_le(data, OFF_PAYLOAD).unwrap_or(0);
            Ok(Datagram::Graphics(Graphics {
                best_time: LapTime::from_millis(u64::from(best_time_ms)),
            }))
        }
        TYPE_STATUS => {
            expect_len(STATUS_LEN)?;
            let state = match data.get(OFF_PAYLOAD) {
                Some(0) => SessionState::Off,
                Some(1) => SessionState::Replay,
                Some(2) => SessionState::Live,
                Some(3) => SessionState::Pause,
                other => {
                    return Err(TelemetryError::Decode(format!(
                        "unknown session state {other:?}"
                    )));
                }
            };
            Ok(Datagram::Status(state))
        }
        other => Err(TelemetryError::Decode(format!(
            "unknown packet type {other}"
        ))),
    }
}

/// Admits at most one sample per interval; excess samples are dropped.
struct CadenceGate {
    interval: Duration,
    last: Option<Instant>,
}

impl CadenceGate {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    fn admit(&mut self) -> bool {
        match self.last {
            Some(last) if last.elapsed() < self.interval => false,
            _ => {
                self.last = Some(Instant::now());
                true
            }
        }
    }
}

pub struct UdpSource {
    bind_port: u16,
    started: AtomicBool,
    stop_tx: watch::Sender<bool>,
    local_addr: OnceLock<SocketAddr>,
}

impl UdpSource {
    /// Listen on the given UDP port (0 picks an ephemeral port).
    pub fn new(bind_port: u16) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            bind_port,
            started: AtomicBool::new(false),
            stop_tx,
            local_addr: OnceLock::new(),
        }
    }

    /// The bound address, available after a successful `start`.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }
}

fn forward<T: std::fmt::Debug>(tx: &mpsc::Sender<T>, snapshot: T, stream: &str) {
    match tx.try_send(snapshot) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            trace!(stream, "stream full, dropping sample");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            trace!(stream, "stream receiver dropped");
        }
    }
}

#[async_trait]
impl TelemetrySource for UdpSource {
    fn source_id(&self) -> &str {
        "udp"
    }

    async fn start(&self, intervals: StreamIntervals) -> Result<TelemetryStreams, TelemetryError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(TelemetryError::AlreadyStarted);
        }

        let addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, self.bind_port));
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| TelemetryError::Bind { addr, source })?;
        let local = socket.local_addr().map_err(|source| TelemetryError::Bind {
            addr,
            source,
        })?;
        let _ = self.local_addr.set(local);
        info!(%local, "udp telemetry source listening");

        let (senders, streams) = stream_channels();
        let mut stop_rx = self.stop_tx.subscribe();

        tokio::spawn(async move {
            let mut buf = [0u8; MAX_DATAGRAM_SIZE];
            let mut static_gate = CadenceGate::new(intervals.static_info);
            let mut physics_gate = CadenceGate::new(intervals.physics);
            let mut graphics_gate = CadenceGate::new(intervals.graphics);
            let mut session = SessionState::Off;

            loop {
                tokio::select! {
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                    received = socket.recv_from(&mut buf) => {
                        let len = match received {
                            Ok((len, _peer)) => len,
                            Err(e) => {
                                warn!("udp receive failed: {e}");
                                continue;
                            }
                        };
                        match decode_datagram(buf.get(..len).unwrap_or_default()) {
                            Ok(Datagram::Static(s)) => {
                                if static_gate.admit() {
                                    forward(&senders.static_info, s, "static_info");
                                }
                            }
                            Ok(Datagram::Physics(p)) => {
                                if physics_gate.admit() {
                                    forward(&senders.physics, p, "physics");
                                }
                            }
                            Ok(Datagram::Graphics(g)) => {
                                if graphics_gate.admit() {
                                    forward(&senders.graphics, g, "graphics");
                                }
                            }
                            Ok(Datagram::Status(current)) => {
                                if current != session {
                                    let event = StatusEvent { previous: session, current };
                                    session = current;
                                    forward(&senders.status, event, "status");
                                }
                            }
                            Err(e) => debug!("dropping malformed datagram: {e}"),
                        }
                    }
                }
            }
            debug!("udp telemetry source exiting");
        });

        Ok(streams)
    }

    async fn stop(&self) -> Result<(), TelemetryError> {
        self.stop_tx.send_replace(true);
        debug!("udp telemetry source stopped");
        Ok(())
    }
}
