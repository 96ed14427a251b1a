//! Interval-driven simulated lap source.
//!
//! Produces plausible lap data without any game running: fuel burns
//! down, rpm sweeps through the rev range, tyres wear slowly, and a
//! best time appears after the first simulated lap. Used by the CLI's
//! default `sim` source and by timing-sensitive tests.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

use crate::snapshot::{Graphics, LapTime, Physics, SessionState, StaticInfo, StatusEvent};
use crate::{StreamIntervals, TelemetryError, TelemetrySource, TelemetryStreams, stream_channels};

const SIM_MAX_RPM: u32 = 8500;
const SIM_STARTING_FUEL: f32 = 62.0;
const SIM_FUEL_PER_TICK: f32 = 0.02;
const SIM_WEAR_PER_TICK: f32 = 0.000_4;
/// Graphics ticks before the first "lap" completes and a best time exists.
const SIM_FIRST_LAP_TICKS: u64 = 20;

pub struct SimulatedSource {
    started: AtomicBool,
    stop_tx: watch::Sender<bool>,
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedSource {
    pub fn new() -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            started: AtomicBool::new(false),
            stop_tx,
        }
    }
}

/// Deterministic physics state for simulation tick `t`.
fn physics_at(t: u64) -> Physics {
    let sweep = (t % 60) as f32 / 60.0;
    let rpms = 3500 + (sweep * (SIM_MAX_RPM as f32 - 3500.0)) as u32;
    let wear = |offset: f32| (1.0 - t as f32 * SIM_WEAR_PER_TICK - offset).max(0.0);
    Physics {
        fuel: (SIM_STARTING_FUEL - t as f32 * SIM_FUEL_PER_TICK).max(0.0),
        rpms,
        tyre_wear: [wear(0.0), wear(0.002), wear(0.01), wear(0.012)],
    }
}

/// Best time for graphics tick `t`: none until the first lap, then a
/// fixed reference lap that improves slightly every few laps.
fn best_time_at(t: u64) -> LapTime {
    if t < SIM_FIRST_LAP_TICKS {
        return LapTime::NONE;
    }
    let improvements = (t - SIM_FIRST_LAP_TICKS) / (SIM_FIRST_LAP_TICKS * 4);
    LapTime::from_millis(83_456u64.saturating_sub(improvements * 87))
}

#[async_trait]
impl TelemetrySource for SimulatedSource {
    fn source_id(&self) -> &str {
        "sim"
    }

    async fn start(&self, intervals: StreamIntervals) -> Result<TelemetryStreams, TelemetryError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(TelemetryError::AlreadyStarted);
        }

        let (senders, streams) = stream_channels();

        {
            let tx = senders.static_info;
            let mut stop_rx = self.stop_tx.subscribe();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(intervals.static_info);
                loop {
                    tokio::select! {
                        changed = stop_rx.changed() => {
                            if changed.is_err() || *stop_rx.borrow() {
                                break;
                            }
                        }
                        _ = ticker.tick() => {
                            let snapshot = StaticInfo { max_rpm: SIM_MAX_RPM };
                            if tx.send(snapshot).await.is_err() {
                                debug!("static info receiver dropped, stopping stream");
                                break;
                            }
                        }
                    }
                }
            });
        }

        {
            let tx = senders.physics;
            let mut stop_rx = self.stop_tx.subscribe();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(intervals.physics);
                let mut tick = 0u64;
                loop {
                    tokio::select! {
                        changed = stop_rx.changed() => {
                            if changed.is_err() || *stop_rx.borrow() {
                                break;
                            }
                        }
                        _ = ticker.tick() => {
                            if tx.send(physics_at(tick)).await.is_err() {
                                debug!("physics receiver dropped, stopping stream");
                                break;
                            }
                            tick = tick.saturating_add(1);
                        }
                    }
                }
            });
        }

        {
            let tx = senders.graphics;
            let mut stop_rx = self.stop_tx.subscribe();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(intervals.graphics);
                let mut tick = 0u64;
                loop {
                    tokio::select! {
                        changed = stop_rx.changed() => {
                            if changed.is_err() || *stop_rx.borrow() {
                                break;
                            }
                        }
                        _ = ticker.tick() => {
                            let snapshot = Graphics { best_time: best_time_at(tick) };
                            if tx.send(snapshot).await.is_err() {
                                debug!("graphics receiver dropped, stopping stream");
                                break;
                            }
                            tick = tick.saturating_add(1);
                        }
                    }
                }
            });
        }

        {
            // The simulated session goes live immediately; that single
            // transition is the only status event the sim ever emits.
            let tx = senders.status;
            tokio::spawn(async move {
                let event = StatusEvent {
                    previous: SessionState::Off,
                    current: SessionState::Live,
                };
                if tx.send(event).await.is_err() {
                    debug!("status receiver dropped before session went live");
                }
            });
        }

        debug!("simulated telemetry source started");
        Ok(streams)
    }

    async fn stop(&self) -> Result<(), TelemetryError> {
        // Idempotent: the watch value latches at `true`.
        self.stop_tx.send_replace(true);
        debug!("simulated telemetry source stopped");
        Ok(())
    }
}
