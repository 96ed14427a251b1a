//! Immutable snapshot payload types.
//!
//! One snapshot is a point-in-time telemetry payload of a specific
//! variant. Variants are delivered at distinct cadences and are never
//! mutated after construction.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Session-constant data, emitted roughly once per second.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticInfo {
    pub max_rpm: u32,
}

/// Fast-changing car state, default 100 ms cadence.
///
/// Tyre wear order is front-left, front-right, rear-left, rear-right,
/// each in `0.0..=1.0` where `1.0` is a fresh tyre.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Physics {
    pub fuel: f32,
    pub rpms: u32,
    pub tyre_wear: [f32; 4],
}

/// Session/timing data, default 300 ms cadence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graphics {
    pub best_time: LapTime,
}

/// A lap time with millisecond resolution.
///
/// Renders as `m:ss.mmm`; the zero value means "no lap set" and
/// renders as `-:--.---` so the receiving device always parses a
/// fixed-width ASCII field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LapTime(Duration);

impl LapTime {
    pub const NONE: LapTime = LapTime(Duration::ZERO);

    pub fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    pub fn as_millis(&self) -> u128 {
        self.0.as_millis()
    }

    pub fn is_set(&self) -> bool {
        !self.0.is_zero()
    }
}

impl fmt::Display for LapTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_set() {
            return write!(f, "-:--.---");
        }
        let total_ms = self.0.as_millis();
        let minutes = total_ms / 60_000;
        let seconds = (total_ms / 1000) % 60;
        let millis = total_ms % 1000;
        write!(f, "{minutes}:{seconds:02}.{millis:03}")
    }
}

/// Session lifecycle states reported by the telemetry provider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Off,
    Replay,
    Live,
    Pause,
}

impl SessionState {
    pub fn is_live(&self) -> bool {
        matches!(self, SessionState::Live)
    }
}

/// A discrete session-state change, delivered on transition only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub previous: SessionState,
    pub current: SessionState,
}


#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn lap_time_display_is_ascii_and_single_line(millis in 0u64..=10_800_000) {
            let rendered = LapTime::from_millis(millis).to_string();
            prop_assert!(rendered.is_ascii());
            prop_assert!(!rendered.contains('\n'));
        }

        #[test]
        fn lap_time_display_round_trips_structure(millis in 1u64..=10_800_000) {
            let rendered = LapTime::from_millis(millis).to_string();
            // m:ss.mmm with two-digit seconds and three-digit millis.
            let (minutes, rest) = rendered
                .split_once(':')
                .ok_or_else(|| TestCaseError::fail("missing colon"))?;
            let (seconds, ms) = rest
                .split_once('.')
                .ok_or_else(|| TestCaseError::fail("missing dot"))?;
            prop_assert!(minutes.parse::<u64>().is_ok());
            prop_assert_eq!(seconds.len(), 2);
            prop_assert_eq!(ms.len(), 3);
        }
    }
}
