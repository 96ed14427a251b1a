//! Snapshot-to-line formatting.
//!
//! The receiving device parses fixed-format ASCII, so every decimal
//! here must render with `.` regardless of host locale. Rust's float
//! `Display` is locale-invariant by construction and trims trailing
//! zeros (`0.90` renders as `0.9`), which is exactly the contract.

use gridlink_telemetry::{Graphics, Physics, StaticInfo};

pub fn static_info_line(snapshot: &StaticInfo) -> String {
    format!("Max RPM: {}", snapshot.max_rpm)
}

/// The three physics lines, in their fixed order: fuel, rpm (note the
/// double space, kept for the device's column alignment), tyre wear
/// FL/FR/RL/RR.
pub fn physics_lines(snapshot: &Physics) -> [String; 3] {
    let wear = snapshot
        .tyre_wear
        .map(|w| w.to_string())
        .join(", ");
    [
        format!("Fuel: {}", snapshot.fuel),
        format!("RPM:  {}", snapshot.rpms),
        format!("Tyre wear: {wear}"),
    ]
}

pub fn graphics_line(snapshot: &Graphics) -> String {
    format!("Best time: {}", snapshot.best_time)
}


#[cfg(test)]
mod proptest_tests {
    #![allow(clippy::indexing_slicing)]

    use super::*;
    use proptest::prelude::*;

    fn finite_f32() -> impl Strategy<Value = f32> {
        (-1_000_000.0f32..=1_000_000.0).prop_filter("finite", |v| v.is_finite())
    }

    proptest! {
        #[test]
        fn physics_lines_are_single_line_ascii_with_dot_decimals(
            fuel in finite_f32(),
            rpms in any::<u32>(),
            wear in proptest::array::uniform4(0.0f32..=1.0),
        ) {
            let lines = physics_lines(&Physics { fuel, rpms, tyre_wear: wear });
            for line in &lines {
                prop_assert!(line.is_ascii());
                prop_assert!(!line.contains('\n'));
            }
            // Only the wear line carries commas.
            prop_assert!(!lines[0].contains(','));
            prop_assert!(!lines[1].contains(','));
        }

        #[test]
        fn wear_line_always_has_four_fields(
            wear in proptest::array::uniform4(0.0f32..=1.0),
        ) {
            let lines = physics_lines(&Physics { fuel: 1.0, rpms: 1, tyre_wear: wear });
            let wear_line = &lines[2];
            prop_assert!(wear_line.starts_with("Tyre wear: "));
            prop_assert_eq!(wear_line.matches(", ").count(), 3);
        }
    }
}
