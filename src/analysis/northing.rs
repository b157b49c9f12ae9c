//! Yaw northing corrections.
//!
//! A nacelle yaw sensor that was mis-calibrated, or re-calibrated during the
//! campaign, reads with a constant offset from true north. Each correction
//! adds its offset to the turbine's yaw from its timestamp onward.

use crate::config::NorthingCorrection;
use crate::logging::{self, Stage};
use crate::math::wrap_360;
use crate::model::ScadaRecord;

/// Applies `corrections` in place and returns how many rows changed.
///
/// Corrections for the same turbine stack: a row after two corrections gets
/// the sum of both offsets.
pub fn apply_northing_corrections(
    rows: &mut [ScadaRecord],
    corrections: &[NorthingCorrection],
) -> usize {
    let mut sorted: Vec<&NorthingCorrection> = corrections.iter().collect();
    sorted.sort_by_key(|c| c.timestamp);

    let mut changed = 0;
    for row in rows.iter_mut() {
        let offset: f64 = sorted
            .iter()
            .filter(|c| c.turbine_name == row.turbine_name)
            .filter(|c| row.timestamp >= c.timestamp)
            .map(|c| c.offset_deg)
            .sum();
        if offset == 0.0 {
            continue;
        }
        let mut touched = false;
        let yaws = [
            &mut row.yaw_angle_mean,
            &mut row.yaw_angle_min,
            &mut row.yaw_angle_max,
        ];
        for v in yaws.into_iter().flatten() {
            *v = wrap_360(*v + offset);
            touched = true;
        }
        if touched {
            changed += 1;
        }
    }

    for c in &sorted {
        let message = format!(
            "applied northing offset {:.2} deg from {}",
            c.offset_deg, c.timestamp
        );
        logging::info(Stage::Filter, Some(&c.turbine_name), &message);
    }
    changed
}
