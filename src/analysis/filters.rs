//! Operating-range filters.
//!
//! Each filter sets values to NA in place rather than dropping rows, so the
//! 10-minute grid stays intact for pairing with reference turbines. Every
//! filter reports how many rows it touched.

use crate::config::{TurbineType, WindUpConfig};
use crate::logging::{self, Stage};
use crate::model::{Result, ScadaRecord, WindUpError};

/// Rows touched by one filter run.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub name: String,
    pub na_rows: usize,
    pub total_rows: usize,
    pub message: String,
}

/// Builds the log line for a filter run, e.g.
/// `"filter_downtime set 3 rows [1.5%] to NA because of ShutdownDuration > 0"`.
///
/// `just_min_max` only applies together with `just_yaw`.
pub fn filter_stats_message(
    name: &str,
    na_rows: usize,
    total_rows: usize,
    just_yaw: bool,
    just_min_max: bool,
    reason: &str,
) -> String {
    let pct = if total_rows == 0 {
        0.0
    } else {
        100.0 * na_rows as f64 / total_rows as f64
    };
    let what = match (just_yaw, just_min_max) {
        (true, true) => " yaw Min & Max",
        (true, false) => " yaw",
        _ => "",
    };
    let reason = if reason.is_empty() {
        String::new()
    } else {
        format!(" because of {}", reason)
    };
    format!(
        "{} set {} rows [{:.1}%] to NA{}{}",
        name, na_rows, pct, what, reason
    )
}

pub fn print_filter_stats(outcome: &FilterOutcome, turbine: Option<&str>) {
    logging::info(Stage::Filter, turbine, &outcome.message);
}

fn outcome(
    name: &str,
    na_rows: usize,
    total_rows: usize,
    just_yaw: bool,
    just_min_max: bool,
    reason: &str,
) -> FilterOutcome {
    FilterOutcome {
        name: name.to_string(),
        na_rows,
        total_rows,
        message: filter_stats_message(name, na_rows, total_rows, just_yaw, just_min_max, reason),
    }
}

/// Blanks every row matching `pred` that still holds data.
fn blank_rows_where(
    rows: &mut [&mut ScadaRecord],
    name: &str,
    reason: &str,
    pred: impl Fn(&ScadaRecord) -> bool,
) -> FilterOutcome {
    let mut na_rows = 0;
    for row in rows.iter_mut() {
        if pred(row) && !row.is_all_na() {
            row.set_all_na();
            na_rows += 1;
        }
    }
    outcome(name, na_rows, rows.len(), false, false, reason)
}

fn outside(value: Option<f64>, (lo, hi): (f64, f64)) -> bool {
    value.is_some_and(|v| v < lo || v > hi)
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Blanks rows where the turbine reported any shutdown time.
pub fn filter_downtime(rows: &mut [&mut ScadaRecord]) -> FilterOutcome {
    blank_rows_where(rows, "filter_downtime", "ShutdownDuration > 0", |r| {
        r.shutdown_duration.is_some_and(|d| d > 0.0)
    })
}

pub fn filter_pitch_out_of_range(rows: &mut [&mut ScadaRecord], tt: &TurbineType) -> FilterOutcome {
    let range = tt.normal_operation_pitch_range;
    let reason = format!("pitch outside [{}, {}]", range.0, range.1);
    blank_rows_where(rows, "filter_pitch_out_of_range", &reason, |r| {
        outside(r.pitch_angle_mean, range)
    })
}

pub fn filter_rpm_out_of_range(rows: &mut [&mut ScadaRecord], tt: &TurbineType) -> FilterOutcome {
    let range = tt.normal_operation_genrpm_range;
    let reason = format!("gen rpm outside [{}, {}]", range.0, range.1);
    blank_rows_where(rows, "filter_rpm_out_of_range", &reason, |r| {
        outside(r.gen_rpm_mean, range)
    })
}

pub fn filter_wind_speed_above_cutout(
    rows: &mut [&mut ScadaRecord],
    tt: &TurbineType,
) -> FilterOutcome {
    let cutout = tt.cutout_ws_mps;
    let reason = format!("wind speed above {} m/s", cutout);
    blank_rows_where(rows, "filter_wind_speed_above_cutout", &reason, |r| {
        r.wind_speed_mean.is_some_and(|ws| ws > cutout)
    })
}

/// Yaw min and max are meaningless without a mean; blank them.
pub fn filter_missing_yaw_min_max(rows: &mut [&mut ScadaRecord]) -> FilterOutcome {
    let mut na_rows = 0;
    for row in rows.iter_mut() {
        if row.yaw_angle_mean.is_none()
            && (row.yaw_angle_min.is_some() || row.yaw_angle_max.is_some())
        {
            row.yaw_angle_min = None;
            row.yaw_angle_max = None;
            na_rows += 1;
        }
    }
    outcome(
        "filter_missing_yaw_min_max",
        na_rows,
        rows.len(),
        true,
        true,
        "YawAngleMean is NA",
    )
}

/// Runs every filter on every turbine, in a fixed order, and logs the
/// outcomes per turbine. Rows of turbines outside the asset are an error.
pub fn apply_standard_filters(
    rows: &mut [ScadaRecord],
    cfg: &WindUpConfig,
) -> Result<Vec<FilterOutcome>> {
    let unknown = |r: &&ScadaRecord| cfg.find_turbine(&r.turbine_name).is_none();
    if let Some(stray) = rows.iter().find(unknown) {
        return Err(WindUpError::MissingTurbine(stray.turbine_name.clone()));
    }

    let mut outcomes = Vec::new();
    for wtg in &cfg.asset.wtgs {
        let mut own: Vec<&mut ScadaRecord> = rows
            .iter_mut()
            .filter(|r| r.turbine_name == wtg.name)
            .collect();
        if own.is_empty() {
            continue;
        }
        let tt = &wtg.turbine_type;
        let results = [
            filter_downtime(&mut own),
            filter_wind_speed_above_cutout(&mut own, tt),
            filter_pitch_out_of_range(&mut own, tt),
            filter_rpm_out_of_range(&mut own, tt),
            filter_missing_yaw_min_max(&mut own),
        ];
        for result in results {
            print_filter_stats(&result, Some(&wtg.name));
            outcomes.push(result);
        }
    }
    Ok(outcomes)
}
