//! Anemometer drift against reanalysis.
//!
//! A nacelle anemometer that drifts over the campaign biases any uplift
//! estimate. The drift shows up as a trend in the rolling mean of the
//! turbine minus reanalysis wind speed.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::ingest::reanalysis::ReanalysisDataset;
use crate::model::{Result, ScadaRecord};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftPoint {
    pub timestamp: DateTime<Utc>,
    /// Turbine minus reanalysis wind speed, m/s.
    pub ws_diff: Option<f64>,
    /// Mean of `ws_diff` over the trailing window, NA below `min_periods`.
    pub rolling_windspeed_diff: Option<f64>,
}

/// Rolling mean of turbine minus reanalysis wind speed over the trailing
/// `window_rows` rows. `rows` must be one turbine's rows in time order.
///
/// Each row is matched to the reanalysis sample whose interval contains it.
pub fn rolling_windspeed_diff(
    rows: &[&ScadaRecord],
    reanalysis: &ReanalysisDataset,
    window_rows: usize,
    min_periods: usize,
) -> Result<Vec<DriftPoint>> {
    let timebase_s = reanalysis.parsed_id()?.timebase_seconds()?;
    let mut window: VecDeque<Option<f64>> = VecDeque::with_capacity(window_rows + 1);
    let mut sum = 0.0;
    let mut n = 0usize;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let re_ws = reanalysis
            .sample_for(row.timestamp, timebase_s)
            .and_then(|s| s.ws);
        let ws_diff = row.wind_speed_mean.zip(re_ws).map(|(w, re)| w - re);

        window.push_back(ws_diff);
        if let Some(d) = ws_diff {
            sum += d;
            n += 1;
        }
        if window.len() > window_rows
            && let Some(Some(old)) = window.pop_front()
        {
            sum -= old;
            n -= 1;
        }

        out.push(DriftPoint {
            timestamp: row.timestamp,
            ws_diff,
            rolling_windspeed_diff: (n > 0 && n >= min_periods).then(|| sum / n as f64),
        });
    }
    Ok(out)
}

/// Largest absolute rolling difference, if any.
pub fn max_abs_drift(points: &[DriftPoint]) -> Option<f64> {
    points
        .iter()
        .filter_map(|p| p.rolling_windspeed_diff)
        .map(f64::abs)
        .reduce(f64::max)
}
