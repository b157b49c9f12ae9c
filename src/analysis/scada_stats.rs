//! Data coverage and capacity factor per turbine.

use crate::analysis::groupings::group_by_turbine;
use crate::config::WindUpConfig;
use crate::logging::{self, Stage};
use crate::math::round_dp;
use crate::model::{Result, ScadaRecord, WindUpError};
use crate::report::{TableStyle, render_table};

// ---------------------------------------------------------------------------
// Data coverage
// ---------------------------------------------------------------------------

/// Fraction of rows with a value, per signal, for one turbine.
#[derive(Debug, Clone, PartialEq)]
pub struct DataCoverage {
    pub turbine: String,
    pub rows: usize,
    pub power: f64,
    pub windspeed: f64,
    pub yaw: f64,
    pub rpm: f64,
    pub pitch: f64,
}

fn coverage(rows: &[&ScadaRecord], get: impl Fn(&ScadaRecord) -> Option<f64>) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    let present = rows.iter().filter(|r| get(r).is_some()).count();
    present as f64 / rows.len() as f64
}

pub fn data_coverage_by_turbine(rows: &[ScadaRecord]) -> Vec<DataCoverage> {
    group_by_turbine(rows)
        .into_iter()
        .map(|(name, rows)| DataCoverage {
            turbine: name.to_string(),
            rows: rows.len(),
            power: coverage(&rows, |r| r.active_power_mean),
            windspeed: coverage(&rows, |r| r.wind_speed_mean),
            yaw: coverage(&rows, |r| r.yaw_angle_mean),
            rpm: coverage(&rows, |r| r.gen_rpm_mean),
            pitch: coverage(&rows, |r| r.pitch_angle_mean),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Capacity factor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CapacityFactor {
    pub turbine: String,
    pub hours: f64,
    pub mwh: f64,
    pub rated_power_kw: f64,
    /// `None` when the turbine has no rows.
    pub cf: Option<f64>,
}

/// Capacity factor of every asset turbine present in `rows`.
///
/// Hours count every row, NA or not, so missing power lowers the CF.
/// Rows of turbines outside the asset are ignored.
pub fn calc_cf_by_turbine(rows: &[ScadaRecord], cfg: &WindUpConfig) -> Vec<CapacityFactor> {
    let rows_per_hour = cfg.rows_per_hour();
    group_by_turbine(rows)
        .into_iter()
        .filter_map(|(name, rows)| {
            let wtg = cfg.find_turbine(name)?;
            let rated = wtg.turbine_type.rated_power_kw;
            let hours = rows.len() as f64 / rows_per_hour;
            let kw_sum: f64 = rows.iter().filter_map(|r| r.active_power_mean).sum();
            let mwh = kw_sum / rows_per_hour / 1000.0;
            let cf = (hours > 0.0).then(|| mwh / (hours * rated / 1000.0));
            Some(CapacityFactor {
                turbine: name.to_string(),
                hours,
                mwh,
                rated_power_kw: rated,
                cf,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct CapacityFactorSummary {
    pub mean_cf: f64,
    pub top: Vec<CapacityFactor>,
    pub bottom: Vec<CapacityFactor>,
}

/// Mean CF and the three highest and lowest turbines, logged as tables.
pub fn capacity_factor_summary(cfs: &[CapacityFactor]) -> Result<CapacityFactorSummary> {
    let mut ranked: Vec<CapacityFactor> = cfs.iter().filter(|c| c.cf.is_some()).cloned().collect();
    if ranked.is_empty() {
        return Err(WindUpError::EmptyData("no capacity factors".into()));
    }
    let cf = |c: &CapacityFactor| c.cf.unwrap_or(f64::NAN);
    ranked.sort_by(|a, b| cf(b).total_cmp(&cf(a)));

    let mean_cf = ranked.iter().filter_map(|c| c.cf).sum::<f64>() / ranked.len() as f64;
    let top: Vec<CapacityFactor> = ranked.iter().take(3).cloned().collect();
    let bottom: Vec<CapacityFactor> = ranked.iter().rev().take(3).cloned().collect();

    let mean_msg = format!("mean capacity factor {:.1}%", mean_cf * 100.0);
    logging::info(Stage::Report, None, &mean_msg);
    let top_msg = format!("top 3 turbines by CF:\n{}", cf_table(&top));
    logging::info(Stage::Report, None, &top_msg);
    let bottom_msg = format!("bottom 3 turbines by CF:\n{}", cf_table(&bottom));
    logging::info(Stage::Report, None, &bottom_msg);

    Ok(CapacityFactorSummary {
        mean_cf,
        top,
        bottom,
    })
}

fn cf_table(cfs: &[CapacityFactor]) -> String {
    let rows: Vec<Vec<String>> = cfs
        .iter()
        .map(|c| {
            vec![
                c.turbine.clone(),
                format!("{:.1}", c.hours),
                format!("{:.1}", c.mwh),
                format!("{:.1}", round_dp(c.cf.unwrap_or(f64::NAN) * 100.0, 1)),
            ]
        })
        .collect();
    let headers = ["turbine", "hours", "MWh", "CF %"];
    render_table(&headers, &rows, TableStyle::Outline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::smarteole_cfg;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 3, 1, 0, 0, 0).unwrap()
    }

    fn rows(name: &str, powers: &[Option<f64>]) -> Vec<ScadaRecord> {
        powers
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let mut r = ScadaRecord::empty(name, t0() + Duration::minutes(10 * i as i64));
                r.active_power_mean = *p;
                r.wind_speed_mean = p.map(|_| 8.0);
                r
            })
            .collect()
    }

    #[test]
    fn test_coverage_counts_present_values() {
        let mut data = rows("SMV5", &[Some(100.0), None, Some(300.0), None]);
        data[0].yaw_angle_mean = Some(10.0);
        let cov = data_coverage_by_turbine(&data);
        assert_eq!(cov.len(), 1);
        assert_eq!(cov[0].rows, 4);
        assert_eq!(cov[0].power, 0.5);
        assert_eq!(cov[0].windspeed, 0.5);
        assert_eq!(cov[0].yaw, 0.25);
        assert_eq!(cov[0].pitch, 0.0);
    }

    #[test]
    fn test_cf_for_one_hour_at_half_rated() {
        let cfg = smarteole_cfg();
        let data = rows("SMV5", &[Some(1025.0); 6]);
        let cfs = calc_cf_by_turbine(&data, &cfg);
        assert_eq!(cfs.len(), 1);
        assert!((cfs[0].hours - 1.0).abs() < 1e-12);
        assert!((cfs[0].mwh - 1.025).abs() < 1e-12);
        assert!((cfs[0].cf.unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_missing_power_lowers_cf_and_unknown_turbines_skipped() {
        let cfg = smarteole_cfg();
        let mut data = rows("SMV6", &[Some(2050.0), None]);
        data.extend(rows("OTHER", &[Some(1.0)]));
        let cfs = calc_cf_by_turbine(&data, &cfg);
        assert_eq!(cfs.len(), 1);
        assert!((cfs[0].cf.unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_summary_ranks_turbines() {
        let cf = |name: &str, v: f64| CapacityFactor {
            turbine: name.into(),
            hours: 10.0,
            mwh: 1.0,
            rated_power_kw: 2050.0,
            cf: Some(v),
        };
        let cfs = vec![
            cf("A", 0.2),
            cf("B", 0.4),
            cf("C", 0.1),
            cf("D", 0.3),
            cf("E", 0.5),
        ];
        let summary = capacity_factor_summary(&cfs).unwrap();
        assert!((summary.mean_cf - 0.3).abs() < 1e-12);
        let top: Vec<_> = summary.top.iter().map(|c| c.turbine.as_str()).collect();
        let bottom: Vec<_> = summary.bottom.iter().map(|c| c.turbine.as_str()).collect();
        assert_eq!(top, vec!["E", "B", "D"]);
        assert_eq!(bottom, vec!["C", "A", "D"]);
    }

    #[test]
    fn test_summary_of_nothing_is_empty_data() {
        let summary = capacity_factor_summary(&[]);
        assert!(matches!(summary, Err(WindUpError::EmptyData(_))));
    }
}
