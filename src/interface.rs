//! Assembly of validated assessment inputs.
//!
//! `AssessmentInputs::from_cfg` takes the raw tables for a wind farm and
//! prepares them for an uplift estimator: coordinates from the metadata,
//! SCADA restricted to the analysis window with northing corrections and
//! operating-range filters applied, cleaned toggle states and the
//! reanalysis dataset nearest the farm.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Duration;

use crate::analysis::filters::{FilterOutcome, apply_standard_filters};
use crate::analysis::groupings::{rows_for_turbine, sort_by_turbine_and_time};
use crate::analysis::northing::apply_northing_corrections;
use crate::analysis::scada_stats::{
    calc_cf_by_turbine, capacity_factor_summary, data_coverage_by_turbine,
};
use crate::analysis::toggle::{
    fake_toggle_for_prepost, join_toggle, pairing_filter_any_within, split_on_off,
    toggle_change_settling_filter,
};
use crate::analysis::windspeed_drift::{DriftPoint, max_abs_drift, rolling_windspeed_diff};
use crate::config::{PairingFilterMethod, PlotConfig, WindUpConfig};
use crate::constants::DataColumns;
use crate::geo;
use crate::ingest::reanalysis::ReanalysisDataset;
use crate::logging::{self, Stage};
use crate::model::{Result, ScadaRecord, ToggleRecord, TurbineMetadata, WindUpError};
use crate::plots;

/// Trailing window of the wind speed drift check.
pub const DRIFT_WINDOW_DAYS: i64 = 30;

// ---------------------------------------------------------------------------
// Pre/post split
// ---------------------------------------------------------------------------

/// One turbine's rows before and after the intervention (toggle off and on
/// for a toggle test).
#[derive(Debug, Clone, PartialEq)]
pub struct PrePost {
    pub pre: Vec<ScadaRecord>,
    pub post: Vec<ScadaRecord>,
}

fn valid_rows(rows: &[ScadaRecord]) -> usize {
    rows.iter()
        .filter(|r| r.active_power_mean.is_some())
        .filter(|r| r.wind_speed_mean.is_some())
        .count()
}

impl PrePost {
    /// Hours with both power and wind speed, `(pre, post)`.
    pub fn valid_hours(&self, rows_per_hour: f64) -> (f64, f64) {
        (
            valid_rows(&self.pre) as f64 / rows_per_hour,
            valid_rows(&self.post) as f64 / rows_per_hour,
        )
    }
}

/// A reference turbine as seen from a test turbine.
#[derive(Debug, Clone, PartialEq)]
pub struct RefDistance {
    pub name: String,
    pub distance_m: f64,
    pub bearing_deg: f64,
}

// ---------------------------------------------------------------------------
// Assessment inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AssessmentInputs {
    pub cfg: WindUpConfig,
    pub plot_cfg: PlotConfig,
    /// Asset turbines only, sorted by turbine then time, filtered.
    pub scada: Vec<ScadaRecord>,
    pub metadata: Vec<TurbineMetadata>,
    /// Cleaned toggle states; `None` unless this is a toggle test.
    pub toggle: Option<Vec<ToggleRecord>>,
    /// Reanalysis dataset nearest the wind farm, if any were supplied.
    pub reanalysis: Option<ReanalysisDataset>,
    pub filter_outcomes: Vec<FilterOutcome>,
    pub cache_dir: PathBuf,
}

impl AssessmentInputs {
    pub fn from_cfg(
        mut cfg: WindUpConfig,
        plot_cfg: PlotConfig,
        toggle: Option<Vec<ToggleRecord>>,
        scada: Vec<ScadaRecord>,
        metadata: Vec<TurbineMetadata>,
        reanalysis_datasets: Vec<ReanalysisDataset>,
        cache_dir: &Path,
    ) -> Result<Self> {
        cfg.validate()?;
        logging::info(
            Stage::Config,
            None,
            &format!("preparing inputs for assessment '{}'", cfg.assessment_name),
        );
        if plot_cfg.show_plots {
            logging::warn(
                Stage::Report,
                None,
                "interactive plots are not supported; chart data is saved as CSV",
            );
        }

        let toggle = match (cfg.is_toggle_test(), toggle) {
            (true, None) => {
                return Err(WindUpError::InvalidConfig(
                    "toggle test configured but no toggle data supplied".into(),
                ));
            }
            (false, Some(_)) => {
                logging::warn(
                    Stage::Toggle,
                    None,
                    "toggle data ignored for a pre/post assessment",
                );
                None
            }
            (_, toggle) => toggle,
        };

        copy_coordinates(&mut cfg, &metadata)?;
        let mut scada = check_and_restrict_scada(&cfg, scada)?;

        let coverage = data_coverage_by_turbine(&scada);
        plots::plot_data_coverage_heatmap(&coverage, "data coverage before filtering", &plot_cfg)?;
        plots::plot_ops_curves_per_ttype(&cfg, &scada, "before filtering", &plot_cfg)?;

        let corrected = apply_northing_corrections(&mut scada, &cfg.northing_corrections_utc);
        logging::info(
            Stage::Filter,
            None,
            &format!("northing corrections changed {} rows", corrected),
        );
        let filter_outcomes = apply_standard_filters(&mut scada, &cfg)?;

        let coverage = data_coverage_by_turbine(&scada);
        plots::plot_data_coverage_heatmap(&coverage, "data coverage after filtering", &plot_cfg)?;
        plots::plot_ops_curves_per_ttype(&cfg, &scada, "after filtering", &plot_cfg)?;

        let cfs = calc_cf_by_turbine(&scada, &cfg);
        capacity_factor_summary(&cfs)?;
        plots::plot_capacity_factor(&cfs, &cfg, &plot_cfg)?;

        let toggle = toggle.map(|t| clean_toggle(&cfg, t));

        let reanalysis = nearest_reanalysis(&cfg, reanalysis_datasets)?;

        let inputs = Self {
            cfg,
            plot_cfg,
            scada,
            metadata,
            toggle,
            reanalysis,
            filter_outcomes,
            cache_dir: cache_dir.to_path_buf(),
        };
        inputs.check_windspeed_drift()?;
        inputs.plot_pre_post()?;
        inputs.log_summary();
        Ok(inputs)
    }

    fn require_asset_turbine(&self, turbine: &str) -> Result<()> {
        match self.cfg.find_turbine(turbine) {
            Some(_) => Ok(()),
            None => Err(WindUpError::MissingTurbine(turbine.to_string())),
        }
    }

    /// Splits one turbine's rows into pre and post. Toggle tests split on
    /// the toggle state; rows with an uncertain state are in neither.
    pub fn pre_post_split(&self, turbine: &str) -> Result<PrePost> {
        self.require_asset_turbine(turbine)?;
        let rows: Vec<ScadaRecord> = rows_for_turbine(&self.scada, turbine)
            .into_iter()
            .cloned()
            .collect();

        let toggle = match &self.toggle {
            Some(t) => t.clone(),
            None => {
                let upgrade = self.cfg.upgrade_first_dt_utc_start;
                let (pre, post): (Vec<ScadaRecord>, Vec<ScadaRecord>) =
                    rows.iter().cloned().partition(|r| r.timestamp < upgrade);
                fake_toggle_for_prepost(&pre, &post)
            }
        };
        let joined = join_toggle(&rows, &toggle);
        let (off, on) = split_on_off(&joined);
        Ok(PrePost {
            pre: off.into_iter().cloned().collect(),
            post: on.into_iter().cloned().collect(),
        })
    }

    /// Reference turbines of the assessment, nearest first.
    pub fn references_by_distance(&self, test: &str) -> Result<Vec<RefDistance>> {
        let (lat, lon) = self.coordinates(test)?;
        let mut refs = Vec::new();
        for name in self.cfg.ref_wtgs.iter().filter(|r| *r != test) {
            let (rlat, rlon) = self.coordinates(name)?;
            refs.push(RefDistance {
                name: name.clone(),
                distance_m: geo::distance_m(lat, lon, rlat, rlon),
                bearing_deg: geo::bearing_deg(lat, lon, rlat, rlon),
            });
        }
        refs.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
        Ok(refs)
    }

    fn coordinates(&self, turbine: &str) -> Result<(f64, f64)> {
        let wtg = self
            .cfg
            .find_turbine(turbine)
            .ok_or_else(|| WindUpError::MissingTurbine(turbine.to_string()))?;
        let missing = || WindUpError::InvalidConfig(format!("{} has no coordinates", turbine));
        wtg.latitude.zip(wtg.longitude).ok_or_else(missing)
    }

    /// Rolling turbine minus reanalysis wind speed for one turbine.
    pub fn windspeed_drift(&self, turbine: &str) -> Result<Vec<DriftPoint>> {
        self.require_asset_turbine(turbine)?;
        let reanalysis = self
            .reanalysis
            .as_ref()
            .ok_or_else(|| WindUpError::EmptyData("no reanalysis dataset".into()))?;
        let rows = rows_for_turbine(&self.scada, turbine);
        let window_rows = (DRIFT_WINDOW_DAYS as f64 * 24.0 * self.cfg.rows_per_hour()) as usize;
        rolling_windspeed_diff(&rows, reanalysis, window_rows, window_rows / 3)
    }

    fn check_windspeed_drift(&self) -> Result<()> {
        if self.reanalysis.is_none() {
            logging::warn(
                Stage::Report,
                None,
                "no reanalysis data; wind speed drift not checked",
            );
            return Ok(());
        }
        for name in self.cfg.all_test_and_ref_names() {
            let points = self.windspeed_drift(name)?;
            match max_abs_drift(&points) {
                Some(d) => {
                    let msg = format!("max abs rolling wind speed diff {:.2} m/s", d);
                    logging::info(Stage::Report, Some(name), &msg);
                }
                None => logging::warn(Stage::Report, Some(name), "too little data for drift"),
            }
            if !self.plot_cfg.skip_per_turbine_plots {
                plots::plot_rolling_windspeed_diff_one_wtg(
                    &points,
                    name,
                    DataColumns::WIND_SPEED_MEAN,
                    &self.plot_cfg,
                )?;
            }
        }
        Ok(())
    }

    fn plot_pre_post(&self) -> Result<()> {
        for test in &self.cfg.test_wtgs {
            let split = self.pre_post_split(test)?;
            let pre: Vec<&ScadaRecord> = split.pre.iter().collect();
            let post: Vec<&ScadaRecord> = split.post.iter().collect();
            plots::compare_ops_curves_pre_post(
                &pre,
                &post,
                test,
                &self.plot_cfg,
                self.cfg.is_toggle_test(),
            )?;
        }
        Ok(())
    }

    pub fn log_summary(&self) {
        let rows_per_hour = self.cfg.rows_per_hour();
        for name in self.cfg.all_test_and_ref_names() {
            let n = rows_for_turbine(&self.scada, name).len();
            let msg = match self.pre_post_split(name) {
                Ok(split) => {
                    let (pre_h, post_h) = split.valid_hours(rows_per_hour);
                    format!(
                        "{} rows, valid hours pre {:.1}, post {:.1}",
                        n, pre_h, post_h
                    )
                }
                Err(e) => format!("{} rows, no pre/post split: {}", n, e),
            };
            logging::info(Stage::Report, Some(name), &msg);
        }
        if let Some(toggle) = &self.toggle {
            let on = toggle.iter().filter(|t| t.toggle_on).count();
            let off = toggle.iter().filter(|t| t.toggle_off).count();
            logging::info(
                Stage::Toggle,
                None,
                &format!("{} toggle on and {} toggle off intervals", on, off),
            );
        }
        if let Some(re) = &self.reanalysis {
            logging::info(Stage::Report, None, &format!("using reanalysis {}", re.id));
        }
    }
}

// ---------------------------------------------------------------------------
// Preparation steps
// ---------------------------------------------------------------------------

fn copy_coordinates(cfg: &mut WindUpConfig, metadata: &[TurbineMetadata]) -> Result<()> {
    let by_name: BTreeMap<&str, &TurbineMetadata> =
        metadata.iter().map(|m| (m.name.as_str(), m)).collect();
    for wtg in &mut cfg.asset.wtgs {
        let missing = || WindUpError::MissingTurbine(format!("{} (metadata)", wtg.name));
        let md = by_name.get(wtg.name.as_str()).ok_or_else(missing)?;
        wtg.latitude = Some(md.latitude);
        wtg.longitude = Some(md.longitude);
    }
    Ok(())
}

/// Keeps asset turbines inside the analysis window. Test and reference
/// turbines must have data there; other turbines only warn.
fn check_and_restrict_scada(
    cfg: &WindUpConfig,
    scada: Vec<ScadaRecord>,
) -> Result<Vec<ScadaRecord>> {
    let total = scada.len();
    let first = cfg.analysis_first_dt_utc_start;
    let last = cfg.analysis_last_dt_utc_start;
    let mut rows: Vec<ScadaRecord> = scada
        .into_iter()
        .filter(|r| cfg.find_turbine(&r.turbine_name).is_some())
        .filter(|r| r.timestamp >= first && r.timestamp <= last)
        .collect();
    sort_by_turbine_and_time(&mut rows);
    let kept = rows.len();
    let message = format!(
        "kept {} of {} SCADA rows in the analysis window",
        kept, total
    );
    logging::debug(Stage::Ingest, None, &message);

    let required = cfg.all_test_and_ref_names();
    let mut ok = 0;
    let mut failed = 0;
    for wtg in &cfg.asset.wtgs {
        let has_data = rows
            .iter()
            .any(|r| r.turbine_name == wtg.name && !r.is_all_na());
        if has_data {
            ok += 1;
            continue;
        }
        failed += 1;
        let err = WindUpError::EmptyData(format!(
            "{} has no SCADA data in the analysis window",
            wtg.name
        ));
        if required.contains(&wtg.name.as_str()) {
            logging::log_failure(Stage::Ingest, Some(&wtg.name), "SCADA check", &err);
            logging::log_step_summary(Stage::Ingest, "SCADA check", ok + failed, ok, failed);
            return Err(err);
        }
        logging::warn(Stage::Ingest, Some(&wtg.name), &err.to_string());
    }
    let n_wtgs = cfg.asset.wtgs.len();
    logging::log_step_summary(Stage::Ingest, "SCADA check", n_wtgs, ok, failed);
    Ok(rows)
}

fn clean_toggle(cfg: &WindUpConfig, mut toggle: Vec<ToggleRecord>) -> Vec<ToggleRecord> {
    toggle.sort_by_key(|t| t.timestamp);
    let first = cfg.analysis_first_dt_utc_start;
    let last = cfg.analysis_last_dt_utc_start + Duration::seconds(cfg.timebase_s as i64);
    toggle.retain(|t| (first..last).contains(&t.timestamp));

    let Some(tcfg) = &cfg.toggle else {
        return toggle;
    };
    let settling_s = tcfg.toggle_change_settling_filter_seconds;
    let settled = toggle_change_settling_filter(&mut toggle, settling_s);
    logging::info(
        Stage::Toggle,
        None,
        &format!("toggle settling filter cleared {} intervals", settled),
    );
    if tcfg.pairing_filter_method == PairingFilterMethod::AnyWithinTimedelta {
        let within_s = tcfg.pairing_filter_timedelta_seconds;
        let unpaired = pairing_filter_any_within(&mut toggle, within_s);
        logging::info(
            Stage::Toggle,
            None,
            &format!("toggle pairing filter cleared {} intervals", unpaired),
        );
    }
    toggle
}

/// The dataset whose grid point is nearest the centroid of the asset.
fn nearest_reanalysis(
    cfg: &WindUpConfig,
    datasets: Vec<ReanalysisDataset>,
) -> Result<Option<ReanalysisDataset>> {
    if datasets.is_empty() {
        return Ok(None);
    }
    let points: Vec<(f64, f64)> = cfg
        .asset
        .wtgs
        .iter()
        .filter_map(|w| w.latitude.zip(w.longitude))
        .collect();
    let missing = || WindUpError::InvalidConfig("asset has no coordinates".into());
    let (lat, lon) = geo::centroid(&points).ok_or_else(missing)?;

    let mut best: Option<(f64, ReanalysisDataset)> = None;
    for ds in datasets {
        let id = ds.parsed_id()?;
        let d = geo::distance_m(lat, lon, id.latitude, id.longitude);
        if best.as_ref().is_none_or(|(bd, _)| d < *bd) {
            best = Some((d, ds));
        }
    }
    Ok(best.map(|(d, ds)| {
        logging::info(
            Stage::Ingest,
            None,
            &format!("{} is nearest the wind farm ({:.1} km)", ds.id, d / 1000.0),
        );
        ds
    }))
}
