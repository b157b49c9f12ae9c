//! Assessment configuration.
//!
//! A `WindUpConfig` describes one uplift assessment: the wind farm asset, the
//! test and reference turbines, the analysis windows and, for toggle tests,
//! how the toggle signal is to be used. Configurations are written in TOML;
//! timestamps are RFC 3339 strings, e.g. `"2020-02-17T16:30:00Z"`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_TIMEBASE_S;
use crate::model::{Result, WindUpError};

// ---------------------------------------------------------------------------
// Turbines and asset
// ---------------------------------------------------------------------------

/// Model-level properties shared by all turbines of one type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurbineType {
    pub turbine_type: String,
    pub rotor_diameter_m: f64,
    pub rated_power_kw: f64,
    pub cutout_ws_mps: f64,
    /// Pitch angles (deg) seen in normal operation, `(min, max)`.
    pub normal_operation_pitch_range: (f64, f64),
    /// Generator speeds (RPM) seen in normal operation, `(min, max)`.
    pub normal_operation_genrpm_range: (f64, f64),
    pub rpm_v_pw_margin_factor: f64,
    pub pitch_to_stall: bool,
}

/// A wind turbine generator of the asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turbine {
    pub name: String,
    pub turbine_type: TurbineType,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    pub wtgs: Vec<Turbine>,
    #[serde(default)]
    pub masts_and_lidars: Vec<String>,
}

// ---------------------------------------------------------------------------
// Toggle settings
// ---------------------------------------------------------------------------

/// Which toggle state feeds the detrending step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetrendDataSelection {
    UseToggleOffData,
    UseToggleOnData,
    UseAllData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingFilterMethod {
    /// Keep a row only if a row of the opposite toggle state lies within
    /// `pairing_filter_timedelta_seconds`.
    AnyWithinTimedelta,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToggleConfig {
    pub toggle_file_per_turbine: bool,
    pub toggle_filename: String,
    pub detrend_data_selection: DetrendDataSelection,
    pub pairing_filter_method: PairingFilterMethod,
    #[serde(default)]
    pub pairing_filter_timedelta_seconds: u64,
    #[serde(default)]
    pub toggle_change_settling_filter_seconds: u64,
}

/// A step change of a turbine's yaw northing from `timestamp` onward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NorthingCorrection {
    pub turbine_name: String,
    pub timestamp: DateTime<Utc>,
    pub offset_deg: f64,
}

// ---------------------------------------------------------------------------
// Assessment configuration
// ---------------------------------------------------------------------------

fn default_timebase_s() -> u32 {
    DEFAULT_TIMEBASE_S
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindUpConfig {
    pub assessment_name: String,
    #[serde(default = "default_timebase_s")]
    pub timebase_s: u32,
    pub require_ref_wake_free: bool,
    pub detrend_min_hours: f64,
    /// Reference wind direction sector `[from, to]` in degrees, if any.
    #[serde(default)]
    pub ref_wd_filter: Option<(f64, f64)>,
    pub filter_all_test_wtgs_together: bool,
    pub use_lt_distribution: bool,
    pub out_dir: PathBuf,
    /// Names of the turbines receiving the intervention.
    pub test_wtgs: Vec<String>,
    /// Names of the turbines used as references.
    pub ref_wtgs: Vec<String>,
    #[serde(default)]
    pub ref_super_wtgs: Vec<String>,
    #[serde(default)]
    pub non_wtg_ref_names: Vec<String>,
    pub analysis_first_dt_utc_start: DateTime<Utc>,
    pub upgrade_first_dt_utc_start: DateTime<Utc>,
    pub analysis_last_dt_utc_start: DateTime<Utc>,
    pub lt_first_dt_utc_start: DateTime<Utc>,
    pub lt_last_dt_utc_start: DateTime<Utc>,
    pub detrend_first_dt_utc_start: DateTime<Utc>,
    pub detrend_last_dt_utc_start: DateTime<Utc>,
    #[serde(default)]
    pub years_for_lt_distribution: u32,
    #[serde(default)]
    pub years_for_detrend: u32,
    pub ws_bin_width: f64,
    pub asset: Asset,
    #[serde(default)]
    pub northing_corrections_utc: Vec<NorthingCorrection>,
    #[serde(default)]
    pub toggle: Option<ToggleConfig>,
}

impl WindUpConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: WindUpConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "loading assessment config");
        Self::from_toml_str(&text)
    }

    pub fn is_toggle_test(&self) -> bool {
        self.toggle.is_some()
    }

    pub fn rows_per_hour(&self) -> f64 {
        3600.0 / self.timebase_s as f64
    }

    pub fn find_turbine(&self, name: &str) -> Option<&Turbine> {
        self.asset.wtgs.iter().find(|t| t.name == name)
    }

    pub fn test_turbines(&self) -> Vec<&Turbine> {
        self.test_wtgs.iter().filter_map(|n| self.find_turbine(n)).collect()
    }

    pub fn ref_turbines(&self) -> Vec<&Turbine> {
        self.ref_wtgs.iter().filter_map(|n| self.find_turbine(n)).collect()
    }

    /// Test turbine names followed by reference turbine names.
    pub fn all_test_and_ref_names(&self) -> Vec<&str> {
        self.test_wtgs
            .iter()
            .chain(self.ref_wtgs.iter())
            .map(String::as_str)
            .collect()
    }

    /// Distinct turbine types of the asset, in order of first appearance.
    pub fn list_unique_turbine_types(&self) -> Vec<&TurbineType> {
        let mut out: Vec<&TurbineType> = Vec::new();
        for wtg in &self.asset.wtgs {
            let name = &wtg.turbine_type.turbine_type;
            if !out.iter().any(|t| &t.turbine_type == name) {
                out.push(&wtg.turbine_type);
            }
        }
        out
    }

    pub fn list_turbine_ids_of_type(&self, ttype: &TurbineType) -> Vec<&str> {
        self.asset
            .wtgs
            .iter()
            .filter(|w| w.turbine_type.turbine_type == ttype.turbine_type)
            .map(|w| w.name.as_str())
            .collect()
    }

    /// Checks internal consistency. Called by the TOML loaders; call it
    /// yourself after building a config in code.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(WindUpError::InvalidConfig(msg));

        if self.asset.wtgs.is_empty() {
            return invalid(format!("asset '{}' has no turbines", self.asset.name));
        }
        let mut seen = std::collections::HashSet::new();
        for wtg in &self.asset.wtgs {
            if !seen.insert(wtg.name.as_str()) {
                return invalid(format!("duplicate turbine name '{}'", wtg.name));
            }
            validate_turbine_type(&wtg.turbine_type)?;
        }

        if self.test_wtgs.is_empty() {
            return invalid("at least one test turbine is required".into());
        }
        if self.ref_wtgs.is_empty() && self.non_wtg_ref_names.is_empty() {
            return invalid("at least one reference is required".into());
        }
        for name in self
            .test_wtgs
            .iter()
            .chain(&self.ref_wtgs)
            .chain(&self.ref_super_wtgs)
        {
            if self.find_turbine(name).is_none() {
                return Err(WindUpError::MissingTurbine(name.clone()));
            }
        }
        if let Some(both) = self.test_wtgs.iter().find(|t| self.ref_wtgs.contains(t)) {
            return invalid(format!("'{}' is both a test and a reference turbine", both));
        }

        if self.analysis_first_dt_utc_start > self.upgrade_first_dt_utc_start {
            return invalid("analysis window starts after the upgrade".into());
        }
        if self.upgrade_first_dt_utc_start > self.analysis_last_dt_utc_start {
            return invalid("upgrade starts after the analysis window ends".into());
        }
        if self.lt_first_dt_utc_start > self.lt_last_dt_utc_start {
            return invalid("long-term window starts after it ends".into());
        }
        if self.detrend_first_dt_utc_start > self.detrend_last_dt_utc_start {
            return invalid("detrend window starts after it ends".into());
        }

        let w = self.ws_bin_width;
        if !is_positive(w) {
            return invalid(format!("ws_bin_width must be positive, got {}", w));
        }
        if self.timebase_s == 0 {
            return invalid("timebase_s must be positive".into());
        }
        if self.detrend_min_hours < 0.0 {
            return invalid("detrend_min_hours must not be negative".into());
        }
        if let Some((from, to)) = self.ref_wd_filter {
            for d in [from, to] {
                if !(0.0..=360.0).contains(&d) {
                    return invalid(format!("ref_wd_filter direction {} outside [0, 360]", d));
                }
            }
        }

        for nc in &self.northing_corrections_utc {
            if self.find_turbine(&nc.turbine_name).is_none() {
                return Err(WindUpError::MissingTurbine(nc.turbine_name.clone()));
            }
        }

        if let Some(toggle) = &self.toggle {
            let pairing = toggle.pairing_filter_method == PairingFilterMethod::AnyWithinTimedelta;
            if pairing && toggle.pairing_filter_timedelta_seconds == 0 {
                return invalid("pairing needs a positive timedelta".into());
            }
            if toggle.toggle_filename.trim().is_empty() {
                return invalid("toggle_filename must not be empty".into());
            }
        }

        Ok(())
    }
}

/// False for NaN.
fn is_positive(v: f64) -> bool {
    v > 0.0
}

/// False if either bound is NaN.
fn is_ordered(min: f64, max: f64) -> bool {
    min < max
}

fn validate_turbine_type(tt: &TurbineType) -> Result<()> {
    let name = &tt.turbine_type;
    let invalid = |what: &str| Err(WindUpError::InvalidConfig(format!("{}: {}", name, what)));

    if !is_positive(tt.rated_power_kw) {
        return invalid("rated_power_kw must be positive");
    }
    if !is_positive(tt.rotor_diameter_m) {
        return invalid("rotor_diameter_m must be positive");
    }
    if !is_positive(tt.cutout_ws_mps) {
        return invalid("cutout_ws_mps must be positive");
    }
    let (pmin, pmax) = tt.normal_operation_pitch_range;
    if !is_ordered(pmin, pmax) {
        return invalid("pitch range must satisfy min < max");
    }
    let (rmin, rmax) = tt.normal_operation_genrpm_range;
    if !is_ordered(rmin, rmax) {
        return invalid("genrpm range must satisfy min < max");
    }
    if tt.rpm_v_pw_margin_factor < 0.0 {
        return invalid("rpm_v_pw_margin_factor must not be negative");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Plot output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotConfig {
    pub show_plots: bool,
    pub save_plots: bool,
    pub plots_dir: PathBuf,
    #[serde(default)]
    pub skip_per_turbine_plots: bool,
}

impl PlotConfig {
    /// Save-only plot output under `<out_dir>/plots`.
    pub fn for_out_dir(out_dir: &Path) -> Self {
        Self {
            show_plots: false,
            save_plots: true,
            plots_dir: out_dir.join("plots"),
            skip_per_turbine_plots: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SMARTEOLE_TOML: &str = r#"
assessment_name = "smarteole_example"
require_ref_wake_free = true
detrend_min_hours = 12
ref_wd_filter = [197.0, 246.0]
filter_all_test_wtgs_together = true
use_lt_distribution = false
out_dir = "output/smarteole_example"
test_wtgs = ["SMV6", "SMV5"]
ref_wtgs = ["SMV7"]
analysis_first_dt_utc_start = "2020-02-17T16:30:00Z"
upgrade_first_dt_utc_start = "2020-02-17T16:30:00Z"
analysis_last_dt_utc_start = "2020-05-24T23:50:00Z"
lt_first_dt_utc_start = "2020-02-17T16:30:00Z"
lt_last_dt_utc_start = "2020-05-24T23:50:00Z"
detrend_first_dt_utc_start = "2020-02-17T16:30:00Z"
detrend_last_dt_utc_start = "2020-05-24T23:50:00Z"
ws_bin_width = 1.0

[toggle]
toggle_file_per_turbine = false
toggle_filename = "SMV_offset_active_toggle_df.parquet"
detrend_data_selection = "use_toggle_off_data"
pairing_filter_method = "any_within_timedelta"
pairing_filter_timedelta_seconds = 3600
toggle_change_settling_filter_seconds = 600

[[northing_corrections_utc]]
turbine_name = "SMV6"
timestamp = "2020-02-17T16:30:00Z"
offset_deg = 5.030130916842758

[asset]
name = "Sole du Moulin Vieux"

[[asset.wtgs]]
name = "SMV5"
[asset.wtgs.turbine_type]
turbine_type = "Senvion-MM82-2050"
rotor_diameter_m = 82.0
rated_power_kw = 2050.0
cutout_ws_mps = 25
normal_operation_pitch_range = [-10.0, 35.0]
normal_operation_genrpm_range = [250.0, 2000.0]
rpm_v_pw_margin_factor = 0.05
pitch_to_stall = false

[[asset.wtgs]]
name = "SMV6"
[asset.wtgs.turbine_type]
turbine_type = "Senvion-MM82-2050"
rotor_diameter_m = 82.0
rated_power_kw = 2050.0
cutout_ws_mps = 25
normal_operation_pitch_range = [-10.0, 35.0]
normal_operation_genrpm_range = [250.0, 2000.0]
rpm_v_pw_margin_factor = 0.05
pitch_to_stall = false

[[asset.wtgs]]
name = "SMV7"
[asset.wtgs.turbine_type]
turbine_type = "Senvion-MM82-2050"
rotor_diameter_m = 82.0
rated_power_kw = 2050.0
cutout_ws_mps = 25
normal_operation_pitch_range = [-10.0, 35.0]
normal_operation_genrpm_range = [250.0, 2000.0]
rpm_v_pw_margin_factor = 0.05
pitch_to_stall = false
"#;

    pub(crate) fn smarteole_cfg() -> WindUpConfig {
        WindUpConfig::from_toml_str(SMARTEOLE_TOML)
            .expect("example config should load")
    }

    #[test]
    fn test_example_config_loads() {
        let cfg = smarteole_cfg();
        assert_eq!(cfg.assessment_name, "smarteole_example");
        assert_eq!(cfg.timebase_s, 600);
        assert_eq!(cfg.ref_wd_filter, Some((197.0, 246.0)));
        assert!(cfg.is_toggle_test());
        assert_eq!(cfg.northing_corrections_utc.len(), 1);
        let toggle = cfg.toggle.as_ref().unwrap();
        assert_eq!(
            toggle.pairing_filter_method,
            PairingFilterMethod::AnyWithinTimedelta
        );
        assert_eq!(
            toggle.detrend_data_selection,
            DetrendDataSelection::UseToggleOffData
        );
    }

    #[test]
    fn test_rows_per_hour_follows_timebase() {
        let mut cfg = smarteole_cfg();
        assert_eq!(cfg.rows_per_hour(), 6.0);
        cfg.timebase_s = 60;
        assert_eq!(cfg.rows_per_hour(), 60.0);
    }

    #[test]
    fn test_unique_turbine_types_deduplicate_by_name() {
        let cfg = smarteole_cfg();
        let types = cfg.list_unique_turbine_types();
        assert_eq!(types.len(), 1);
        assert_eq!(
            cfg.list_turbine_ids_of_type(types[0]),
            vec!["SMV5", "SMV6", "SMV7"]
        );
    }

    #[test]
    fn test_test_and_ref_names_keep_order() {
        let cfg = smarteole_cfg();
        assert_eq!(cfg.all_test_and_ref_names(), vec!["SMV6", "SMV5", "SMV7"]);
    }

    #[test]
    fn test_unknown_test_turbine_rejected() {
        let mut cfg = smarteole_cfg();
        cfg.test_wtgs.push("SMV99".into());
        match cfg.validate() {
            Err(WindUpError::MissingTurbine(n)) => assert_eq!(n, "SMV99"),
            other => panic!("expected a missing turbine, got {:?}", other),
        }
    }

    #[test]
    fn test_turbine_both_test_and_ref_rejected() {
        let mut cfg = smarteole_cfg();
        cfg.ref_wtgs.push("SMV6".into());
        assert!(matches!(cfg.validate(), Err(WindUpError::InvalidConfig(_))));
    }

    #[test]
    fn test_upgrade_after_analysis_end_rejected() {
        let mut cfg = smarteole_cfg();
        cfg.upgrade_first_dt_utc_start = cfg.analysis_last_dt_utc_start + chrono::Duration::days(1);
        assert!(matches!(cfg.validate(), Err(WindUpError::InvalidConfig(_))));
    }

    #[test]
    fn test_non_positive_bin_width_rejected() {
        let mut cfg = smarteole_cfg();
        cfg.ws_bin_width = 0.0;
        assert!(cfg.validate().is_err());
        cfg.ws_bin_width = f64::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_wd_filter_outside_compass_rejected() {
        let mut cfg = smarteole_cfg();
        cfg.ref_wd_filter = Some((197.0, 400.0));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_inverted_pitch_range_rejected() {
        let mut cfg = smarteole_cfg();
        cfg.asset.wtgs[0].turbine_type.normal_operation_pitch_range = (35.0, -10.0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_pairing_filter_needs_timedelta() {
        let mut cfg = smarteole_cfg();
        let toggle = cfg.toggle.as_mut().unwrap();
        toggle.pairing_filter_timedelta_seconds = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_northing_for_unknown_turbine_rejected() {
        let mut cfg = smarteole_cfg();
        cfg.northing_corrections_utc[0].turbine_name = "XYZ".into();
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, WindUpError::MissingTurbine(_)));
    }

    #[test]
    fn test_malformed_toml_is_a_toml_error() {
        let result = WindUpConfig::from_toml_str("assessment_name = ");
        assert!(matches!(result, Err(WindUpError::Toml(_))));
    }

    #[test]
    fn test_plot_config_defaults_to_saving_under_out_dir() {
        let plot_cfg = PlotConfig::for_out_dir(Path::new("out"));
        assert!(plot_cfg.save_plots && !plot_cfg.show_plots);
        assert_eq!(plot_cfg.plots_dir, PathBuf::from("out/plots"));
    }
}
