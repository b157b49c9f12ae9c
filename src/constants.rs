//! Shared constants: canonical SCADA column names, physical constants and
//! the default project directory layout.

use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// SCADA columns
// ---------------------------------------------------------------------------

/// Canonical column names of the 10-minute turbine SCADA table.
///
/// Every ingest path maps its source fields onto these names; analysis code
/// only ever refers to columns through this type.
pub struct DataColumns;

impl DataColumns {
    pub const TURBINE_NAME: &'static str = "TurbineName";
    pub const ACTIVE_POWER_MEAN: &'static str = "ActivePowerMean";
    pub const ACTIVE_POWER_SD: &'static str = "ActivePowerSD";
    pub const WIND_SPEED_MEAN: &'static str = "WindSpeedMean";
    pub const WIND_SPEED_SD: &'static str = "WindSpeedSD";
    pub const YAW_ANGLE_MEAN: &'static str = "YawAngleMean";
    pub const YAW_ANGLE_MIN: &'static str = "YawAngleMin";
    pub const YAW_ANGLE_MAX: &'static str = "YawAngleMax";
    pub const PITCH_ANGLE_MEAN: &'static str = "PitchAngleMean";
    pub const GEN_RPM_MEAN: &'static str = "GenRpmMean";
    pub const AMBIENT_TEMP: &'static str = "AmbientTemp";
    pub const SHUTDOWN_DURATION: &'static str = "ShutdownDuration";

    /// All columns in table order, turbine name first.
    pub fn all() -> [&'static str; 12] {
        [
            Self::TURBINE_NAME,
            Self::ACTIVE_POWER_MEAN,
            Self::ACTIVE_POWER_SD,
            Self::WIND_SPEED_MEAN,
            Self::WIND_SPEED_SD,
            Self::YAW_ANGLE_MEAN,
            Self::YAW_ANGLE_MIN,
            Self::YAW_ANGLE_MAX,
            Self::PITCH_ANGLE_MEAN,
            Self::GEN_RPM_MEAN,
            Self::AMBIENT_TEMP,
            Self::SHUTDOWN_DURATION,
        ]
    }

    /// The numeric columns, i.e. everything except the turbine name.
    pub fn numeric() -> [&'static str; 11] {
        let all = Self::all();
        std::array::from_fn(|i| all[i + 1])
    }
}

// ---------------------------------------------------------------------------
// Physical and analysis constants
// ---------------------------------------------------------------------------

pub const HOURS_PER_YEAR: f64 = 8766.0;
pub const DEFAULT_AIR_DENSITY: f64 = 1.22;
pub const RANDOM_SEED: u64 = 0;

/// Default SCADA time base: 10-minute records.
pub const DEFAULT_TIMEBASE_S: u32 = 600;

pub const TIMESTAMP_COL: &str = "TimeStamp_StartFormat";
pub const RAW_WINDSPEED_COL: &str = "raw_WindSpeedMean";
pub const RAW_POWER_COL: &str = "raw_ActivePowerMean";
pub const RAW_DOWNTIME_S_COL: &str = "raw_ShutdownDuration";
pub const RAW_YAWDIR_COL: &str = "raw_YawAngleMean";

pub const REANALYSIS_WS_COL: &str = "reanalysis_ws";
pub const REANALYSIS_WD_COL: &str = "reanalysis_wd";
pub const WINDFARM_YAWDIR_COL: &str = "wf_yawdir";

// ---------------------------------------------------------------------------
// Directory layout
// ---------------------------------------------------------------------------

/// Environment variable overriding the project root directory.
pub const PROJECT_ROOT_ENV: &str = "WIND_UP_PROJECT_ROOT";

/// Standard directory layout of a wind_up project.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDirs {
    pub root: PathBuf,
    pub config: PathBuf,
    pub turbine_data: PathBuf,
    pub reanalysis: PathBuf,
    pub toggle: PathBuf,
    pub output: PathBuf,
    pub cache: PathBuf,
}

impl ProjectDirs {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            config: root.join("config"),
            turbine_data: root.join("input_data").join("turbine_data"),
            reanalysis: root.join("input_data").join("reanalysis"),
            toggle: root.join("input_data").join("toggle"),
            output: root.join("output"),
            cache: root.join("cache"),
            root,
        }
    }

    /// Resolves the project root from `.env` / the environment, falling back
    /// to the current working directory.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        let root = std::env::var(PROJECT_ROOT_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));
        Self::new(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_columns_are_unique_and_start_with_turbine_name() {
        let cols = DataColumns::all();
        assert_eq!(cols[0], "TurbineName");
        let mut seen = std::collections::HashSet::new();
        for c in cols {
            assert!(seen.insert(c), "duplicate column '{}'", c);
        }
    }

    #[test]
    fn test_numeric_columns_exclude_turbine_name() {
        assert!(!DataColumns::numeric().contains(&DataColumns::TURBINE_NAME));
        assert_eq!(DataColumns::numeric().len(), DataColumns::all().len() - 1);
    }

    #[test]
    fn test_project_dirs_layout() {
        let dirs = ProjectDirs::new("/tmp/proj");
        let expected = PathBuf::from("/tmp/proj/input_data/turbine_data");
        assert_eq!(dirs.turbine_data, expected);
        assert_eq!(dirs.output, PathBuf::from("/tmp/proj/output"));
    }
}
