/// Core data types for the wind_up assessment pipeline.
///
/// This module defines the shared domain model imported by all other modules:
/// SCADA records, turbine metadata, toggle states, reanalysis samples, uplift
/// results and the crate-wide error type. It contains no I/O.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::DataColumns;

// ---------------------------------------------------------------------------
// SCADA records
// ---------------------------------------------------------------------------

/// One 10-minute SCADA record for one turbine.
///
/// `timestamp` is the start of the averaging interval, in UTC. Every measured
/// quantity is optional; `None` plays the role of NA and is what the filters
/// write when they discard a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScadaRecord {
    pub timestamp: DateTime<Utc>,
    pub turbine_name: String,
    pub active_power_mean: Option<f64>,
    pub active_power_sd: Option<f64>,
    pub wind_speed_mean: Option<f64>,
    pub wind_speed_sd: Option<f64>,
    pub yaw_angle_mean: Option<f64>,
    pub yaw_angle_min: Option<f64>,
    pub yaw_angle_max: Option<f64>,
    pub pitch_angle_mean: Option<f64>,
    pub gen_rpm_mean: Option<f64>,
    pub ambient_temp: Option<f64>,
    pub shutdown_duration: Option<f64>,
}

impl ScadaRecord {
    /// An all-NA record for `turbine_name` at `timestamp`.
    pub fn empty(turbine_name: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            turbine_name: turbine_name.to_string(),
            active_power_mean: None,
            active_power_sd: None,
            wind_speed_mean: None,
            wind_speed_sd: None,
            yaw_angle_mean: None,
            yaw_angle_min: None,
            yaw_angle_max: None,
            pitch_angle_mean: None,
            gen_rpm_mean: None,
            ambient_temp: None,
            shutdown_duration: None,
        }
    }

    fn slot(&mut self, column: &str) -> Option<&mut Option<f64>> {
        match column {
            DataColumns::ACTIVE_POWER_MEAN => Some(&mut self.active_power_mean),
            DataColumns::ACTIVE_POWER_SD => Some(&mut self.active_power_sd),
            DataColumns::WIND_SPEED_MEAN => Some(&mut self.wind_speed_mean),
            DataColumns::WIND_SPEED_SD => Some(&mut self.wind_speed_sd),
            DataColumns::YAW_ANGLE_MEAN => Some(&mut self.yaw_angle_mean),
            DataColumns::YAW_ANGLE_MIN => Some(&mut self.yaw_angle_min),
            DataColumns::YAW_ANGLE_MAX => Some(&mut self.yaw_angle_max),
            DataColumns::PITCH_ANGLE_MEAN => Some(&mut self.pitch_angle_mean),
            DataColumns::GEN_RPM_MEAN => Some(&mut self.gen_rpm_mean),
            DataColumns::AMBIENT_TEMP => Some(&mut self.ambient_temp),
            DataColumns::SHUTDOWN_DURATION => Some(&mut self.shutdown_duration),
            _ => None,
        }
    }

    /// Reads a numeric column by its `DataColumns` name.
    ///
    /// Returns `Err` for the turbine name column or an unknown name.
    pub fn value(&self, column: &str) -> Result<Option<f64>> {
        let v = match column {
            DataColumns::ACTIVE_POWER_MEAN => self.active_power_mean,
            DataColumns::ACTIVE_POWER_SD => self.active_power_sd,
            DataColumns::WIND_SPEED_MEAN => self.wind_speed_mean,
            DataColumns::WIND_SPEED_SD => self.wind_speed_sd,
            DataColumns::YAW_ANGLE_MEAN => self.yaw_angle_mean,
            DataColumns::YAW_ANGLE_MIN => self.yaw_angle_min,
            DataColumns::YAW_ANGLE_MAX => self.yaw_angle_max,
            DataColumns::PITCH_ANGLE_MEAN => self.pitch_angle_mean,
            DataColumns::GEN_RPM_MEAN => self.gen_rpm_mean,
            DataColumns::AMBIENT_TEMP => self.ambient_temp,
            DataColumns::SHUTDOWN_DURATION => self.shutdown_duration,
            other => return Err(WindUpError::MissingColumn(other.to_string())),
        };
        Ok(v)
    }

    /// Writes a numeric column by its `DataColumns` name.
    pub fn set_value(&mut self, column: &str, value: Option<f64>) -> Result<()> {
        match self.slot(column) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(WindUpError::MissingColumn(column.to_string())),
        }
    }

    /// Sets every measured column to NA, keeping timestamp and turbine.
    pub fn set_all_na(&mut self) {
        for col in DataColumns::numeric() {
            if let Some(slot) = self.slot(col) {
                *slot = None;
            }
        }
    }

    /// True when every measured column is NA. `ShutdownDuration` is not a
    /// measurement and is ignored.
    pub fn is_all_na(&self) -> bool {
        DataColumns::numeric()
            .iter()
            .filter(|c| **c != DataColumns::SHUTDOWN_DURATION)
            .all(|c| matches!(self.value(c), Ok(None)))
    }
}

// ---------------------------------------------------------------------------
// Metadata, toggle and reanalysis
// ---------------------------------------------------------------------------

/// Static per-turbine metadata supplied alongside the SCADA table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurbineMetadata {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub time_zone: String,
    pub time_span_minutes: u32,
    pub time_format: String,
}

/// Intervention state for one 10-minute interval of a toggle test.
///
/// Both flags may be `false` when the state is uncertain (mixed or
/// insufficient control-log data); they are never both `true`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToggleRecord {
    pub timestamp: DateTime<Utc>,
    pub toggle_on: bool,
    pub toggle_off: bool,
}

/// One reanalysis sample (wind speed in m/s, direction in degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReanalysisRecord {
    pub timestamp: DateTime<Utc>,
    pub ws: Option<f64>,
    pub wd: Option<f64>,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Uplift result for one test turbine against one reference.
///
/// Fractions (`*_frc`) are unitless: `0.03` means a 3% uplift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpliftResult {
    pub test_wtg: String,
    #[serde(rename = "ref")]
    pub reference: String,
    pub uplift_frc: f64,
    pub unc_one_sigma_frc: f64,
    pub uplift_p95_frc: f64,
    pub uplift_p5_frc: f64,
    pub pp_valid_hours_pre: f64,
    pub pp_valid_hours_post: f64,
    pub mean_power_post: f64,
}

/// One-sided 95% quantile of the standard normal distribution.
pub const Z_P95: f64 = 1.644_853_626_951_472_2;

impl UpliftResult {
    /// Builds a result from a central estimate and its one-sigma
    /// uncertainty, deriving the P95 (exceeded with 95% probability) and P5
    /// bounds under a normal assumption.
    #[allow(clippy::too_many_arguments)]
    pub fn from_estimate(
        test_wtg: &str,
        reference: &str,
        uplift_frc: f64,
        unc_one_sigma_frc: f64,
        pp_valid_hours_pre: f64,
        pp_valid_hours_post: f64,
        mean_power_post: f64,
    ) -> Self {
        Self {
            test_wtg: test_wtg.to_string(),
            reference: reference.to_string(),
            uplift_frc,
            unc_one_sigma_frc,
            uplift_p95_frc: uplift_frc - Z_P95 * unc_one_sigma_frc,
            uplift_p5_frc: uplift_frc + Z_P95 * unc_one_sigma_frc,
            pp_valid_hours_pre,
            pp_valid_hours_post,
            mean_power_post,
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise while loading, preparing or reporting assessment data.
#[derive(Debug, thiserror::Error)]
pub enum WindUpError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
    /// Non-2xx HTTP response.
    #[error("HTTP error: {0}")]
    Http(u16),
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Turbine not found: {0}")]
    MissingTurbine(String),
    #[error("Column not found: {0}")]
    MissingColumn(String),
    #[error("No data available: {0}")]
    EmptyData(String),
    #[error("Results do not match expected: {0}")]
    ResultMismatch(String),
}

pub type Result<T> = std::result::Result<T, WindUpError>;
