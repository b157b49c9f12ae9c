//! SMARTEOLE wake-steering open dataset (Zenodo record 7342466).
//!
//! The published archive holds 1-minute SCADA statistics for the seven
//! Senvion MM82 turbines of Sole du Moulin Vieux (`SMV1`..`SMV7`), their
//! coordinates and the wake-steering controller log. This module turns those
//! files into the standard 10-minute tables.
//!
//! Source SCADA columns are wide: one column per turbine and statistic,
//! e.g. `active_power_1_avg` or `wind_speed_avg_1`.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::caching::with_json_cache;
use crate::ingest::resample::{Aggregation, Bucket, ResampledTable, Resampler};
use crate::ingest::{parse_optional_f64, parse_timestamp};
use crate::logging::{self, Stage};
use crate::model::{Result, ScadaRecord, ToggleRecord, TurbineMetadata, WindUpError};

pub const ZENODO_RECORD_ID: &str = "7342466";
pub const ZIP_FILENAME: &str = "SMARTEOLE-WFC-open-dataset.zip";
pub const SCADA_MEMBER: &str =
    "SMARTEOLE-WFC-open-dataset/SMARTEOLE_WakeSteering_SCADA_1minData.csv";
pub const METADATA_MEMBER: &str =
    "SMARTEOLE-WFC-open-dataset/SMARTEOLE_WakeSteering_Coordinates_staticData.csv";
pub const CONTROL_LOG_MEMBER: &str =
    "SMARTEOLE-WFC-open-dataset/SMARTEOLE_WakeSteering_ControlLog_1minData.csv";

/// Fraction of the 600 one-second samples a 10-minute value needs.
pub const MINIMUM_DATA_COUNT_COVERAGE: f64 = 0.5;
/// Controller-log mean at or above which the offset counts as active
/// (and at or below `1 - threshold` as inactive).
pub const TOGGLE_VALUE_THRESHOLD: f64 = 0.95;

const TEN_MINUTES_S: i64 = 600;

/// Sample-count floor for a 10-minute value to be kept.
pub fn ten_minutes_count_lower_limit() -> f64 {
    600.0 * MINIMUM_DATA_COUNT_COVERAGE
}

/// Source statistics kept from the 1-minute SCADA, and how each is
/// aggregated to 10 minutes. Pitch is small-angle so a plain mean suffices.
const SCADA_FIELDS: &[(&str, Aggregation)] = &[
    ("active_power_avg", Aggregation::Mean),
    ("active_power_std", Aggregation::Mean),
    ("active_power_count", Aggregation::Sum),
    ("wind_speed_avg", Aggregation::Mean),
    ("wind_speed_std", Aggregation::Mean),
    ("wind_speed_count", Aggregation::Sum),
    ("blade_1_pitch_angle_avg", Aggregation::Mean),
    ("blade_1_pitch_angle_count", Aggregation::Sum),
    ("generator_speed_avg", Aggregation::Mean),
    ("generator_speed_count", Aggregation::Sum),
    ("temperature_avg", Aggregation::Mean),
    ("temperature_count", Aggregation::Sum),
    ("nacelle_position_avg", Aggregation::CircularMean),
    ("nacelle_position_max", Aggregation::Max),
    ("nacelle_position_min", Aggregation::Min),
    ("nacelle_position_count", Aggregation::Sum),
];

// ---------------------------------------------------------------------------
// Column naming
// ---------------------------------------------------------------------------

/// Splits a wide SCADA column into `(turbine name, field)`.
///
/// The turbine number is the last `_`-separated part when that part is a
/// single character (`wind_speed_avg_3`), otherwise the second-to-last
/// (`active_power_3_avg`).
pub fn separate_turbine_id_from_field(column: &str) -> Result<(String, String)> {
    let parts: Vec<&str> = column.split('_').collect();
    if parts.len() < 2 {
        return Err(WindUpError::Parse(format!(
            "column '{}' does not name a turbine and a field",
            column
        )));
    }
    let last = parts[parts.len() - 1];
    let (wtg_id, field) = if last.chars().count() == 1 {
        (last, parts[..parts.len() - 1].join("_"))
    } else {
        let mut field_parts = parts[..parts.len() - 2].to_vec();
        field_parts.push(last);
        (parts[parts.len() - 2], field_parts.join("_"))
    };
    Ok((format!("SMV{}", wtg_id), field))
}

// ---------------------------------------------------------------------------
// SCADA
// ---------------------------------------------------------------------------

/// Reads the wide 1-minute SCADA CSV and resamples it to 10 minutes per
/// turbine. Columns whose field is not in the kept set are ignored.
pub fn resample_scada_1min<R: Read>(reader: R) -> Result<ResampledTable> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    let mut resampler = Resampler::new(TEN_MINUTES_S, SCADA_FIELDS);

    // column index -> (turbine, field index)
    let mut mapping: Vec<(usize, String, usize)> = Vec::new();
    for (i, col) in headers.iter().enumerate().skip(1) {
        let (wtg, field) = separate_turbine_id_from_field(col)?;
        if let Some(idx) = resampler.field_index(&field) {
            mapping.push((i, wtg, idx));
        }
    }
    if mapping.is_empty() {
        return Err(WindUpError::MissingColumn(
            "no recognised SCADA statistic columns".into(),
        ));
    }

    for record in rdr.records() {
        let record = record?;
        let ts = parse_timestamp(record.get(0).unwrap_or(""))?;
        for (col, wtg, idx) in &mapping {
            let value = parse_optional_f64(record.get(*col).unwrap_or(""))?;
            resampler.push(wtg, ts, *idx, value);
        }
    }
    Ok(resampler.finish(true))
}

/// Maps one resampled bucket onto the standard columns, masking every
/// value whose sample count is below the coverage limit.
fn map_and_mask(table: &ResampledTable, bucket: &Bucket) -> ScadaRecord {
    let limit = ten_minutes_count_lower_limit();
    let covered = |count_field: &str| table.value(bucket, count_field).unwrap_or(0.0) >= limit;
    let masked = |field: &str, count_field: &str| {
        if covered(count_field) {
            table.value(bucket, field)
        } else {
            None
        }
    };

    let mut rec = ScadaRecord::empty(&bucket.group, bucket.start);
    rec.active_power_mean = masked("active_power_avg", "active_power_count");
    rec.active_power_sd = masked("active_power_std", "active_power_count");
    rec.wind_speed_mean = masked("wind_speed_avg", "wind_speed_count");
    rec.wind_speed_sd = masked("wind_speed_std", "wind_speed_count");
    rec.yaw_angle_mean = masked("nacelle_position_avg", "nacelle_position_count");
    rec.yaw_angle_min = masked("nacelle_position_min", "nacelle_position_count");
    rec.yaw_angle_max = masked("nacelle_position_max", "nacelle_position_count");
    rec.pitch_angle_mean = masked("blade_1_pitch_angle_avg", "blade_1_pitch_angle_count");
    rec.gen_rpm_mean = masked("generator_speed_avg", "generator_speed_count");
    rec.ambient_temp = masked("temperature_avg", "temperature_count");
    rec.shutdown_duration = Some(0.0);
    rec
}

/// 1-minute wide SCADA CSV to standard 10-minute records, sorted by turbine
/// then timestamp.
pub fn scada_from_reader<R: Read>(reader: R) -> Result<Vec<ScadaRecord>> {
    let table = resample_scada_1min(reader)?;
    Ok(table
        .buckets
        .iter()
        .map(|b| map_and_mask(&table, b))
        .collect())
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Reads turbine coordinates. Rows that are not turbines (met masts etc.)
/// are dropped; every turbine is tagged UTC / 10-minute / start format.
pub fn metadata_from_reader<R: Read>(reader: R) -> Result<Vec<TurbineMetadata>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| WindUpError::MissingColumn(name.to_string()))
    };
    let name_idx = find("Turbine")?;
    let lat_idx = find("Latitude")?;
    let lon_idx = find("Longitude")?;

    let mut out = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let name = record.get(name_idx).unwrap_or("").trim();
        if !name.starts_with("SMV") {
            continue;
        }
        let coord = |idx: usize, what: &str| -> Result<f64> {
            parse_optional_f64(record.get(idx).unwrap_or(""))?
                .ok_or_else(|| WindUpError::Parse(format!("{} missing {}", name, what)))
        };
        out.push(TurbineMetadata {
            name: name.to_string(),
            latitude: coord(lat_idx, "Latitude")?,
            longitude: coord(lon_idx, "Longitude")?,
            time_zone: "UTC".to_string(),
            time_span_minutes: 10,
            time_format: "Start".to_string(),
        });
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Toggle
// ---------------------------------------------------------------------------

/// Derives 10-minute toggle states from the 1-minute controller log.
///
/// An interval is ON when the mean offset-active flag is at least
/// `TOGGLE_VALUE_THRESHOLD`, OFF when at most `1 - TOGGLE_VALUE_THRESHOLD`,
/// and in both cases only with enough samples; otherwise neither.
/// Timestamps in the log are UTC start-of-interval.
pub fn toggle_from_reader<R: Read>(reader: R) -> Result<Vec<ToggleRecord>> {
    const AVG: &str = "control_log_offset_active_avg";
    const COUNT: &str = "control_log_offset_active_count";

    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| WindUpError::MissingColumn(name.to_string()))
    };
    let (avg_col, count_col) = (find(AVG)?, find(COUNT)?);

    let mut resampler = Resampler::new(
        TEN_MINUTES_S,
        &[(AVG, Aggregation::Mean), (COUNT, Aggregation::Sum)],
    );
    for record in rdr.records() {
        let record = record?;
        let ts = parse_timestamp(record.get(0).unwrap_or(""))?;
        let avg = parse_optional_f64(record.get(avg_col).unwrap_or(""))?;
        let count = parse_optional_f64(record.get(count_col).unwrap_or(""))?;
        resampler.push("toggle", ts, 0, avg);
        resampler.push("toggle", ts, 1, count);
    }
    let table = resampler.finish(true);

    let limit = ten_minutes_count_lower_limit();
    Ok(table
        .buckets
        .iter()
        .map(|b| {
            let enough = table.value(b, COUNT).unwrap_or(0.0) >= limit;
            let avg = table.value(b, AVG);
            ToggleRecord {
                timestamp: b.start,
                toggle_on: enough && avg.is_some_and(|a| a >= TOGGLE_VALUE_THRESHOLD),
                toggle_off: enough && avg.is_some_and(|a| a <= 1.0 - TOGGLE_VALUE_THRESHOLD),
            }
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Archive access
// ---------------------------------------------------------------------------

fn with_member<T>(
    zip_path: &Path,
    member: &str,
    f: impl FnOnce(&mut dyn Read) -> Result<T>,
) -> Result<T> {
    let file = File::open(zip_path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut entry = archive.by_name(member)?;
    f(&mut entry)
}

/// The three SMARTEOLE tables, each cached as JSON under `cache_dir`.
#[derive(Debug, Clone)]
pub struct SmarteoleData {
    pub scada: Vec<ScadaRecord>,
    pub metadata: Vec<TurbineMetadata>,
    pub toggle: Vec<ToggleRecord>,
}

impl SmarteoleData {
    /// Unpacks (or loads cached) tables from `cache_dir/ZIP_FILENAME`.
    pub fn load(cache_dir: &Path) -> Result<Self> {
        let zip_path = cache_dir.join(ZIP_FILENAME);

        logging::info(Stage::Ingest, None, "Preprocessing turbine SCADA data");
        let scada_cache = cache_dir.join("_smarteole_scada.json");
        let scada = with_json_cache(&scada_cache, || {
            with_member(&zip_path, SCADA_MEMBER, |r| scada_from_reader(r))
        })?;
        logging::info(Stage::Ingest, None, "Preprocessing turbine metadata");
        let metadata_cache = cache_dir.join("_smarteole_metadata.json");
        let metadata = with_json_cache(&metadata_cache, || {
            with_member(&zip_path, METADATA_MEMBER, |r| metadata_from_reader(r))
        })?;
        logging::info(Stage::Ingest, None, "Preprocessing toggle data");
        let toggle_cache = cache_dir.join("_smarteole_toggle.json");
        let toggle = with_json_cache(&toggle_cache, || {
            with_member(&zip_path, CONTROL_LOG_MEMBER, |r| toggle_from_reader(r))
        })?;

        Ok(Self {
            scada,
            metadata,
            toggle,
        })
    }
}
