/// End-to-end preparation of a synthetic SMARTEOLE archive
///
/// Builds a small archive with the same layout as the published dataset
/// (three turbines, three hours of 1-minute data, a controller log that
/// toggles hourly), then runs it through unpacking, caching and
/// `AssessmentInputs::from_cfg`.
///
/// Run with: cargo test --test smarteole_pipeline
use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Duration, TimeZone, Utc};

use wind_up::config::{PlotConfig, WindUpConfig};
use wind_up::ingest::reanalysis::ReanalysisDataset;
use wind_up::ingest::smarteole::{
    CONTROL_LOG_MEMBER, METADATA_MEMBER, SCADA_MEMBER, SmarteoleData, ZIP_FILENAME,
};
use wind_up::interface::AssessmentInputs;
use wind_up::model::ScadaRecord;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

const MINUTES: i64 = 180;
const TURBINES: [u32; 3] = [5, 6, 7];

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 2, 17, 16, 30, 0).unwrap()
}

fn minute(m: i64) -> String {
    let ts = t0() + Duration::minutes(m);
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn scada_csv() -> String {
    let stats = [
        ("active_power", &["avg", "std", "count"][..]),
        ("wind_speed", &["avg", "std", "count"][..]),
        ("blade_1_pitch_angle", &["avg", "count"][..]),
        ("generator_speed", &["avg", "count"][..]),
        ("temperature", &["avg", "count"][..]),
        ("nacelle_position", &["avg", "min", "max", "count"][..]),
    ];
    let mut header = vec!["time".to_string()];
    for n in TURBINES {
        for (stat, aggs) in &stats {
            for agg in *aggs {
                header.push(format!("{}_{}_{}", stat, n, agg));
            }
        }
    }
    let mut out = header.join(",") + "\n";
    for m in 0..MINUTES {
        let mut row = vec![minute(m)];
        for _ in TURBINES {
            row.extend(
                [
                    "1025", "40", "60", // power
                    "9", "1", "60", // wind speed
                    "1", "60", // pitch
                    "1500", "60", // generator speed
                    "10", "60", // temperature
                    "200", "195", "205", "60", // nacelle
                ]
                .map(String::from),
            );
        }
        out.push_str(&(row.join(",") + "\n"));
    }
    out
}

fn metadata_csv() -> String {
    "Turbine,Latitude,Longitude\n\
     SMV5,49.98,2.80\n\
     SMV6,49.97,2.81\n\
     SMV7,49.99,2.79\n\
     Mast,49.985,2.795\n"
        .to_string()
}

/// Offset active for the first hour, inactive for the second, active again.
fn control_log_csv() -> String {
    let header = "time,control_log_offset_active_avg,control_log_offset_active_count\n";
    let mut out = String::from(header);
    for m in 0..MINUTES {
        let active = if (m / 60) % 2 == 0 { 1 } else { 0 };
        out.push_str(&format!("{},{},60\n", minute(m), active));
    }
    out
}

fn write_archive(dir: &Path) {
    let file = File::create(dir.join(ZIP_FILENAME)).unwrap();
    let mut zw = zip::ZipWriter::new(file);
    let opts = zip::write::FileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    for (name, body) in [
        (SCADA_MEMBER, scada_csv()),
        (METADATA_MEMBER, metadata_csv()),
        (CONTROL_LOG_MEMBER, control_log_csv()),
    ] {
        zw.start_file(name, opts).unwrap();
        zw.write_all(body.as_bytes()).unwrap();
    }
    zw.finish().unwrap();
}

const CONFIG: &str = r#"
assessment_name = "synthetic_smarteole"
require_ref_wake_free = true
detrend_min_hours = 12
ref_wd_filter = [197.0, 246.0]
filter_all_test_wtgs_together = true
use_lt_distribution = false
out_dir = "unused"
test_wtgs = ["SMV6", "SMV5"]
ref_wtgs = ["SMV7"]
analysis_first_dt_utc_start = "2020-02-17T16:30:00Z"
upgrade_first_dt_utc_start = "2020-02-17T16:30:00Z"
analysis_last_dt_utc_start = "2020-02-17T19:20:00Z"
lt_first_dt_utc_start = "2020-02-17T16:30:00Z"
lt_last_dt_utc_start = "2020-02-17T19:20:00Z"
detrend_first_dt_utc_start = "2020-02-17T16:30:00Z"
detrend_last_dt_utc_start = "2020-02-17T19:20:00Z"
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
offset_deg = 5.0

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

fn reanalysis() -> ReanalysisDataset {
    let mut csv = String::from("timestamp,ws,wd\n");
    for h in 0..5 {
        let ts = Utc.with_ymd_and_hms(2020, 2, 17, 16, 0, 0).unwrap() + Duration::hours(h);
        let line = format!("{},8.5,220\n", ts.format("%Y-%m-%d %H:%M:%S"));
        csv.push_str(&line);
    }
    let id = "ERA5T_50.00N_2.75E_100m_1hr";
    ReanalysisDataset::from_reader(id, csv.as_bytes()).unwrap()
}

fn first_yaw(scada: &[ScadaRecord], name: &str) -> f64 {
    let row = scada.iter().find(|r| r.turbine_name == name).unwrap();
    row.yaw_angle_mean.unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn archive_unpacks_to_ten_minute_tables() {
    let dir = tempfile::tempdir().unwrap();
    write_archive(dir.path());

    let data = SmarteoleData::load(dir.path()).unwrap();
    assert_eq!(data.scada.len(), 3 * 18);
    assert_eq!(data.metadata.len(), 3, "mast row dropped");
    assert_eq!(data.toggle.len(), 18);

    let first = &data.scada[0];
    assert_eq!(first.turbine_name, "SMV5");
    assert_eq!(first.timestamp, t0());
    assert_eq!(first.active_power_mean, Some(1025.0));
    assert_eq!(first.yaw_angle_min, Some(195.0));
    assert!((first.yaw_angle_mean.unwrap() - 200.0).abs() < 1e-9);

    assert!(data.toggle[0].toggle_on);
    assert!(data.toggle[6].toggle_off);
}

#[test]
fn cached_tables_are_used_without_archive() {
    let dir = tempfile::tempdir().unwrap();
    write_archive(dir.path());
    let fresh = SmarteoleData::load(dir.path()).unwrap();
    assert!(dir.path().join("_smarteole_scada.json").is_file());
    assert!(dir.path().join("_smarteole_toggle.json").is_file());

    std::fs::remove_file(dir.path().join(ZIP_FILENAME)).unwrap();
    let cached = SmarteoleData::load(dir.path()).unwrap();
    assert_eq!(cached.scada, fresh.scada);
    assert_eq!(cached.toggle, fresh.toggle);
}

#[test]
fn missing_archive_without_cache_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(SmarteoleData::load(dir.path()).is_err());
}

#[test]
fn assessment_inputs_from_synthetic_archive() {
    let dir = tempfile::tempdir().unwrap();
    write_archive(dir.path());
    let data = SmarteoleData::load(dir.path()).unwrap();
    let cfg = WindUpConfig::from_toml_str(CONFIG).unwrap();
    let plot_cfg = PlotConfig::for_out_dir(&dir.path().join("out"));

    let inputs = AssessmentInputs::from_cfg(
        cfg,
        plot_cfg.clone(),
        Some(data.toggle),
        data.scada,
        data.metadata,
        vec![reanalysis()],
        dir.path(),
    )
    .expect("inputs should assemble");

    assert_eq!(inputs.scada.len(), 3 * 18);
    assert!((first_yaw(&inputs.scada, "SMV6") - 205.0).abs() < 1e-9);
    assert!((first_yaw(&inputs.scada, "SMV5") - 200.0).abs() < 1e-9);

    // on: 16:30-17:20, off: 17:30-18:20, on: 18:30-19:20. Settling drops
    // 17:30 and 18:30; pairing drops 16:30, more than an hour from any off.
    let split = inputs.pre_post_split("SMV6").unwrap();
    assert_eq!(split.pre.len(), 5);
    assert_eq!(split.post.len(), 10);
    let (pre_h, post_h) = split.valid_hours(inputs.cfg.rows_per_hour());
    assert!((pre_h - 5.0 / 6.0).abs() < 1e-12);
    assert!((post_h - 10.0 / 6.0).abs() < 1e-12);

    let refs = inputs.references_by_distance("SMV5").unwrap();
    assert_eq!(refs[0].name, "SMV7");

    let drift = inputs.windspeed_drift("SMV7").unwrap();
    assert!(drift.iter().all(|p| p.ws_diff == Some(0.5)));

    let plot_file = |name: &str| plot_cfg.plots_dir.join(name).is_file();
    assert!(plot_file("data coverage before filtering.csv"));
    assert!(plot_file("Sole du Moulin Vieux capacity factor.csv"));
    assert!(
        plot_cfg
            .plots_dir
            .join("SMV6")
            .join("SMV6 power curve by toggle, power performance data.csv")
            .is_file()
    );
}
