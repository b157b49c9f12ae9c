//! Plot data export.
//!
//! Every chart of the assessment is written as a CSV of the series behind it,
//! named after the chart title, so it can be drawn with any tool. Per-turbine
//! and per-type charts go into a subfolder named after the turbine or type.

use std::fs;
use std::path::PathBuf;

use crate::analysis::scada_stats::{CapacityFactor, DataCoverage};
use crate::analysis::windspeed_drift::DriftPoint;
use crate::config::{PlotConfig, WindUpConfig};
use crate::logging::{self, Stage};
use crate::model::{Result, ScadaRecord};

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

/// Writes one chart's series. Returns the file written, or `None` when
/// saving is disabled.
fn save_series(
    plot_cfg: &PlotConfig,
    subdir: Option<&str>,
    title: &str,
    headers: &[&str],
    rows: impl IntoIterator<Item = Vec<String>>,
) -> Result<Option<PathBuf>> {
    if !plot_cfg.save_plots {
        return Ok(None);
    }
    let dir = match subdir {
        Some(s) => plot_cfg.plots_dir.join(s),
        None => plot_cfg.plots_dir.clone(),
    };
    fs::create_dir_all(&dir)?;
    let path = dir.join(format!("{}.csv", title));

    let mut wtr = csv::Writer::from_path(&path)?;
    wtr.write_record(headers)?;
    for row in rows {
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    logging::debug(Stage::Report, subdir, &format!("wrote {}", path.display()));
    Ok(Some(path))
}

// ---------------------------------------------------------------------------
// Farm-level charts
// ---------------------------------------------------------------------------

pub fn plot_data_coverage_heatmap(
    coverage: &[DataCoverage],
    plot_title: &str,
    plot_cfg: &PlotConfig,
) -> Result<Option<PathBuf>> {
    let rows = coverage.iter().map(|c| {
        vec![
            c.turbine.clone(),
            format!("{:.2}", c.power),
            format!("{:.2}", c.windspeed),
            format!("{:.2}", c.yaw),
            format!("{:.2}", c.rpm),
            format!("{:.2}", c.pitch),
        ]
    });
    save_series(
        plot_cfg,
        None,
        plot_title,
        &["TurbineName", "power", "windspeed", "yaw", "rpm", "pitch"],
        rows,
    )
}

/// Capacity factor per turbine with its location, for a bubble map.
pub fn plot_capacity_factor(
    cfs: &[CapacityFactor],
    cfg: &WindUpConfig,
    plot_cfg: &PlotConfig,
) -> Result<Option<PathBuf>> {
    let title = format!("{} capacity factor", cfg.asset.name);
    let rows = cfs.iter().map(|c| {
        let wtg = cfg.find_turbine(&c.turbine);
        vec![
            c.turbine.clone(),
            fmt_opt(wtg.and_then(|w| w.latitude)),
            fmt_opt(wtg.and_then(|w| w.longitude)),
            fmt_opt(c.cf.map(|cf| cf * 100.0)),
        ]
    });
    let headers = ["TurbineName", "latitude", "longitude", "CF [%]"];
    save_series(plot_cfg, None, &title, &headers, rows)
}

// ---------------------------------------------------------------------------
// Operating curves
// ---------------------------------------------------------------------------

const OPS_HEADERS: [&str; 4] = [
    "WindSpeedMean",
    "ActivePowerMean",
    "GenRpmMean",
    "PitchAngleMean",
];

fn power_curve_row(r: &ScadaRecord) -> Vec<String> {
    vec![fmt_opt(r.wind_speed_mean), fmt_opt(r.active_power_mean)]
}

fn ops_row(r: &ScadaRecord) -> Vec<String> {
    vec![
        fmt_opt(r.wind_speed_mean),
        fmt_opt(r.active_power_mean),
        fmt_opt(r.gen_rpm_mean),
        fmt_opt(r.pitch_angle_mean),
    ]
}

/// Power curve and the rpm/pitch operating curves of one turbine or type.
pub fn plot_ops_curves_one_ttype_or_wtg(
    rows: &[&ScadaRecord],
    ttype_or_wtg: &str,
    title_end: &str,
    plot_cfg: &PlotConfig,
) -> Result<()> {
    let title = format!("{} power curve {}", ttype_or_wtg, title_end);
    let pc = rows.iter().map(|r| power_curve_row(r));
    save_series(plot_cfg, Some(ttype_or_wtg), &title, &OPS_HEADERS[..2], pc)?;

    let title = format!("{} ops curves, {}", ttype_or_wtg, title_end);
    let ops = rows.iter().map(|r| ops_row(r));
    save_series(plot_cfg, Some(ttype_or_wtg), &title, &OPS_HEADERS, ops)?;
    Ok(())
}

/// Operating curves per turbine type and, unless skipped, per turbine.
pub fn plot_ops_curves_per_ttype(
    cfg: &WindUpConfig,
    rows: &[ScadaRecord],
    title_end: &str,
    plot_cfg: &PlotConfig,
) -> Result<()> {
    for ttype in cfg.list_unique_turbine_types() {
        let wtgs = cfg.list_turbine_ids_of_type(ttype);
        let of_type: Vec<&ScadaRecord> = rows
            .iter()
            .filter(|r| wtgs.contains(&r.turbine_name.as_str()))
            .collect();
        plot_ops_curves_one_ttype_or_wtg(&of_type, &ttype.turbine_type, title_end, plot_cfg)?;

        if !plot_cfg.skip_per_turbine_plots {
            for wtg in wtgs {
                let own: Vec<&ScadaRecord> = of_type
                    .iter()
                    .copied()
                    .filter(|r| r.turbine_name == wtg)
                    .collect();
                plot_ops_curves_one_ttype_or_wtg(&own, wtg, title_end, plot_cfg)?;
            }
        }
    }
    Ok(())
}

/// Operating curves split by toggle state; a `state` column holds `OFF`/`ON`.
pub fn plot_toggle_ops_curves_one_ttype_or_wtg(
    off: &[&ScadaRecord],
    on: &[&ScadaRecord],
    ttype_or_wtg: &str,
    title_end: &str,
    toggle_name: &str,
    plot_cfg: &PlotConfig,
) -> Result<()> {
    let labelled = || {
        off.iter()
            .map(|r| ("OFF", *r))
            .chain(on.iter().map(|r| ("ON", *r)))
    };

    let title = format!(
        "{} power curve by {}, {}",
        ttype_or_wtg, toggle_name, title_end
    );
    let pc = labelled().map(|(state, r)| {
        let mut row = vec![format!("{} {}", toggle_name, state)];
        row.extend(power_curve_row(r));
        row
    });
    save_series(
        plot_cfg,
        Some(ttype_or_wtg),
        &title,
        &["state", OPS_HEADERS[0], OPS_HEADERS[1]],
        pc,
    )?;

    let title = format!(
        "{} ops curves by {}, {}",
        ttype_or_wtg, toggle_name, title_end
    );
    let ops = labelled().map(|(state, r)| {
        let mut row = vec![format!("{} {}", toggle_name, state)];
        row.extend(ops_row(r));
        row
    });
    let mut headers = vec!["state"];
    headers.extend(OPS_HEADERS);
    save_series(plot_cfg, Some(ttype_or_wtg), &title, &headers, ops)?;
    Ok(())
}

/// Power performance data of a test turbine before and after the
/// intervention. Pre/post assessments are labelled "upgrade".
pub fn compare_ops_curves_pre_post(
    pre: &[&ScadaRecord],
    post: &[&ScadaRecord],
    test_name: &str,
    plot_cfg: &PlotConfig,
    is_toggle_test: bool,
) -> Result<()> {
    let toggle_name = if is_toggle_test { "toggle" } else { "upgrade" };
    plot_toggle_ops_curves_one_ttype_or_wtg(
        pre,
        post,
        test_name,
        "power performance data",
        toggle_name,
        plot_cfg,
    )
}

// ---------------------------------------------------------------------------
// Wind speed drift
// ---------------------------------------------------------------------------

pub fn plot_rolling_windspeed_diff_one_wtg(
    points: &[DriftPoint],
    wtg_name: &str,
    ws_col: &str,
    plot_cfg: &PlotConfig,
) -> Result<Option<PathBuf>> {
    let title = format!("{} rolling {} diff to reanalysis", wtg_name, ws_col);
    let rows = points.iter().map(|p| {
        let diff = fmt_opt(p.rolling_windspeed_diff);
        vec![p.timestamp.to_rfc3339(), diff]
    });
    save_series(
        plot_cfg,
        Some(wtg_name),
        &title,
        &["datetime", "rolling_windspeed_diff [m/s]"],
        rows,
    )
}
