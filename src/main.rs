//! `wind-up` command line.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use wind_up::analysis::scada_stats::{
    calc_cf_by_turbine, capacity_factor_summary, data_coverage_by_turbine,
};
use wind_up::config::{PlotConfig, WindUpConfig};
use wind_up::constants::ProjectDirs;
use wind_up::ingest::reanalysis::ReanalysisDataset;
use wind_up::ingest::scada_csv::{read_scada_csv, write_scada_csv};
use wind_up::ingest::smarteole::{SmarteoleData, ZENODO_RECORD_ID, ZIP_FILENAME};
use wind_up::ingest::zenodo::download_zenodo_data;
use wind_up::interface::AssessmentInputs;
use wind_up::logging::{self, LogLevel, Stage};
use wind_up::model::{Result, WindUpError};
use wind_up::report::{
    TableStyle, check_results, key_results_rows, key_results_table, read_results_csv,
    render_table,
};

#[derive(Parser)]
#[command(name = "wind-up")]
#[command(version)]
#[command(about = "Wind turbine yield uplift assessment", long_about = None)]
struct Cli {
    /// Minimum log level (RUST_LOG overrides)
    #[arg(long, value_enum, default_value_t = Level::Info, global = true)]
    log_level: Level,
    /// Also append logs to this file
    #[arg(long, value_name = "PATH", global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl From<Level> for LogLevel {
    fn from(l: Level) -> Self {
        match l {
            Level::Debug => LogLevel::Debug,
            Level::Info => LogLevel::Info,
            Level::Warn => LogLevel::Warning,
            Level::Error => LogLevel::Error,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare the SMARTEOLE wake steering open dataset for assessment
    Smarteole {
        /// Download and cache folder [default: <project>/cache/smarteole_example_data]
        #[arg(long, value_name = "DIR")]
        cache_dir: Option<PathBuf>,
        /// Assessment configuration (TOML)
        #[arg(long, value_name = "PATH")]
        config: PathBuf,
        /// Reanalysis CSV files, named after their dataset id
        #[arg(long, value_name = "PATH")]
        reanalysis: Vec<PathBuf>,
        /// Use the archive already in the cache folder
        #[arg(long)]
        no_download: bool,
        /// Per test/reference uplift results to report (CSV)
        #[arg(long, value_name = "PATH")]
        results: Option<PathBuf>,
        /// Expected results to check the reported ones against (CSV)
        #[arg(long, value_name = "PATH", requires = "results")]
        expected: Option<PathBuf>,
    },
    /// Data coverage and capacity factor of a standard SCADA table
    Summary {
        /// Long-format 10-minute SCADA CSV
        #[arg(long, value_name = "PATH")]
        scada: PathBuf,
        /// Assessment configuration (TOML)
        #[arg(long, value_name = "PATH")]
        config: PathBuf,
    },
    /// Load and validate an assessment configuration
    CheckConfig {
        #[arg(long, value_name = "PATH")]
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = logging::init_logger(cli.log_level.into(), cli.log_file.as_deref(), false) {
        eprintln!("could not open log file: {}", e);
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Commands::Smarteole {
            cache_dir,
            config,
            reanalysis,
            no_download,
            results,
            expected,
        } => cmd_smarteole(
            cache_dir,
            &config,
            &reanalysis,
            no_download,
            results.as_deref(),
            expected.as_deref(),
        ),
        Commands::Summary { scada, config } => cmd_summary(&scada, &config),
        Commands::CheckConfig { config } => cmd_check_config(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logging::error(Stage::System, None, &e.to_string());
            ExitCode::FAILURE
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Dataset id from a reanalysis file name, e.g.
/// `ERA5T_50.00N_2.75E_100m_1hr_20200201_20200531.csv` → `ERA5T_50.00N_2.75E_100m_1hr`.
fn reanalysis_id(path: &Path) -> Result<String> {
    let bad_name = || WindUpError::Parse(format!("bad file name {}", path.display()));
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(bad_name)?;
    Ok(stem.split('_').take(5).collect::<Vec<_>>().join("_"))
}

fn cmd_smarteole(
    cache_dir: Option<PathBuf>,
    config: &Path,
    reanalysis: &[PathBuf],
    no_download: bool,
    results: Option<&Path>,
    expected: Option<&Path>,
) -> Result<()> {
    let default_cache = || ProjectDirs::from_env().cache.join("smarteole_example_data");
    let cache_dir = cache_dir.unwrap_or_else(default_cache);

    if !no_download {
        logging::info(Stage::Download, None, "Downloading example data");
        let wanted: BTreeSet<String> = [ZIP_FILENAME.to_string()].into();
        download_zenodo_data(ZENODO_RECORD_ID, &cache_dir, &wanted)?;
    }
    let data = SmarteoleData::load(&cache_dir)?;

    logging::info(Stage::Ingest, None, "Loading reference reanalysis data");
    let mut datasets = Vec::new();
    for path in reanalysis {
        let id = reanalysis_id(path)?;
        datasets.push(ReanalysisDataset::from_csv_file(&id, path)?);
    }

    let cfg = WindUpConfig::from_toml_file(config)?;
    let plot_cfg = PlotConfig::for_out_dir(&cfg.out_dir);
    let inputs = AssessmentInputs::from_cfg(
        cfg,
        plot_cfg,
        Some(data.toggle),
        data.scada,
        data.metadata,
        datasets,
        &cache_dir,
    )?;

    let prepared = inputs
        .cfg
        .out_dir
        .join(format!("{}_prepared_scada.csv", inputs.cfg.assessment_name));
    write_scada_csv(&prepared, &inputs.scada)?;
    let message = format!("prepared SCADA written to {}", prepared.display());
    logging::info(Stage::Report, None, &message);

    for test in &inputs.cfg.test_wtgs {
        for r in inputs.references_by_distance(test)? {
            logging::info(
                Stage::Report,
                Some(test),
                &format!(
                    "reference {} at {:.0} m, bearing {:.0} deg",
                    r.name, r.distance_m, r.bearing_deg
                ),
            );
        }
    }

    if let Some(results) = results {
        let rows = key_results_rows(&read_results_csv(results)?);
        println!("{}", key_results_table(&rows));
        if let Some(expected) = expected {
            let expected_rows = key_results_rows(&read_results_csv(expected)?);
            check_results(&rows, &expected_rows, 1e-6)?;
            logging::info(Stage::Report, None, "results match expected");
        }
    }
    Ok(())
}

fn cmd_summary(scada: &Path, config: &Path) -> Result<()> {
    let cfg = WindUpConfig::from_toml_file(config)?;
    let rows = read_scada_csv(scada)?;
    if rows.is_empty() {
        let msg = format!("{} has no rows", scada.display());
        return Err(WindUpError::EmptyData(msg));
    }

    let coverage: Vec<Vec<String>> = data_coverage_by_turbine(&rows)
        .iter()
        .map(|c| {
            vec![
                c.turbine.clone(),
                c.rows.to_string(),
                format!("{:.2}", c.power),
                format!("{:.2}", c.windspeed),
                format!("{:.2}", c.yaw),
                format!("{:.2}", c.rpm),
                format!("{:.2}", c.pitch),
            ]
        })
        .collect();
    let headers = [
        "turbine",
        "rows",
        "power",
        "windspeed",
        "yaw",
        "rpm",
        "pitch",
    ];
    let table = render_table(&headers, &coverage, TableStyle::Outline);
    println!("{}", table);

    let summary = capacity_factor_summary(&calc_cf_by_turbine(&rows, &cfg))?;
    println!("average capacity factor: {:.1}%", summary.mean_cf * 100.0);
    Ok(())
}

fn cmd_check_config(config: &Path) -> Result<()> {
    let cfg = WindUpConfig::from_toml_file(config)?;
    println!("assessment: {}", cfg.assessment_name);
    let n_wtgs = cfg.asset.wtgs.len();
    println!("asset: {} ({} turbines)", cfg.asset.name, n_wtgs);
    println!("test turbines: {}", cfg.test_wtgs.join(", "));
    println!("reference turbines: {}", cfg.ref_wtgs.join(", "));
    let first = cfg.analysis_first_dt_utc_start;
    let last = cfg.analysis_last_dt_utc_start;
    println!("analysis window: {} to {}", first, last);
    let kind = if cfg.is_toggle_test() {
        "toggle test"
    } else {
        "pre/post"
    };
    println!("type: {}", kind);
    Ok(())
}
