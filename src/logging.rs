/// Structured logging for the assessment pipeline
///
/// Installs a `tracing` subscriber with console output and optional
/// file output, and provides helpers that attach the pipeline stage and
/// turbine name to every message so long runs can be grepped per turbine.
use std::fmt;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt as tfmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::model::WindUpError;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline stages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Download,
    Ingest,
    Config,
    Filter,
    Toggle,
    Report,
    System,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Download => write!(f, "DOWNLOAD"),
            Stage::Ingest => write!(f, "INGEST"),
            Stage::Config => write!(f, "CONFIG"),
            Stage::Filter => write!(f, "FILTER"),
            Stage::Toggle => write!(f, "TOGGLE"),
            Stage::Report => write!(f, "REPORT"),
            Stage::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - input genuinely absent (e.g. a turbine without data)
    Expected,
    /// Unexpected failure - broken input, service outage or a bug
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Classifies a pipeline error by how alarming it is.
pub fn classify_failure(err: &WindUpError) -> FailureType {
    match err {
        WindUpError::EmptyData(_) | WindUpError::MissingTurbine(_) => FailureType::Expected,
        WindUpError::Http(_)
        | WindUpError::Parse(_)
        | WindUpError::Csv(_)
        | WindUpError::Json(_)
        | WindUpError::Zip(_)
        | WindUpError::InvalidConfig(_)
        | WindUpError::Toml(_) => FailureType::Unexpected,
        _ => FailureType::Unknown,
    }
}

// ---------------------------------------------------------------------------
// Subscriber setup
// ---------------------------------------------------------------------------

/// Initialize the global subscriber.
///
/// `RUST_LOG` overrides `min_level` when set. With `console_timestamps`
/// off, console lines carry no time or target (interactive use); the log
/// file, if any, always gets the full format. Calling this twice is a no-op.
pub fn init_logger(
    min_level: LogLevel,
    log_file: Option<&Path>,
    console_timestamps: bool,
) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(min_level.directive()));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(tfmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        }
        None => None,
    };
    let timed_console = console_timestamps.then(|| tfmt::layer().with_writer(std::io::stderr));
    let plain_console = (!console_timestamps).then(|| {
        tfmt::layer()
            .without_time()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(timed_console)
        .with(plain_console)
        .with(file_layer)
        .try_init();
    Ok(())
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

pub fn info(stage: Stage, turbine: Option<&str>, message: &str) {
    tracing::info!(stage = %stage, turbine = turbine.unwrap_or("-"), "{}", message);
}

pub fn warn(stage: Stage, turbine: Option<&str>, message: &str) {
    tracing::warn!(stage = %stage, turbine = turbine.unwrap_or("-"), "{}", message);
}

pub fn error(stage: Stage, turbine: Option<&str>, message: &str) {
    tracing::error!(stage = %stage, turbine = turbine.unwrap_or("-"), "{}", message);
}

pub fn debug(stage: Stage, turbine: Option<&str>, message: &str) {
    tracing::debug!(stage = %stage, turbine = turbine.unwrap_or("-"), "{}", message);
}

/// Log a failure at a severity chosen by `classify_failure`.
pub fn log_failure(stage: Stage, turbine: Option<&str>, operation: &str, err: &WindUpError) {
    let failure_type = classify_failure(err);
    let message = format!("{} failed [{}]: {}", operation, failure_type, err);
    match failure_type {
        FailureType::Expected => debug(stage, turbine, &message),
        FailureType::Unexpected => error(stage, turbine, &message),
        FailureType::Unknown => warn(stage, turbine, &message),
    }
}

// ---------------------------------------------------------------------------
// Summary Logging
// ---------------------------------------------------------------------------

/// Severity of an "n of total succeeded" summary line.
pub fn summary_level(successful: usize, failed: usize) -> LogLevel {
    if failed == 0 {
        LogLevel::Info
    } else if successful == 0 {
        LogLevel::Error
    } else {
        LogLevel::Warning
    }
}

/// Log a summary of a per-turbine step.
pub fn log_step_summary(stage: Stage, step: &str, total: usize, successful: usize, failed: usize) {
    let message = format!(
        "{} complete: {}/{} successful, {} failed",
        step, successful, total, failed
    );
    match summary_level(successful, failed) {
        LogLevel::Info | LogLevel::Debug => info(stage, None, &message),
        LogLevel::Warning => warn(stage, None, &message),
        LogLevel::Error => error(stage, None, &message),
    }
}
