//! wind_up: wind turbine yield uplift assessment.
//!
//! Loads SCADA, turbine metadata, toggle states and reanalysis data, brings
//! them into a standard 10-minute form, validates and filters them for an
//! assessment described by a `WindUpConfig`, and formats and checks the
//! per test/reference uplift results.

pub mod analysis;
pub mod caching;
pub mod config;
pub mod constants;
pub mod geo;
pub mod ingest;
pub mod interface;
pub mod logging;
pub mod math;
pub mod model;
pub mod plots;
pub mod report;
