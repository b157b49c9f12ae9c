/// Data preparation and descriptive analysis for the uplift assessment.
///
/// Submodules:
/// - `groupings`: per-turbine views over flat SCADA tables.
/// - `scada_stats`: data coverage and capacity factor per turbine.
/// - `filters`: operating-range and downtime filters with NA accounting.
/// - `northing`: yaw northing corrections.
/// - `toggle`: toggle-test state handling (join, settling, pairing, split).
/// - `windspeed_drift`: rolling anemometer drift against reanalysis.
///
/// These modules prepare and describe the data; they do not estimate uplift.
pub mod filters;
pub mod groupings;
pub mod northing;
pub mod scada_stats;
pub mod toggle;
pub mod windspeed_drift;
