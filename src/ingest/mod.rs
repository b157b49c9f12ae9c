/// Input data acquisition and preprocessing.
///
/// Submodules:
/// - `zenodo`: downloads published datasets from Zenodo records.
/// - `resample`: streaming aggregation of high-frequency samples into
///   fixed-width time buckets.
/// - `smarteole`: converts the SMARTEOLE open dataset into the standard
///   10-minute SCADA, metadata and toggle tables.
/// - `reanalysis`: reanalysis (ERA5 etc.) wind time series.
/// - `scada_csv`: standard 10-minute SCADA tables as long-format CSV.
pub mod reanalysis;
pub mod resample;
pub mod scada_csv;
pub mod smarteole;
pub mod zenodo;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::model::{Result, WindUpError};

/// Parses a timestamp as written by common SCADA exports.
///
/// Accepts RFC 3339 (any offset, converted to UTC) and naive
/// `YYYY-MM-DD HH:MM[:SS]` / `YYYY-MM-DDTHH:MM:SS` forms, which are taken
/// to be UTC already.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z") {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    Err(WindUpError::Parse(format!("bad timestamp '{}'", s)))
}

/// Parses a numeric CSV cell. Empty cells and the usual NA spellings map to
/// `None`; anything else unparseable is an error.
pub fn parse_optional_f64(s: &str) -> Result<Option<f64>> {
    let t = s.trim();
    let lower = t.to_ascii_lowercase();
    if t.is_empty() || t == "NA" || lower == "nan" || lower == "null" {
        return Ok(None);
    }
    t.parse::<f64>()
        .map(Some)
        .map_err(|_| WindUpError::Parse(format!("not a number: '{}'", t)))
}

/// Start of the `interval_s`-wide bucket containing `ts`.
pub fn floor_to_interval(ts: DateTime<Utc>, interval_s: i64) -> DateTime<Utc> {
    let secs = ts.timestamp();
    let floored = secs - secs.rem_euclid(interval_s);
    Utc.timestamp_opt(floored, 0).single().unwrap_or(ts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_formats_agree() {
        let expected = Utc.with_ymd_and_hms(2020, 2, 17, 16, 30, 0).unwrap();
        for s in [
            "2020-02-17 16:30:00",
            "2020-02-17T16:30:00",
            "2020-02-17 16:30",
            "2020-02-17T16:30:00Z",
            "2020-02-17T17:30:00+01:00",
            "2020-02-17 16:30:00+00:00",
        ] {
            assert_eq!(parse_timestamp(s).unwrap(), expected, "{}", s);
        }
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        let parsed = parse_timestamp("yesterday");
        assert!(matches!(parsed, Err(WindUpError::Parse(_))));
        assert!(parse_timestamp("").is_err());
    }

    #[test]
    fn test_parse_optional_f64() {
        assert_eq!(parse_optional_f64("1.5").unwrap(), Some(1.5));
        assert_eq!(parse_optional_f64(" -3 ").unwrap(), Some(-3.0));
        assert_eq!(parse_optional_f64("").unwrap(), None);
        assert_eq!(parse_optional_f64("NaN").unwrap(), None);
        assert!(parse_optional_f64("abc").is_err());
    }

    #[test]
    fn test_floor_to_interval() {
        let ts = Utc.with_ymd_and_hms(2020, 2, 17, 16, 39, 59).unwrap();
        let floored = floor_to_interval(ts, 600);
        let expected = Utc.with_ymd_and_hms(2020, 2, 17, 16, 30, 0).unwrap();
        assert_eq!(floored, expected);
        assert_eq!(floor_to_interval(floored, 600), floored);
    }
}
