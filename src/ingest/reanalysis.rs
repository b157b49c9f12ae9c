//! Reanalysis wind time series (ERA5 and similar gridded products).
//!
//! Datasets are identified the way the providers name their grid-point
//! extracts: `<SOURCE>_<lat><N|S>_<lon><E|W>_<height>m_<timebase>`, e.g.
//! `ERA5T_50.00N_2.75E_100m_1hr`.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ingest::{parse_optional_f64, parse_timestamp};
use crate::model::{ReanalysisRecord, Result, WindUpError};

/// Decoded parts of a reanalysis dataset id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReanalysisId {
    pub source: String,
    pub latitude: f64,
    pub longitude: f64,
    pub height_m: f64,
    pub timebase: String,
}

impl ReanalysisId {
    pub fn parse(id: &str) -> Result<Self> {
        let bad = || WindUpError::Parse(format!("unrecognised reanalysis id '{}'", id));
        let parts: Vec<&str> = id.split('_').collect();
        if parts.len() != 5 {
            return Err(bad());
        }

        let coord = |s: &str, pos: char, neg: char| -> Result<f64> {
            let hemi = s.chars().last().ok_or_else(bad)?;
            let value: f64 = s[..s.len() - hemi.len_utf8()].parse().map_err(|_| bad())?;
            match hemi {
                c if c == pos => Ok(value),
                c if c == neg => Ok(-value),
                _ => Err(bad()),
            }
        };
        let latitude = coord(parts[1], 'N', 'S')?;
        let longitude = coord(parts[2], 'E', 'W')?;
        let height_m = parts[3]
            .strip_suffix('m')
            .and_then(|h| h.parse().ok())
            .ok_or_else(bad)?;

        Ok(Self {
            source: parts[0].to_string(),
            latitude,
            longitude,
            height_m,
            timebase: parts[4].to_string(),
        })
    }

    /// Sample spacing in seconds, from timebases like `1hr`, `10min`, `30s`.
    pub fn timebase_seconds(&self) -> Result<i64> {
        let tb = self.timebase.as_str();
        let split = tb.find(|c: char| !c.is_ascii_digit()).unwrap_or(tb.len());
        let (num, unit) = tb.split_at(split);
        let bad = || WindUpError::Parse(format!("unrecognised timebase '{}'", tb));
        let n: i64 = num.parse().map_err(|_| bad())?;
        let unit_s = match unit {
            "hr" | "h" | "hour" => 3600,
            "min" | "m" => 60,
            "s" | "sec" => 1,
            _ => return Err(bad()),
        };
        Ok(n * unit_s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReanalysisDataset {
    pub id: String,
    pub data: Vec<ReanalysisRecord>,
}

impl ReanalysisDataset {
    pub fn new(id: &str, data: Vec<ReanalysisRecord>) -> Result<Self> {
        ReanalysisId::parse(id)?;
        Ok(Self {
            id: id.to_string(),
            data,
        })
    }

    pub fn parsed_id(&self) -> Result<ReanalysisId> {
        ReanalysisId::parse(&self.id)
    }

    /// Reads `timestamp, ws, wd` columns (by header name, any order). Rows
    /// are sorted by timestamp.
    pub fn from_reader<R: Read>(id: &str, reader: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers = rdr.headers()?.clone();
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.contains(&h))
                .ok_or_else(|| WindUpError::MissingColumn(names[0].to_string()))
        };
        let ts_idx = find(&["timestamp", "datetime", "time"])?;
        let ws_idx = find(&["ws", "reanalysis_ws", "100_m_hws_mean_mps"])?;
        let wd_idx = find(&["wd", "reanalysis_wd", "100_m_hwd_mean_deg-n_true"])?;

        let mut data = Vec::new();
        for record in rdr.records() {
            let record = record?;
            data.push(ReanalysisRecord {
                timestamp: parse_timestamp(record.get(ts_idx).unwrap_or(""))?,
                ws: parse_optional_f64(record.get(ws_idx).unwrap_or(""))?,
                wd: parse_optional_f64(record.get(wd_idx).unwrap_or(""))?,
            });
        }
        data.sort_by_key(|r| r.timestamp);
        Self::new(id, data)
    }

    pub fn from_csv_file(id: &str, path: &Path) -> Result<Self> {
        Self::from_reader(id, std::fs::File::open(path)?)
    }

    /// Sample at exactly `ts`, if present.
    pub fn at(&self, ts: chrono::DateTime<chrono::Utc>) -> Option<&ReanalysisRecord> {
        self.data
            .binary_search_by_key(&ts, |r| r.timestamp)
            .ok()
            .map(|i| &self.data[i])
    }

    /// Latest sample at or before `ts` that is less than `max_age_s` old,
    /// i.e. the sample whose averaging interval contains `ts`.
    pub fn sample_for(
        &self,
        ts: chrono::DateTime<chrono::Utc>,
        max_age_s: i64,
    ) -> Option<&ReanalysisRecord> {
        let idx = self.data.partition_point(|r| r.timestamp <= ts);
        let rec = self.data.get(idx.checked_sub(1)?)?;
        ((ts - rec.timestamp).num_seconds() < max_age_s).then_some(rec)
    }
}
