//! Standard 10-minute SCADA tables as long-format CSV.
//!
//! One row per turbine and interval: `TimeStamp_StartFormat`, then the
//! `DataColumns` in their standard order. Empty cells are NA.

use std::io::{Read, Write};
use std::path::Path;

use crate::constants::{DataColumns, TIMESTAMP_COL};
use crate::ingest::{parse_optional_f64, parse_timestamp};
use crate::model::{Result, ScadaRecord, WindUpError};

/// Reads a standard SCADA table. The timestamp and turbine name columns are
/// required; any missing numeric column reads as NA.
pub fn read_scada<R: Read>(reader: R) -> Result<Vec<ScadaRecord>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    let find = |name: &str| headers.iter().position(|h| h == name);

    let missing = |name: &str| WindUpError::MissingColumn(name.into());

    let ts_idx = find(TIMESTAMP_COL).ok_or_else(|| missing(TIMESTAMP_COL))?;
    let name_col = DataColumns::TURBINE_NAME;
    let name_idx = find(name_col).ok_or_else(|| missing(name_col))?;
    let numeric: Vec<(&str, usize)> = DataColumns::numeric()
        .into_iter()
        .filter_map(|c| find(c).map(|i| (c, i)))
        .collect();

    let mut out = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let name = record.get(name_idx).unwrap_or("").trim();
        let ts = parse_timestamp(record.get(ts_idx).unwrap_or(""))?;
        let mut row = ScadaRecord::empty(name, ts);
        for (col, idx) in &numeric {
            let value = parse_optional_f64(record.get(*idx).unwrap_or(""))?;
            row.set_value(col, value)?;
        }
        out.push(row);
    }
    Ok(out)
}

pub fn read_scada_csv(path: &Path) -> Result<Vec<ScadaRecord>> {
    read_scada(std::fs::File::open(path)?)
}

pub fn write_scada<W: Write>(writer: W, rows: &[ScadaRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    let mut header = vec![TIMESTAMP_COL];
    header.extend(DataColumns::all());
    wtr.write_record(&header)?;
    for row in rows {
        let mut cells = vec![row.timestamp.to_rfc3339(), row.turbine_name.clone()];
        for col in DataColumns::numeric() {
            cells.push(row.value(col)?.map(|v| v.to_string()).unwrap_or_default());
        }
        wtr.write_record(&cells)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_scada_csv(path: &Path, rows: &[ScadaRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    write_scada(std::fs::File::create(path)?, rows)
}
