//! Per-turbine views over a flat SCADA table.

use std::collections::BTreeMap;

use crate::model::ScadaRecord;

/// Groups records by turbine name, preserving input order within each
/// turbine. Turbines are returned in name order.
pub fn group_by_turbine(rows: &[ScadaRecord]) -> BTreeMap<&str, Vec<&ScadaRecord>> {
    let mut out: BTreeMap<&str, Vec<&ScadaRecord>> = BTreeMap::new();
    for row in rows {
        out.entry(row.turbine_name.as_str()).or_default().push(row);
    }
    out
}

/// Records of one turbine, in input order.
pub fn rows_for_turbine<'a>(rows: &'a [ScadaRecord], turbine: &str) -> Vec<&'a ScadaRecord> {
    rows.iter().filter(|r| r.turbine_name == turbine).collect()
}

/// Sorts records by turbine name, then timestamp.
pub fn sort_by_turbine_and_time(rows: &mut [ScadaRecord]) {
    rows.sort_by(|a, b| {
        a.turbine_name
            .cmp(&b.turbine_name)
            .then(a.timestamp.cmp(&b.timestamp))
    });
}
