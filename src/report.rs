//! Plain-text tables and result formatting.
//!
//! Uplift results are reported with fractions converted to percentages and
//! friendly column names, and can be checked against a set of expected
//! values to guard a reference assessment against regressions.

use std::path::Path;

use crate::math::round_dp;
use crate::model::{Result, UpliftResult, WindUpError};

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStyle {
    /// ASCII rules, text left-aligned and numbers right-aligned.
    Outline,
    /// Box-drawing rules between every row, all cells centered.
    FancyGrid,
}

fn looks_numeric(s: &str) -> bool {
    s.trim_end_matches('%').parse::<f64>().is_ok()
}

fn pad(cell: &str, width: usize, style: TableStyle) -> String {
    let len = cell.chars().count();
    let fill = width.saturating_sub(len);
    match style {
        TableStyle::FancyGrid => {
            let left = fill / 2;
            format!("{}{}{}", " ".repeat(left), cell, " ".repeat(fill - left))
        }
        TableStyle::Outline if looks_numeric(cell) => format!("{}{}", " ".repeat(fill), cell),
        TableStyle::Outline => format!("{}{}", cell, " ".repeat(fill)),
    }
}

/// Renders `rows` under `headers`. Rows shorter than the header are padded
/// with empty cells.
pub fn render_table(headers: &[&str], rows: &[Vec<String>], style: TableStyle) -> String {
    let ncols = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().take(ncols).enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let (h, top, head_sep, row_sep, bottom, v) = match style {
        TableStyle::Outline => (
            '-',
            ('+', '+', '+'),
            ('+', '+', '+', '='),
            None,
            ('+', '+', '+'),
            '|',
        ),
        TableStyle::FancyGrid => (
            '═',
            ('╒', '╤', '╕'),
            ('╞', '╪', '╡', '═'),
            Some(('├', '┼', '┤', '─')),
            ('╘', '╧', '╛'),
            '│',
        ),
    };

    let rule = |l: char, m: char, r: char, fill: char| -> String {
        let fill = fill.to_string();
        let segs: Vec<String> = widths.iter().map(|w| fill.repeat(w + 2)).collect();
        format!("{}{}{}", l, segs.join(&m.to_string()), r)
    };
    let line = |cells: Vec<String>| -> String {
        let padded: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(i, c)| format!(" {} ", pad(c, widths[i], style)))
            .collect();
        format!("{}{}{}", v, padded.join(&v.to_string()), v)
    };

    let mut out = Vec::new();
    out.push(rule(top.0, top.1, top.2, h));
    out.push(line(headers.iter().map(|s| s.to_string()).collect()));
    out.push(rule(head_sep.0, head_sep.1, head_sep.2, head_sep.3));
    for (ri, row) in rows.iter().enumerate() {
        let mut cells: Vec<String> = row.iter().take(ncols).cloned().collect();
        cells.resize(ncols, String::new());
        out.push(line(cells));
        if let Some(sep) = row_sep
            && ri + 1 < rows.len()
        {
            out.push(rule(sep.0, sep.1, sep.2, sep.3));
        }
    }
    out.push(rule(bottom.0, bottom.1, bottom.2, h));
    out.join("\n")
}

// ---------------------------------------------------------------------------
// Result formatting
// ---------------------------------------------------------------------------

/// Formats a fraction as a percentage string, e.g. `-0.0113` → `"-1.1%"`.
pub fn frc_to_pct(value: f64, dp: usize) -> String {
    format!("{:.*}%", dp, round_dp(value * 100.0, dp as u32))
}

pub const KEY_RESULTS_HEADERS: [&str; 9] = [
    "turbine",
    "reference",
    "energy uplift",
    "uplift uncertainty",
    "uplift P95",
    "uplift P5",
    "valid hours toggle off",
    "valid hours toggle on",
    "mean power toggle on",
];

/// One line of the key results table, as presented to a reader.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyResultsRow {
    pub turbine: String,
    pub reference: String,
    pub energy_uplift: String,
    pub uplift_uncertainty: String,
    pub uplift_p95: String,
    pub uplift_p5: String,
    pub valid_hours_toggle_off: f64,
    pub valid_hours_toggle_on: f64,
    pub mean_power_toggle_on: i64,
}

impl KeyResultsRow {
    pub fn from_result(r: &UpliftResult, dp: usize) -> Self {
        Self {
            turbine: r.test_wtg.clone(),
            reference: r.reference.clone(),
            energy_uplift: frc_to_pct(r.uplift_frc, dp),
            uplift_uncertainty: frc_to_pct(r.unc_one_sigma_frc, dp),
            uplift_p95: frc_to_pct(r.uplift_p95_frc, dp),
            uplift_p5: frc_to_pct(r.uplift_p5_frc, dp),
            valid_hours_toggle_off: r.pp_valid_hours_pre,
            valid_hours_toggle_on: r.pp_valid_hours_post,
            mean_power_toggle_on: r.mean_power_post.round_ties_even() as i64,
        }
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.turbine.clone(),
            self.reference.clone(),
            self.energy_uplift.clone(),
            self.uplift_uncertainty.clone(),
            self.uplift_p95.clone(),
            self.uplift_p5.clone(),
            format!("{:.1}", self.valid_hours_toggle_off),
            format!("{:.1}", self.valid_hours_toggle_on),
            self.mean_power_toggle_on.to_string(),
        ]
    }
}

pub fn key_results_rows(results: &[UpliftResult]) -> Vec<KeyResultsRow> {
    results.iter().map(|r| KeyResultsRow::from_result(r, 1)).collect()
}

pub fn key_results_table(rows: &[KeyResultsRow]) -> String {
    let cells: Vec<Vec<String>> = rows.iter().map(KeyResultsRow::cells).collect();
    render_table(&KEY_RESULTS_HEADERS, &cells, TableStyle::FancyGrid)
}

/// Compares presented results with expected ones. Text columns must match
/// exactly, valid hours within `hours_tol`.
pub fn check_results(
    actual: &[KeyResultsRow],
    expected: &[KeyResultsRow],
    hours_tol: f64,
) -> Result<()> {
    if actual.len() != expected.len() {
        return Err(WindUpError::ResultMismatch(format!(
            "expected {} rows, got {}",
            expected.len(),
            actual.len()
        )));
    }
    for (a, e) in actual.iter().zip(expected) {
        let same_text = a.turbine == e.turbine
            && a.reference == e.reference
            && a.energy_uplift == e.energy_uplift
            && a.uplift_uncertainty == e.uplift_uncertainty
            && a.uplift_p95 == e.uplift_p95
            && a.uplift_p5 == e.uplift_p5
            && a.mean_power_toggle_on == e.mean_power_toggle_on;
        let same_hours = (a.valid_hours_toggle_off - e.valid_hours_toggle_off).abs() <= hours_tol
            && (a.valid_hours_toggle_on - e.valid_hours_toggle_on).abs() <= hours_tol;
        if !(same_text && same_hours) {
            return Err(WindUpError::ResultMismatch(format!(
                "{} vs {}: got {:?}, expected {:?}",
                e.turbine, e.reference, a, e
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Result files
// ---------------------------------------------------------------------------

/// Reads per test/reference results. Extra columns are ignored.
pub fn read_results_csv(path: &Path) -> Result<Vec<UpliftResult>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut out = Vec::new();
    for row in rdr.deserialize() {
        out.push(row?);
    }
    Ok(out)
}

pub fn write_results_csv(path: &Path, results: &[UpliftResult]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::Writer::from_path(path)?;
    for r in results {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smarteole_results() -> Vec<UpliftResult> {
        vec![
            UpliftResult {
                test_wtg: "SMV6".into(),
                reference: "SMV7".into(),
                uplift_frc: -0.0113,
                unc_one_sigma_frc: 0.0058,
                uplift_p95_frc: -0.0208,
                uplift_p5_frc: -0.0018,
                pp_valid_hours_pre: 137.0 + 5.0 / 6.0,
                pp_valid_hours_post: 136.0,
                mean_power_post: 1148.2,
            },
            UpliftResult {
                test_wtg: "SMV5".into(),
                reference: "SMV7".into(),
                uplift_frc: 0.0304,
                unc_one_sigma_frc: 0.0118,
                uplift_p95_frc: 0.011,
                uplift_p5_frc: 0.0498,
                pp_valid_hours_pre: 137.0 + 4.0 / 6.0,
                pp_valid_hours_post: 137.0 + 1.0 / 6.0,
                mean_power_post: 993.6,
            },
        ]
    }

    fn expected_rows() -> Vec<KeyResultsRow> {
        vec![
            KeyResultsRow {
                turbine: "SMV6".into(),
                reference: "SMV7".into(),
                energy_uplift: "-1.1%".into(),
                uplift_uncertainty: "0.6%".into(),
                uplift_p95: "-2.1%".into(),
                uplift_p5: "-0.2%".into(),
                valid_hours_toggle_off: 137.0 + 5.0 / 6.0,
                valid_hours_toggle_on: 136.0,
                mean_power_toggle_on: 1148,
            },
            KeyResultsRow {
                turbine: "SMV5".into(),
                reference: "SMV7".into(),
                energy_uplift: "3.0%".into(),
                uplift_uncertainty: "1.2%".into(),
                uplift_p95: "1.1%".into(),
                uplift_p5: "5.0%".into(),
                valid_hours_toggle_off: 137.0 + 4.0 / 6.0,
                valid_hours_toggle_on: 137.0 + 1.0 / 6.0,
                mean_power_toggle_on: 994,
            },
        ]
    }

    #[test]
    fn test_frc_to_pct() {
        assert_eq!(frc_to_pct(-0.0113, 1), "-1.1%");
        assert_eq!(frc_to_pct(0.0304, 1), "3.0%");
        assert_eq!(frc_to_pct(0.05, 0), "5%");
    }

    #[test]
    fn test_key_results_match_expected() {
        let rows = key_results_rows(&smarteole_results());
        let expected = expected_rows();
        let checked = check_results(&rows, &expected, 1e-6);
        assert!(checked.is_ok(), "{:?}", checked);
    }

    #[test]
    fn test_mean_power_ties_round_to_even() {
        let mut results = smarteole_results();
        results[0].mean_power_post = 1148.5;
        results[1].mean_power_post = 994.5;
        let rows = key_results_rows(&results);
        assert_eq!(rows[0].mean_power_toggle_on, 1148);
        assert_eq!(rows[1].mean_power_toggle_on, 994);
    }

    #[test]
    fn test_check_results_reports_mismatch() {
        let mut rows = key_results_rows(&smarteole_results());
        rows[1].energy_uplift = "2.9%".into();
        assert!(matches!(
            check_results(&rows, &expected_rows(), 1e-6),
            Err(WindUpError::ResultMismatch(_))
        ));
        assert!(check_results(&rows[..1], &expected_rows(), 1e-6).is_err());
    }

    #[test]
    fn test_outline_table_layout() {
        let rows: [Vec<String>; 2] = [
            vec!["SMV1".into(), "31.2".into()],
            vec!["SMV10".into(), "9.0".into()],
        ];
        let table = render_table(&["turbine", "CF"], &rows, TableStyle::Outline);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "+---------+------+");
        assert_eq!(lines[1], "| turbine | CF   |");
        assert_eq!(lines[2], "+=========+======+");
        assert_eq!(lines[3], "| SMV1    | 31.2 |");
        assert_eq!(lines[4], "| SMV10   |  9.0 |");
        assert_eq!(lines[5], "+---------+------+");
    }

    #[test]
    fn test_fancy_grid_has_row_separators_and_centering() {
        let table = render_table(
            &["a", "bb"],
            &[vec!["x".into(), "1".into()], vec!["yyy".into(), "2".into()]],
            TableStyle::FancyGrid,
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 7);
        assert!(lines[0].starts_with('╒') && lines[6].starts_with('╘'));
        assert!(lines[4].starts_with('├'));
        assert_eq!(lines[3], "│  x  │ 1  │");
    }

    #[test]
    fn test_results_csv_roundtrip_ignores_extra_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        std::fs::write(
            &path,
            "test_wtg,ref,uplift_frc,unc_one_sigma_frc,uplift_p95_frc,uplift_p5_frc,\
             pp_valid_hours_pre,pp_valid_hours_post,mean_power_post,extra\n\
             SMV6,SMV7,-0.01,0.006,-0.02,0.0,137.5,136,1148,x\n",
        )
        .unwrap();
        let results = read_results_csv(&path).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].reference, "SMV7");

        let out = dir.path().join("out").join("copy.csv");
        write_results_csv(&out, &results).unwrap();
        assert_eq!(read_results_csv(&out).unwrap(), results);
    }
}
