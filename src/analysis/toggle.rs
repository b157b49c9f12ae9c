//! Toggle-test state handling.
//!
//! In a toggle test the intervention is switched on and off repeatedly and
//! toggle-off rows form the baseline. Rows shortly after a switch are
//! unsettled and dropped, and rows with no nearby row of the opposite state
//! can optionally be dropped so both states see similar conditions.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::model::{ScadaRecord, ToggleRecord};

/// A SCADA row with the toggle state of its interval.
#[derive(Debug, Clone, PartialEq)]
pub struct ToggledScada {
    pub record: ScadaRecord,
    pub toggle_on: bool,
    pub toggle_off: bool,
}

/// Attaches the farm-wide toggle state to each row by timestamp. Rows with no
/// toggle entry get neither flag.
pub fn join_toggle(rows: &[ScadaRecord], toggle: &[ToggleRecord]) -> Vec<ToggledScada> {
    let by_ts: BTreeMap<DateTime<Utc>, &ToggleRecord> =
        toggle.iter().map(|t| (t.timestamp, t)).collect();
    rows.iter()
        .map(|r| {
            let state = by_ts.get(&r.timestamp);
            ToggledScada {
                record: r.clone(),
                toggle_on: state.is_some_and(|t| t.toggle_on),
                toggle_off: state.is_some_and(|t| t.toggle_off),
            }
        })
        .collect()
}

fn state(t: &ToggleRecord) -> Option<bool> {
    match (t.toggle_on, t.toggle_off) {
        (true, false) => Some(true),
        (false, true) => Some(false),
        _ => None,
    }
}

fn clear(t: &mut ToggleRecord) -> bool {
    let had = t.toggle_on || t.toggle_off;
    t.toggle_on = false;
    t.toggle_off = false;
    had
}

/// Clears both flags on rows less than `seconds` after a change of state.
/// Rows must be sorted by timestamp. Returns the number of rows cleared.
///
/// The first known state is not a change.
pub fn toggle_change_settling_filter(toggle: &mut [ToggleRecord], seconds: u64) -> usize {
    if seconds == 0 {
        return 0;
    }
    let window = Duration::seconds(seconds as i64);
    let mut last_state: Option<bool> = None;
    let mut settle_until: Option<DateTime<Utc>> = None;
    let mut cleared = 0;

    for t in toggle.iter_mut() {
        if let Some(s) = state(t) {
            if last_state.is_some_and(|prev| prev != s) {
                settle_until = Some(t.timestamp + window);
            }
            last_state = Some(s);
        }
        if settle_until.is_some_and(|until| t.timestamp < until) && clear(t) {
            cleared += 1;
        }
    }
    cleared
}

fn any_within(sorted: &[DateTime<Utc>], ts: DateTime<Utc>, window: Duration) -> bool {
    let idx = sorted.partition_point(|t| *t < ts - window);
    sorted.get(idx).is_some_and(|t| *t <= ts + window)
}

/// Keeps an on or off row only when a row of the opposite state lies within
/// `seconds` of it. Returns the number of rows cleared.
pub fn pairing_filter_any_within(toggle: &mut [ToggleRecord], seconds: u64) -> usize {
    let window = Duration::seconds(seconds as i64);
    let mut on_times: Vec<DateTime<Utc>> = Vec::new();
    let mut off_times: Vec<DateTime<Utc>> = Vec::new();
    for t in toggle.iter() {
        match state(t) {
            Some(true) => on_times.push(t.timestamp),
            Some(false) => off_times.push(t.timestamp),
            None => {}
        }
    }
    on_times.sort();
    off_times.sort();

    let mut cleared = 0;
    for t in toggle.iter_mut() {
        let paired = match state(t) {
            Some(true) => any_within(&off_times, t.timestamp, window),
            Some(false) => any_within(&on_times, t.timestamp, window),
            None => continue,
        };
        if !paired && clear(t) {
            cleared += 1;
        }
    }
    cleared
}

/// Splits joined rows into `(toggle_off, toggle_on)`; rows with neither flag
/// are left out.
pub fn split_on_off(rows: &[ToggledScada]) -> (Vec<&ScadaRecord>, Vec<&ScadaRecord>) {
    let off = rows
        .iter()
        .filter(|r| r.toggle_off)
        .map(|r| &r.record)
        .collect();
    let on = rows
        .iter()
        .filter(|r| r.toggle_on)
        .map(|r| &r.record)
        .collect();
    (off, on)
}

/// A toggle series for a plain pre/post assessment: pre timestamps are
/// "off", post timestamps "on". Sorted, one entry per timestamp; a
/// timestamp present in both is treated as post.
pub fn fake_toggle_for_prepost(pre: &[ScadaRecord], post: &[ScadaRecord]) -> Vec<ToggleRecord> {
    let mut by_ts: BTreeMap<DateTime<Utc>, bool> = BTreeMap::new();
    for r in pre {
        by_ts.insert(r.timestamp, false);
    }
    for r in post {
        by_ts.insert(r.timestamp, true);
    }
    by_ts
        .into_iter()
        .map(|(timestamp, on)| ToggleRecord {
            timestamp,
            toggle_on: on,
            toggle_off: !on,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(i: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 3, 1, 0, 0, 0).unwrap() + Duration::minutes(10 * i)
    }

    /// 'n' = on, 'f' = off, '-' = unknown.
    fn series(pattern: &str) -> Vec<ToggleRecord> {
        pattern
            .chars()
            .enumerate()
            .map(|(i, c)| ToggleRecord {
                timestamp: t(i as i64),
                toggle_on: c == 'n',
                toggle_off: c == 'f',
            })
            .collect()
    }

    fn pattern(toggle: &[ToggleRecord]) -> String {
        toggle
            .iter()
            .map(|r| match (r.toggle_on, r.toggle_off) {
                (true, _) => 'n',
                (_, true) => 'f',
                _ => '-',
            })
            .collect()
    }

    #[test]
    fn test_settling_clears_rows_after_change() {
        let mut toggle = series("fffnnnnfff");
        let cleared = toggle_change_settling_filter(&mut toggle, 1200);
        assert_eq!(cleared, 4);
        assert_eq!(pattern(&toggle), "fff--nn--f");
    }

    #[test]
    fn test_settling_sees_change_across_unknown_rows() {
        let mut toggle = series("ff-nnn");
        assert_eq!(toggle_change_settling_filter(&mut toggle, 1200), 2);
        assert_eq!(pattern(&toggle), "ff---n");
    }

    #[test]
    fn test_zero_settling_is_noop() {
        let mut toggle = series("fnfn");
        assert_eq!(toggle_change_settling_filter(&mut toggle, 0), 0);
        assert_eq!(pattern(&toggle), "fnfn");
    }

    #[test]
    fn test_pairing_drops_isolated_rows() {
        let mut toggle = series("ffffffffnn");
        let cleared = pairing_filter_any_within(&mut toggle, 1800);
        assert_eq!(cleared, 5);
        assert_eq!(pattern(&toggle), "-----fffnn");
    }

    #[test]
    fn test_join_and_split() {
        let rows: Vec<ScadaRecord> = (0..4).map(|i| ScadaRecord::empty("SMV5", t(i))).collect();
        let toggle = series("fn-");
        let joined = join_toggle(&rows, &toggle);
        assert_eq!(joined.len(), 4);
        assert!(joined[0].toggle_off && !joined[0].toggle_on);
        assert!(joined[1].toggle_on);
        assert!(
            !joined[3].toggle_on && !joined[3].toggle_off,
            "no toggle entry"
        );
        let (off, on) = split_on_off(&joined);
        assert_eq!(off.len(), 1);
        assert_eq!(on.len(), 1);
        assert_eq!(on[0].timestamp, t(1));
    }

    #[test]
    fn test_fake_toggle_for_prepost() {
        let pre: Vec<ScadaRecord> = (0..2).map(|i| ScadaRecord::empty("SMV5", t(i))).collect();
        let post: Vec<ScadaRecord> = (2..3).map(|i| ScadaRecord::empty("SMV5", t(i))).collect();
        let toggle = fake_toggle_for_prepost(&pre, &post);
        assert_eq!(pattern(&toggle), "ffn");
    }
}
