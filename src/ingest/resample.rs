//! Streaming resampling of high-frequency samples into fixed-width buckets.
//!
//! Samples are grouped by a key (usually the turbine name) and by the start
//! of the bucket they fall in. Each field keeps a running accumulator, so a
//! month of 1-minute data never needs to be held in memory at once.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use super::floor_to_interval;
use crate::math::CircularAccumulator;

/// How a field's samples are combined within a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Mean,
    /// Sum of the present samples; an empty bucket sums to `0.0`.
    Sum,
    Max,
    Min,
    /// Circular mean over `[0, 360)` degrees.
    CircularMean,
}

#[derive(Debug, Clone, Copy)]
struct FieldAcc {
    agg: Aggregation,
    n: usize,
    sum: f64,
    min: f64,
    max: f64,
    circ: CircularAccumulator,
}

impl FieldAcc {
    fn new(agg: Aggregation) -> Self {
        Self {
            agg,
            n: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            circ: CircularAccumulator::new(0.0, 360.0),
        }
    }

    /// Non-finite samples are skipped rather than propagated into the bucket.
    fn push(&mut self, v: f64) {
        if !v.is_finite() {
            return;
        }
        self.n += 1;
        self.sum += v;
        self.min = self.min.min(v);
        self.max = self.max.max(v);
        if self.agg == Aggregation::CircularMean {
            self.circ.push(v);
        }
    }

    fn finish(&self) -> Option<f64> {
        match self.agg {
            Aggregation::Sum => Some(self.sum),
            _ if self.n == 0 => None,
            Aggregation::Mean => Some(self.sum / self.n as f64),
            Aggregation::Max => Some(self.max),
            Aggregation::Min => Some(self.min),
            Aggregation::CircularMean => self.circ.mean(),
        }
    }
}

/// One output bucket: `values` follow the field order of the table.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub group: String,
    pub start: DateTime<Utc>,
    pub values: Vec<Option<f64>>,
}

/// Result of [`Resampler::finish`], buckets sorted by group then time.
#[derive(Debug, Clone, PartialEq)]
pub struct ResampledTable {
    pub fields: Vec<String>,
    pub buckets: Vec<Bucket>,
}

impl ResampledTable {
    /// Value of `field` in `bucket`; `None` for NA or an unknown field.
    pub fn value(&self, bucket: &Bucket, field: &str) -> Option<f64> {
        self.fields
            .iter()
            .position(|f| f == field)
            .and_then(|i| bucket.values.get(i).copied().flatten())
    }
}

pub struct Resampler {
    interval_s: i64,
    fields: Vec<(String, Aggregation)>,
    buckets: BTreeMap<(String, DateTime<Utc>), Vec<FieldAcc>>,
}

impl Resampler {
    pub fn new(interval_s: i64, fields: &[(&str, Aggregation)]) -> Self {
        Self {
            interval_s,
            fields: fields.iter().map(|(n, a)| (n.to_string(), *a)).collect(),
            buckets: BTreeMap::new(),
        }
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|(n, _)| n == name)
    }

    /// Adds one sample. The bucket is created even when `value` is NA, so an
    /// interval with rows but no valid data still appears in the output.
    pub fn push(&mut self, group: &str, ts: DateTime<Utc>, field_idx: usize, value: Option<f64>) {
        let start = floor_to_interval(ts, self.interval_s);
        let fields = &self.fields;
        let accs = self
            .buckets
            .entry((group.to_string(), start))
            .or_insert_with(|| empty_accs(fields));
        if let (Some(acc), Some(v)) = (accs.get_mut(field_idx), value) {
            acc.push(v);
        }
    }

    /// Finalises all buckets. With `fill_gaps`, every interval between a
    /// group's first and last bucket is emitted, empty ones included.
    pub fn finish(mut self, fill_gaps: bool) -> ResampledTable {
        if fill_gaps {
            let step = Duration::seconds(self.interval_s);
            let mut spans: BTreeMap<String, (DateTime<Utc>, DateTime<Utc>)> = BTreeMap::new();
            for (group, start) in self.buckets.keys() {
                spans
                    .entry(group.clone())
                    .and_modify(|s| {
                        s.0 = s.0.min(*start);
                        s.1 = s.1.max(*start);
                    })
                    .or_insert((*start, *start));
            }
            for (group, (first, last)) in spans {
                let mut t = first;
                while t <= last {
                    self.buckets
                        .entry((group.clone(), t))
                        .or_insert_with(|| empty_accs(&self.fields));
                    t += step;
                }
            }
        }

        let fields = self.fields.iter().map(|(n, _)| n.clone()).collect();
        let buckets = self
            .buckets
            .into_iter()
            .map(|((group, start), accs)| Bucket {
                group,
                start,
                values: accs.iter().map(FieldAcc::finish).collect(),
            })
            .collect();
        ResampledTable { fields, buckets }
    }
}

fn empty_accs(fields: &[(String, Aggregation)]) -> Vec<FieldAcc> {
    fields.iter().map(|(_, a)| FieldAcc::new(*a)).collect()
}
