//! Small numeric helpers for NA-aware and circular statistics.

use std::f64::consts::PI;

/// Circular mean of angles in the range `[low, high)`.
///
/// Follows `scipy.stats.circmean`: samples are mapped onto the unit circle,
/// averaged as vectors and mapped back into `[low, high)`. NA and non-finite
/// samples are skipped rather than propagated. Returns `None` when no usable
/// sample remains.
pub fn circ_mean(values: &[Option<f64>], low: f64, high: f64) -> Option<f64> {
    let mut acc = CircularAccumulator::new(low, high);
    for v in values.iter().flatten() {
        acc.push(*v);
    }
    acc.mean()
}

/// Streaming form of [`circ_mean`], for aggregating without buffering.
#[derive(Debug, Clone, Copy)]
pub struct CircularAccumulator {
    low: f64,
    high: f64,
    sin_sum: f64,
    cos_sum: f64,
    n: usize,
}

impl CircularAccumulator {
    pub fn new(low: f64, high: f64) -> Self {
        Self {
            low,
            high,
            sin_sum: 0.0,
            cos_sum: 0.0,
            n: 0,
        }
    }

    /// Adds a sample. Non-finite samples are ignored, so one NaN does not
    /// turn the whole mean into NaN.
    pub fn push(&mut self, v: f64) {
        if !v.is_finite() {
            return;
        }
        let ang = (v - self.low) * 2.0 * PI / (self.high - self.low);
        self.sin_sum += ang.sin();
        self.cos_sum += ang.cos();
        self.n += 1;
    }

    pub fn mean(&self) -> Option<f64> {
        if self.n == 0 {
            return None;
        }
        let span = self.high - self.low;
        let mut res = self.sin_sum.atan2(self.cos_sum);
        if res < 0.0 {
            res += 2.0 * PI;
        }
        let out = res * span / (2.0 * PI) + self.low;
        // atan2 rounding can land exactly on `high`
        Some(if out >= self.high { self.low } else { out })
    }
}

/// Circular mean of compass directions in degrees, `[0, 360)`.
pub fn circ_mean_deg(values: &[Option<f64>]) -> Option<f64> {
    circ_mean(values, 0.0, 360.0)
}

/// Signed smallest angular difference `a - b` in degrees, in `[-180, 180)`.
pub fn circ_diff(a: f64, b: f64) -> f64 {
    (a - b + 180.0).rem_euclid(360.0) - 180.0
}

/// Wraps an angle in degrees into `[0, 360)`.
pub fn wrap_360(deg: f64) -> f64 {
    let w = deg.rem_euclid(360.0);
    if w >= 360.0 { 0.0 } else { w }
}

/// Count of non-NA values.
pub fn count(values: &[Option<f64>]) -> usize {
    values.iter().flatten().count()
}

/// Sum of non-NA values; `0.0` when all are NA.
pub fn sum(values: &[Option<f64>]) -> f64 {
    values.iter().flatten().sum()
}

/// Mean of non-NA values.
pub fn mean(values: &[Option<f64>]) -> Option<f64> {
    let n = count(values);
    if n == 0 {
        None
    } else {
        Some(sum(values) / n as f64)
    }
}

/// Maximum of non-NA values.
pub fn max(values: &[Option<f64>]) -> Option<f64> {
    values.iter().flatten().copied().reduce(f64::max)
}

/// Minimum of non-NA values.
pub fn min(values: &[Option<f64>]) -> Option<f64> {
    values.iter().flatten().copied().reduce(f64::min)
}

/// Rounds to `dp` decimal places, ties to even.
pub fn round_dp(value: f64, dp: u32) -> f64 {
    let f = 10f64.powi(dp as i32);
    (value * f).round_ties_even() / f
}
