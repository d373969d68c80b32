use serde::Serialize;

use crate::data::RecordSet;
use crate::display::round_to;

/// Fixed-shape descriptive statistics of one numeric field.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Statistics {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1); `None` for a single value.
    pub std: Option<f64>,
    pub min: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub max: f64,
}

impl Statistics {
    /// Compute statistics over `values`; `None` when `values` is empty.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let std = (count > 1).then(|| {
            let squared: f64 = sorted.iter().map(|value| (value - mean).powi(2)).sum();
            (squared / (count - 1) as f64).sqrt()
        });
        Some(Self {
            count,
            mean,
            std,
            min: sorted[0],
            p25: percentile(&sorted, 0.25),
            p50: percentile(&sorted, 0.50),
            p75: percentile(&sorted, 0.75),
            max: sorted[count - 1],
        })
    }

    /// Copy with every float rounded to `decimals` places for display.
    pub fn rounded(&self, decimals: u32) -> Self {
        Self {
            count: self.count,
            mean: round_to(self.mean, decimals),
            std: self.std.map(|std| round_to(std, decimals)),
            min: round_to(self.min, decimals),
            p25: round_to(self.p25, decimals),
            p50: round_to(self.p50, decimals),
            p75: round_to(self.p75, decimals),
            max: round_to(self.max, decimals),
        }
    }

    /// Rows in the conventional describe layout: count, mean, std, min, 25%, 50%, 75%, max.
    pub fn rows(&self) -> [(&'static str, Option<f64>); 8] {
        [
            ("count", Some(self.count as f64)),
            ("mean", Some(self.mean)),
            ("std", self.std),
            ("min", Some(self.min)),
            ("25%", Some(self.p25)),
            ("50%", Some(self.p50)),
            ("75%", Some(self.p75)),
            ("max", Some(self.max)),
        ]
    }
}

/// Describe the numeric values of `field`; null and non-numeric values are skipped.
pub fn describe(set: &RecordSet, field: &str) -> Option<Statistics> {
    Statistics::from_values(&set.numbers(field))
}

/// Percentile `p` (0.0..=1.0) of ascending `sorted` values.
///
/// Linear interpolation between the closest ranks: the position is
/// `p * (n - 1)` and fractional positions blend the two neighbours.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let position = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = position.floor() as usize;
    let hi = position.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = position - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}
