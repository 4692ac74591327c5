//! Latency percentiles with linear interpolation between order statistics

use serde::{Deserialize, Serialize};

use crate::metrics::mean;

/// One requested percentile and its value
///
/// `value` is `None` when there were no samples, which is not the same as zero latency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Percentile {
    pub rank: f64,
    pub value: Option<f64>,
}

/// Interpolated percentiles of `samples` for each of `ranks` (0-100)
///
/// Uses fractional rank `(p/100)*(n-1)` and interpolates between the two
/// nearest order statistics.
pub fn percentiles(samples: &[f64], ranks: &[f64]) -> Vec<Percentile> {
    if samples.is_empty() {
        return ranks
            .iter()
            .map(|&rank| Percentile { rank, value: None })
            .collect();
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    ranks
        .iter()
        .map(|&rank| Percentile {
            rank,
            value: Some(interpolate(&sorted, rank)),
        })
        .collect()
}

fn interpolate(sorted: &[f64], rank: f64) -> f64 {
    let count = sorted.len();
    if count == 1 {
        return sorted[0];
    }

    let position = (rank / 100.0) * (count - 1) as f64;
    let lo = (position.floor() as usize).min(count - 1);
    let hi = (lo + 1).min(count - 1);
    let frac = position - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}

/// Aggregate latency for one parameter set, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub mean: f64,
    pub p50: Option<f64>,
    pub p95: Option<f64>,
}

impl LatencySummary {
    pub fn from_samples(samples_ms: &[f64]) -> Self {
        let ps = percentiles(samples_ms, &[50.0, 95.0]);
        Self {
            mean: mean(samples_ms),
            p50: ps[0].value,
            p95: ps[1].value,
        }
    }
}
