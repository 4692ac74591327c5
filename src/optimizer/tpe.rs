//! Samplers: seeded uniform random and univariate TPE
//!
//! TPE (Tree-structured Parzen Estimator) splits completed trials into a
//! small "good" group and the rest, fits a Parzen density over each group
//! per dimension, and picks the candidate that maximizes l(x)/g(x).
//! Densities live on the unit interval; see [`Dimension::to_unit`].

use std::f64::consts::{PI, SQRT_2};

use super::space::{Dimension, SearchSpace, TrialParams};
use super::study::{Direction, Trial, TrialState};
use super::Sampler;

/// Candidates drawn from l(x) per dimension
const N_EI_CANDIDATES: usize = 24;
/// Upper bound on the size of the "good" group
const MAX_GOOD: usize = 25;
/// Rejection-sampling attempts before clamping into [0, 1]
const MAX_REJECTIONS: usize = 100;

fn rng_from_seed(seed: Option<u64>) -> fastrand::Rng {
    match seed {
        Some(seed) => fastrand::Rng::with_seed(seed),
        None => fastrand::Rng::new(),
    }
}

fn sample_uniform(rng: &mut fastrand::Rng, space: &SearchSpace) -> TrialParams {
    let mut params = TrialParams::default();
    for (name, dim) in space.dimensions() {
        params.insert(name, dim.from_unit(rng.f64()));
    }
    params
}

// =============================================================================
// Random
// =============================================================================

/// Independent uniform sampling over every dimension
pub struct RandomSampler {
    rng: fastrand::Rng,
}

impl RandomSampler {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: rng_from_seed(seed),
        }
    }
}

impl Sampler for RandomSampler {
    fn sample(&mut self, space: &SearchSpace, _history: &[Trial], _direction: Direction) -> TrialParams {
        sample_uniform(&mut self.rng, space)
    }
}

// =============================================================================
// TPE
// =============================================================================

pub struct TpeSampler {
    rng: fastrand::Rng,
    n_startup_trials: usize,
}

impl TpeSampler {
    pub fn new(seed: Option<u64>, n_startup_trials: usize) -> Self {
        Self {
            rng: rng_from_seed(seed),
            n_startup_trials,
        }
    }

    fn sample_dimension(&mut self, dim: &Dimension, good: &[f64], bad: &[f64]) -> f64 {
        let l = Parzen::fit(good);
        let g = Parzen::fit(bad);

        let mut best_u = 0.5;
        let mut best_ratio = f64::NEG_INFINITY;
        for _ in 0..N_EI_CANDIDATES {
            // Score the snapped value so grid dimensions compare what would be sent
            let u = dim.to_unit(dim.from_unit(l.sample(&mut self.rng)));
            let ratio = l.log_pdf(u) - g.log_pdf(u);
            if ratio > best_ratio {
                best_ratio = ratio;
                best_u = u;
            }
        }
        best_u
    }
}

/// Size of the "good" group for `n` completed trials
pub(crate) fn gamma(n: usize) -> usize {
    let tenth = (n + 9) / 10;
    tenth.min(MAX_GOOD).max(1)
}

impl Sampler for TpeSampler {
    fn sample(&mut self, space: &SearchSpace, history: &[Trial], direction: Direction) -> TrialParams {
        let mut completed: Vec<(&TrialParams, f64)> = history
            .iter()
            .filter(|t| t.state == TrialState::Complete)
            .filter_map(|t| t.value.map(|v| (&t.params, v)))
            .collect();

        if completed.is_empty() || completed.len() < self.n_startup_trials {
            return sample_uniform(&mut self.rng, space);
        }

        // Best first
        completed.sort_by(|a, b| match direction {
            Direction::Maximize => b.1.total_cmp(&a.1),
            Direction::Minimize => a.1.total_cmp(&b.1),
        });
        let (good, bad) = completed.split_at(gamma(completed.len()));

        let mut params = TrialParams::default();
        for (name, dim) in space.dimensions() {
            let observe = |group: &[(&TrialParams, f64)]| -> Vec<f64> {
                group
                    .iter()
                    .filter_map(|(p, _)| p.get(name))
                    .map(|v| dim.to_unit(v))
                    .collect()
            };
            let u = self.sample_dimension(dim, &observe(good), &observe(bad));
            params.insert(name, dim.from_unit(u));
        }
        params
    }
}

// =============================================================================
// Parzen estimator on [0, 1]
// =============================================================================

/// Equal-weight mixture of Gaussians truncated to [0, 1], plus a wide prior
struct Parzen {
    mus: Vec<f64>,
    sigmas: Vec<f64>,
}

const PRIOR_MU: f64 = 0.5;
const PRIOR_SIGMA: f64 = 1.0;

impl Parzen {
    fn fit(observations: &[f64]) -> Self {
        let mut mus: Vec<f64> = observations.to_vec();
        mus.push(PRIOR_MU);
        let prior_index = mus.len() - 1;

        let mut order: Vec<usize> = (0..mus.len()).collect();
        order.sort_by(|&a, &b| mus[a].total_cmp(&mus[b]));

        // Bandwidth: distance to the farther neighbor, bounds count as neighbors
        let min_sigma = 1.0 / (mus.len() as f64 + 1.0).min(100.0);
        let mut sigmas = vec![PRIOR_SIGMA; mus.len()];
        for (pos, &i) in order.iter().enumerate() {
            if i == prior_index {
                continue;
            }
            let left = if pos == 0 { 0.0 } else { mus[order[pos - 1]] };
            let right = if pos + 1 == order.len() {
                1.0
            } else {
                mus[order[pos + 1]]
            };
            sigmas[i] = (mus[i] - left).max(right - mus[i]).clamp(min_sigma, 1.0);
        }

        Self { mus, sigmas }
    }

    fn log_pdf(&self, x: f64) -> f64 {
        let weight_ln = -(self.mus.len() as f64).ln();
        let terms: Vec<f64> = self
            .mus
            .iter()
            .zip(&self.sigmas)
            .map(|(&mu, &sigma)| weight_ln + truncated_normal_log_pdf(x, mu, sigma))
            .collect();
        log_sum_exp(&terms)
    }

    fn sample(&self, rng: &mut fastrand::Rng) -> f64 {
        let i = rng.usize(..self.mus.len());
        let (mu, sigma) = (self.mus[i], self.sigmas[i]);
        for _ in 0..MAX_REJECTIONS {
            let x = mu + sigma * standard_normal(rng);
            if (0.0..=1.0).contains(&x) {
                return x;
            }
        }
        mu.clamp(0.0, 1.0)
    }
}

fn truncated_normal_log_pdf(x: f64, mu: f64, sigma: f64) -> f64 {
    let z = (x - mu) / sigma;
    let mass = normal_cdf((1.0 - mu) / sigma) - normal_cdf((0.0 - mu) / sigma);
    -0.5 * z * z - (sigma * (2.0 * PI).sqrt()).ln() - mass.max(1e-12).ln()
}

fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}

/// Box-Muller
fn standard_normal(rng: &mut fastrand::Rng) -> f64 {
    let u1 = rng.f64().max(f64::MIN_POSITIVE);
    let u2 = rng.f64();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / SQRT_2))
}

/// Abramowitz & Stegun 7.1.26, absolute error below 1.5e-7
fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + 0.327_591_1 * x);
    let poly = t
        * (0.254_829_592
            + t * (-0.284_496_736 + t * (1.421_413_741 + t * (-1.453_152_027 + t * 1.061_405_429))));
    sign * (1.0 - poly * (-x * x).exp())
}
