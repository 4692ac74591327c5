//! Search space: named integer and float dimensions
//!
//! Samplers work in a normalized unit interval per dimension; `from_unit`
//! maps back onto the dimension's range and snaps stepped dimensions to
//! their grid.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One tunable axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dimension {
    Int { low: i64, high: i64, step: i64 },
    Float { low: f64, high: f64, step: Option<f64> },
}

impl Dimension {
    pub fn int(low: i64, high: i64, step: i64) -> Result<Self> {
        if low > high {
            bail!("integer range low ({}) must be <= high ({})", low, high);
        }
        if step <= 0 {
            bail!("integer step must be > 0, got {}", step);
        }
        Ok(Dimension::Int { low, high, step })
    }

    pub fn float(low: f64, high: f64, step: Option<f64>) -> Result<Self> {
        if !low.is_finite() || !high.is_finite() {
            bail!("float range bounds must be finite");
        }
        if low > high {
            bail!("float range low ({}) must be <= high ({})", low, high);
        }
        if let Some(step) = step {
            if step.is_nan() || step <= 0.0 {
                bail!("float step must be > 0, got {}", step);
            }
        }
        Ok(Dimension::Float { low, high, step })
    }

    /// Position of `value` in [0, 1]; a degenerate range maps to 0.5
    pub fn to_unit(&self, value: ParamValue) -> f64 {
        let (low, high) = self.bounds();
        if high <= low {
            return 0.5;
        }
        ((value.as_f64() - low) / (high - low)).clamp(0.0, 1.0)
    }

    /// Value at unit position `u`, snapped to the grid when stepped
    pub fn from_unit(&self, u: f64) -> ParamValue {
        let u = u.clamp(0.0, 1.0);
        match *self {
            Dimension::Int { low, high, step } => {
                let n_steps = (high - low) / step;
                let index = (u * n_steps as f64).round() as i64;
                ParamValue::Int(low + index.clamp(0, n_steps) * step)
            }
            Dimension::Float {
                low,
                high,
                step: Some(step),
            } => {
                let n_steps = ((high - low) / step + 1e-9).floor();
                let index = (u * n_steps).round();
                ParamValue::Float(round_to_step(low + index * step, step).min(high))
            }
            Dimension::Float {
                low,
                high,
                step: None,
            } => ParamValue::Float(low + u * (high - low)),
        }
    }

    fn bounds(&self) -> (f64, f64) {
        match *self {
            Dimension::Int { low, high, .. } => (low as f64, high as f64),
            Dimension::Float { low, high, .. } => (low, high),
        }
    }
}

/// Round `value` to the number of decimals `step` is written with
///
/// Keeps grid points like `0.1 * 3` at `0.3` instead of `0.30000000000000004`.
fn round_to_step(value: f64, step: f64) -> f64 {
    let decimals = (0..=12)
        .find(|&d| {
            let scaled = step * 10f64.powi(d);
            (scaled - scaled.round()).abs() < 1e-9 * scaled.abs().max(1.0)
        })
        .unwrap_or(12);
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// A sampled value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
}

impl ParamValue {
    pub fn as_f64(self) -> f64 {
        match self {
            ParamValue::Int(v) => v as f64,
            ParamValue::Float(v) => v,
        }
    }
}

/// Ordered set of named dimensions
#[derive(Debug, Clone, Default)]
pub struct SearchSpace {
    dims: Vec<(String, Dimension)>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, dim: Dimension) -> Self {
        self.dims.push((name.into(), dim));
        self
    }

    pub fn dimensions(&self) -> impl Iterator<Item = (&str, &Dimension)> {
        self.dims.iter().map(|(name, dim)| (name.as_str(), dim))
    }

    pub fn is_empty(&self) -> bool {
        self.dims.is_empty()
    }
}

/// Parameter values suggested for one trial
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialParams(pub BTreeMap<String, ParamValue>);

impl TrialParams {
    pub fn get(&self, name: &str) -> Option<ParamValue> {
        self.0.get(name).copied()
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            ParamValue::Int(v) => Some(v),
            ParamValue::Float(_) => None,
        }
    }

    pub fn float(&self, name: &str) -> Option<f64> {
        self.get(name).map(ParamValue::as_f64)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        self.0.insert(name.into(), value);
    }
}
