//! Sequential black-box optimizer
//!
//! Public interface:
//! - `SearchSpace` / `Dimension` - named integer and float ranges with optional steps
//! - `Sampler` - suggests the next point from the trial history
//! - `TpeSampler`, `RandomSampler` - the two available samplers
//! - `Study` - runs trials one at a time and tracks the best
//!
//! The objective is a plain closure `(trial_number, &TrialParams) -> Result<f64>`;
//! the optimizer knows nothing about search backends.

mod space;
mod study;
mod tpe;

use serde::{Deserialize, Serialize};

pub use space::{Dimension, ParamValue, SearchSpace, TrialParams};
pub use study::{Direction, Study, Trial, TrialState};
pub use tpe::{RandomSampler, TpeSampler};

/// Strategy for proposing the next trial's parameters
pub trait Sampler {
    fn sample(&mut self, space: &SearchSpace, history: &[Trial], direction: Direction) -> TrialParams;
}

/// Sampler selection as written in tuning configs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplerKind {
    #[default]
    Tpe,
    Random,
}

impl SamplerKind {
    pub fn build(self, seed: Option<u64>, n_startup_trials: usize) -> Box<dyn Sampler> {
        match self {
            SamplerKind::Tpe => Box::new(TpeSampler::new(seed, n_startup_trials)),
            SamplerKind::Random => Box::new(RandomSampler::new(seed)),
        }
    }
}
