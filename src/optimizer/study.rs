//! Study: sequential trial loop around a sampler

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::space::{SearchSpace, TrialParams};
use super::Sampler;
use crate::clock::Clock;
use crate::error::EvalError;

/// Whether higher or lower objective values are better
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Maximize,
    Minimize,
}

impl Direction {
    /// True when `candidate` beats `incumbent`
    pub fn is_better(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Direction::Maximize => candidate > incumbent,
            Direction::Minimize => candidate < incumbent,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Maximize => "maximize",
            Direction::Minimize => "minimize",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialState {
    Complete,
    Failed,
}

/// One evaluated point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    /// 0-based, in evaluation order
    pub number: usize,
    pub params: TrialParams,
    /// Objective value; `None` for failed trials
    pub value: Option<f64>,
    pub state: TrialState,
}

pub struct Study {
    name: String,
    direction: Direction,
    space: SearchSpace,
    sampler: Box<dyn Sampler>,
    catch_errors: bool,
    trials: Vec<Trial>,
}

impl Study {
    pub fn new(
        name: impl Into<String>,
        direction: Direction,
        space: SearchSpace,
        sampler: Box<dyn Sampler>,
    ) -> Self {
        Self {
            name: name.into(),
            direction,
            space,
            sampler,
            catch_errors: false,
            trials: Vec::new(),
        }
    }

    /// Record objective errors as failed trials and keep going
    pub fn catch_errors(mut self, catch: bool) -> Self {
        self.catch_errors = catch;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    /// Run up to `n_trials` more trials, one after another
    ///
    /// `objective` receives the trial number and suggested parameters. The
    /// timeout is measured from the call and checked before each new trial, so
    /// a running trial is never interrupted.
    pub fn optimize<F>(
        &mut self,
        mut objective: F,
        n_trials: usize,
        timeout: Option<Duration>,
        clock: &dyn Clock,
    ) -> Result<()>
    where
        F: FnMut(usize, &TrialParams) -> Result<f64>,
    {
        let started = clock.now();

        for _ in 0..n_trials {
            if let Some(timeout) = timeout {
                if clock.now().saturating_sub(started) >= timeout {
                    debug!(study = %self.name, "study timeout reached");
                    break;
                }
            }

            let number = self.trials.len();
            let params = self
                .sampler
                .sample(&self.space, &self.trials, self.direction);

            let outcome = objective(number, &params).and_then(|value| {
                if value.is_finite() {
                    Ok(value)
                } else {
                    Err(anyhow!("objective returned non-finite value {}", value))
                }
            });

            match outcome {
                Ok(value) => self.trials.push(Trial {
                    number,
                    params,
                    value: Some(value),
                    state: TrialState::Complete,
                }),
                Err(e) => {
                    self.trials.push(Trial {
                        number,
                        params,
                        value: None,
                        state: TrialState::Failed,
                    });
                    if !self.catch_errors {
                        return Err(e.context(format!("Trial {} failed", number)));
                    }
                    warn!(trial = number, error = %format!("{:#}", e), "trial failed, continuing");
                }
            }
        }

        Ok(())
    }

    /// Best completed trial for the study direction; ties keep the earliest
    pub fn best_trial(&self) -> Result<&Trial, EvalError> {
        let mut best: Option<(&Trial, f64)> = None;
        for trial in &self.trials {
            let Some(value) = trial.value else { continue };
            if trial.state != TrialState::Complete {
                continue;
            }
            match best {
                Some((_, incumbent)) if !self.direction.is_better(value, incumbent) => {}
                _ => best = Some((trial, value)),
            }
        }
        best.map(|(trial, _)| trial)
            .ok_or(EvalError::NoCompletedTrials)
    }
}
