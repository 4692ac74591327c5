//! Parameter tuner - search k / ef / alpha for the best quality under a latency ceiling
//!
//! Public interface:
//! - `ParamTuner::run()` - run a study against the base scenario's backend
//! - `ParamTuner::evaluate()` - score one parameter point (ingests on first use)
//! - `check_constraint()`, `constraint_penalty()`, `compute_objective_score()` - scoring rules
//! - `TuningReport`, `TrialResult` - study outcome and append-only trial history
//!
//! A trial over the latency ceiling is not an error: it gets a fixed penalty
//! score (`CONSTRAINT_PENALTY_MAXIMIZE` / `CONSTRAINT_PENALTY_MINIMIZE`) so the
//! optimizer steers away from it.
//!
//! Follows dependable-rust: the trial loop is internal

mod internal;

use anyhow::Result;

use crate::clock::Clock;
use crate::config::{self, ScenarioConfig, TuningConfig};
use crate::dataset::DatasetReader;
use crate::gateway::SearchGateway;
use crate::models::Query;

pub use internal::{
    check_constraint, compute_objective_score, constraint_penalty, ObjectiveMetric, TrialLatency,
    TrialResult, TunedParams, TuningReport, CONSTRAINT_PENALTY_MAXIMIZE,
    CONSTRAINT_PENALTY_MINIMIZE,
};

/// Sequential tuner; holds the trial history and the one-time ingestion flag
pub struct ParamTuner<'a> {
    reader: &'a dyn DatasetReader,
    gateway: &'a dyn SearchGateway,
    clock: &'a dyn Clock,
    history: Vec<TrialResult>,
    queries: Vec<Query>,
    ingestion_done: bool,
}

impl<'a> ParamTuner<'a> {
    pub fn new(
        reader: &'a dyn DatasetReader,
        gateway: &'a dyn SearchGateway,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            reader,
            gateway,
            clock,
            history: Vec::new(),
            queries: Vec::new(),
            ingestion_done: false,
        }
    }

    /// Load the base scenario named by `cfg` and run the study
    pub fn run(&mut self, cfg: &TuningConfig) -> Result<TuningReport> {
        let base = config::load_scenario(&cfg.base_scenario)?;
        self.run_with_base(cfg, &base)
    }

    /// Run the study against an already-loaded base scenario
    ///
    /// Resets history and re-ingests on the first trial.
    pub fn run_with_base(&mut self, cfg: &TuningConfig, base: &ScenarioConfig) -> Result<TuningReport> {
        internal::run(self, cfg, base)
    }

    /// Ingest the base scenario's dataset unless already done
    pub fn ensure_ingestion(&mut self, base: &ScenarioConfig) -> Result<()> {
        internal::ensure_ingestion(self, base)
    }

    /// Score one parameter point and append it to the history
    pub fn evaluate(
        &mut self,
        number: usize,
        params: TunedParams,
        cfg: &TuningConfig,
        base: &ScenarioConfig,
    ) -> Result<f64> {
        internal::evaluate(self, number, params, cfg, base)
    }

    /// Trials evaluated so far, in order
    pub fn history(&self) -> &[TrialResult] {
        &self.history
    }

    pub fn ingestion_done(&self) -> bool {
        self.ingestion_done
    }
}
