//! Internal implementation of the parameter tuner

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

use super::ParamTuner;
use crate::config::{ScenarioConfig, TuningConfig};
use crate::metrics::QueryMetrics;
use crate::models::SearchParam;
use crate::optimizer::{Direction, Study, TrialParams};
use crate::scenario::ScenarioRunner;

/// Score assigned to a constraint-violating trial when maximizing
pub const CONSTRAINT_PENALTY_MAXIMIZE: f64 = -1e6;
/// Score assigned to a constraint-violating trial when minimizing
pub const CONSTRAINT_PENALTY_MINIMIZE: f64 = 1e6;

const TRIAL_STATUS_COMPLETED: &str = "completed";
const TRIAL_STATUS_FAILED: &str = "failed";

/// Metric the tuner optimizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveMetric {
    #[default]
    RecallAtK,
    Mrr,
    NdcgAtK,
}

impl ObjectiveMetric {
    pub fn value(self, metrics: &QueryMetrics) -> f64 {
        match self {
            ObjectiveMetric::RecallAtK => metrics.recall_at_k,
            ObjectiveMetric::Mrr => metrics.mrr,
            ObjectiveMetric::NdcgAtK => metrics.ndcg_at_k,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ObjectiveMetric::RecallAtK => "recall_at_k",
            ObjectiveMetric::Mrr => "mrr",
            ObjectiveMetric::NdcgAtK => "ndcg_at_k",
        }
    }
}

/// Fixed score for a violated trial, signed against the direction
pub fn constraint_penalty(direction: Direction) -> f64 {
    match direction {
        Direction::Maximize => CONSTRAINT_PENALTY_MAXIMIZE,
        Direction::Minimize => CONSTRAINT_PENALTY_MINIMIZE,
    }
}

/// True when a latency ceiling is set and strictly exceeded
pub fn check_constraint(latency_p95_ms: f64, max_latency_p95_ms: Option<f64>) -> bool {
    match max_latency_p95_ms {
        Some(max) => latency_p95_ms > max,
        None => false,
    }
}

/// `metric - latency_penalty * p95`
pub fn compute_objective_score(metric_value: f64, latency_p95_ms: f64, latency_penalty: f64) -> f64 {
    metric_value - latency_penalty * latency_p95_ms
}

// =============================================================================
// Result types
// =============================================================================

/// Parameter values of one trial
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TunedParams {
    pub k: usize,
    pub ef: u32,
    pub alpha: f64,
}

impl TunedParams {
    fn from_trial(params: &TrialParams) -> Result<Self> {
        let int = |name: &str| {
            params
                .int(name)
                .ok_or_else(|| anyhow!("trial is missing integer parameter '{}'", name))
        };
        let k = usize::try_from(int("k")?).context("k out of range")?;
        let ef = u32::try_from(int("ef")?).context("ef out of range")?;
        let alpha = params
            .float("alpha")
            .ok_or_else(|| anyhow!("trial is missing parameter 'alpha'"))?;
        Ok(Self { k, ef, alpha })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialLatency {
    pub mean: f64,
    pub p95: f64,
}

/// One evaluated trial; appended to the history and never modified
///
/// A trial whose evaluation failed has `status == "failed"`, zeroed
/// metrics, latency and score, and the error chain in `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub number: usize,
    pub params: TunedParams,
    pub metrics: QueryMetrics,
    pub latency_ms: TrialLatency,
    pub score: f64,
    pub constraint_violated: bool,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TrialResult {
    fn failed(number: usize, params: TunedParams, error: &anyhow::Error) -> Self {
        Self {
            number,
            params,
            metrics: QueryMetrics {
                recall_at_k: 0.0,
                mrr: 0.0,
                ndcg_at_k: 0.0,
            },
            latency_ms: TrialLatency { mean: 0.0, p95: 0.0 },
            score: 0.0,
            constraint_violated: false,
            status: TRIAL_STATUS_FAILED.to_string(),
            error: Some(format!("{:#}", error)),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TRIAL_STATUS_COMPLETED
    }
}

/// Outcome of a tuning study
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningReport {
    pub best_trial: usize,
    pub best_params: TunedParams,
    pub best_score: f64,
    pub trials: Vec<TrialResult>,
    pub study_name: String,
    /// Number of trials in `trials`
    pub n_trials: usize,
}

// =============================================================================
// Trial loop
// =============================================================================

pub(crate) fn run(
    tuner: &mut ParamTuner<'_>,
    cfg: &TuningConfig,
    base: &ScenarioConfig,
) -> Result<TuningReport> {
    tuner.history.clear();
    tuner.queries.clear();
    tuner.ingestion_done = false;

    let space = cfg.search_space.to_search_space()?;
    let sampler = cfg
        .study
        .sampler
        .build(cfg.study.sampler_seed, cfg.study.n_startup_trials);
    let mut study = Study::new(&cfg.study.name, cfg.study.direction, space, sampler)
        .catch_errors(cfg.study.catch_errors);

    info!(
        study = %cfg.study.name,
        direction = cfg.study.direction.as_str(),
        n_trials = cfg.study.n_trials,
        "starting tuning study"
    );

    let timeout = cfg.study.timeout_sec.map(Duration::from_secs_f64);
    let clock = tuner.clock;
    study.optimize(
        |number, params| {
            let params = TunedParams::from_trial(params)?;
            match evaluate(tuner, number, params, cfg, base) {
                Ok(score) => Ok(score),
                Err(e) => {
                    tuner.history.push(TrialResult::failed(number, params, &e));
                    Err(e)
                }
            }
        },
        cfg.study.n_trials,
        timeout,
        clock,
    )?;

    let best = study.best_trial()?;
    let best_params = TunedParams::from_trial(&best.params)?;
    let best_score = best.value.unwrap_or_default();

    info!(
        trial = best.number,
        k = best_params.k,
        ef = best_params.ef,
        alpha = best_params.alpha,
        score = best_score,
        "best trial"
    );

    Ok(TuningReport {
        best_trial: best.number,
        best_params,
        best_score,
        trials: tuner.history.clone(),
        study_name: cfg.study.name.clone(),
        n_trials: tuner.history.len(),
    })
}

pub(crate) fn ensure_ingestion(tuner: &mut ParamTuner<'_>, base: &ScenarioConfig) -> Result<()> {
    if tuner.ingestion_done {
        return Ok(());
    }

    let documents = tuner
        .reader
        .load_documents(&base.datasets.documents)
        .with_context(|| format!("Failed to load documents from {}", base.datasets.documents.display()))?;
    let queries = tuner
        .reader
        .load_queries(&base.datasets.queries)
        .with_context(|| format!("Failed to load queries from {}", base.datasets.queries.display()))?;

    runner(tuner, base).prepare_index(base, &documents, &queries)?;

    tuner.queries = queries;
    tuner.ingestion_done = true;
    Ok(())
}

pub(crate) fn evaluate(
    tuner: &mut ParamTuner<'_>,
    number: usize,
    params: TunedParams,
    cfg: &TuningConfig,
    base: &ScenarioConfig,
) -> Result<f64> {
    ensure_ingestion(tuner, base)?;

    let param = SearchParam::new(format!("trial_{}", number), params.k)
        .with_ef(params.ef)
        .with_alpha(params.alpha);
    let run = runner(tuner, base).run_single_param(&param, &tuner.queries)?;

    let metric_value = cfg.objective.metric.value(&run.metrics);
    let latency_p95 = run.latency_ms.p95.unwrap_or(0.0);
    let violated = check_constraint(latency_p95, cfg.constraints.max_latency_p95_ms);

    let score = if violated {
        constraint_penalty(cfg.study.direction)
    } else {
        compute_objective_score(metric_value, latency_p95, cfg.objective.latency_penalty)
    };

    info!(
        trial = number,
        k = params.k,
        ef = params.ef,
        alpha = params.alpha,
        metric = cfg.objective.metric.as_str(),
        value = metric_value,
        p95_ms = latency_p95,
        score,
        constraint_violated = violated,
        "trial finished"
    );

    tuner.history.push(TrialResult {
        number,
        params,
        metrics: run.metrics,
        latency_ms: TrialLatency {
            mean: run.latency_ms.mean,
            p95: latency_p95,
        },
        score,
        constraint_violated: violated,
        status: TRIAL_STATUS_COMPLETED.to_string(),
        error: None,
    });

    Ok(score)
}

fn runner<'a>(tuner: &ParamTuner<'a>, base: &ScenarioConfig) -> ScenarioRunner<'a> {
    ScenarioRunner::new(tuner.reader, tuner.gateway, tuner.clock)
        .with_filter_merge(base.search.filter_merge)
}
