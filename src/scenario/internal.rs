//! Internal implementation of the scenario runner

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use super::{FilterMerge, ScenarioRunner};
use crate::config::ScenarioConfig;
use crate::error::EvalError;
use crate::gateway::{extract_job_id, SearchRequest};
use crate::ingestion::IngestionWaiter;
use crate::latency::LatencySummary;
use crate::metrics::{compute_query_metrics, mean, QueryMetrics};
use crate::models::{Document, JsonMap, Query, SearchParam};

// =============================================================================
// Report types
// =============================================================================

/// Full result of one scenario run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub config: ConfigEcho,
    pub runs: Vec<ParamRun>,
}

/// The parts of the scenario config that identify a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEcho {
    pub base_url: String,
    pub documents: PathBuf,
    pub queries: PathBuf,
    pub search_params: Vec<SearchParam>,
}

/// Aggregated outcome for one parameter set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamRun {
    pub name: String,
    pub params: SearchParam,
    /// Means across queries
    pub metrics: QueryMetrics,
    pub latency_ms: LatencySummary,
    pub per_query: Vec<QueryRow>,
}

/// One query's measurement under one parameter set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRow {
    pub query_id: String,
    pub latency_ms: f64,
    #[serde(flatten)]
    pub metrics: QueryMetrics,
}

// =============================================================================
// Payload construction
// =============================================================================

pub(crate) fn merge_filters(
    param: Option<&JsonMap>,
    query: Option<&JsonMap>,
    strategy: FilterMerge,
) -> Option<JsonMap> {
    // Empty maps count as absent so an empty filter object is never sent
    let param = param.filter(|f| !f.is_empty());
    let query = query.filter(|f| !f.is_empty());

    match (param, query) {
        (None, None) => None,
        (Some(only), None) | (None, Some(only)) => Some(only.clone()),
        (Some(param), Some(query)) => match strategy {
            FilterMerge::QueryWins => {
                let mut merged = param.clone();
                for (key, value) in query {
                    merged.insert(key.clone(), value.clone());
                }
                Some(merged)
            }
            FilterMerge::And => {
                let mut merged = JsonMap::new();
                merged.insert(
                    "$and".to_string(),
                    json!([Value::Object(param.clone()), Value::Object(query.clone())]),
                );
                Some(merged)
            }
        },
    }
}

pub(crate) fn build_search_request(
    query: &Query,
    param: &SearchParam,
    strategy: FilterMerge,
) -> SearchRequest {
    SearchRequest {
        ef: param.ef,
        alpha: param.alpha,
        filter: merge_filters(param.filter.as_ref(), query.filter.as_ref(), strategy),
        ..SearchRequest::new(query.query.clone(), param.k)
    }
}

// =============================================================================
// Pipeline
// =============================================================================

pub(crate) fn run(runner: &ScenarioRunner<'_>, cfg: &ScenarioConfig) -> Result<ScenarioReport> {
    let documents = runner
        .reader
        .load_documents(&cfg.datasets.documents)
        .with_context(|| format!("Failed to load documents from {}", cfg.datasets.documents.display()))?;
    let queries = runner
        .reader
        .load_queries(&cfg.datasets.queries)
        .with_context(|| format!("Failed to load queries from {}", cfg.datasets.queries.display()))?;

    prepare_index(runner, cfg, &documents, &queries)?;

    let runs = cfg
        .search
        .params
        .iter()
        .map(|param| run_single_param(runner, param, &queries))
        .collect::<Result<Vec<_>>>()?;

    Ok(ScenarioReport {
        config: ConfigEcho {
            base_url: cfg.base_url.clone(),
            documents: cfg.datasets.documents.clone(),
            queries: cfg.datasets.queries.clone(),
            search_params: cfg.search.params.clone(),
        },
        runs,
    })
}

pub(crate) fn prepare_index(
    runner: &ScenarioRunner<'_>,
    cfg: &ScenarioConfig,
    documents: &[Document],
    queries: &[Query],
) -> Result<()> {
    info!("health check");
    runner.gateway.health().context("Health check failed")?;

    info!(count = documents.len(), "uploading documents");
    runner
        .gateway
        .documents_batch(documents)
        .context("Failed to upload documents")?;

    info!("starting ingestion");
    let job = runner
        .gateway
        .ingestion_start()
        .context("Failed to start ingestion")?;
    let job_id = extract_job_id(&job)?;

    info!(job_id = %job_id, "waiting for ingestion job");
    IngestionWaiter::new(
        runner.gateway,
        runner.clock,
        Duration::from_secs_f64(cfg.ingestion.poll_interval_sec),
        Duration::from_secs_f64(cfg.ingestion.timeout_sec),
    )
    .wait_ready(&job_id)?;

    wait_search_ready(
        runner,
        queries,
        Duration::from_secs_f64(cfg.warmup.timeout_sec),
        Duration::from_secs_f64(cfg.warmup.interval_sec),
    )
}

/// Retry a trivial search until it succeeds or the warm-up window closes
fn wait_search_ready(
    runner: &ScenarioRunner<'_>,
    queries: &[Query],
    timeout: Duration,
    interval: Duration,
) -> Result<()> {
    let Some(first) = queries.first() else {
        return Ok(());
    };
    let warmup = SearchRequest::new(first.query.clone(), 1);
    let started = runner.clock.now();

    loop {
        match runner.gateway.search(&warmup) {
            Ok(_) => return Ok(()),
            Err(e) => {
                let waited = runner.clock.now().saturating_sub(started);
                if waited >= timeout {
                    return Err(EvalError::SearchNotReady { waited, source: e }.into());
                }
                warn!(error = %e, "search warm-up retry after failure");
                runner.clock.sleep(interval);
            }
        }
    }
}

pub(crate) fn run_single_param(
    runner: &ScenarioRunner<'_>,
    param: &SearchParam,
    queries: &[Query],
) -> Result<ParamRun> {
    info!(param = %param.name, queries = queries.len(), "running search param set");

    let per_query = queries
        .iter()
        .map(|query| run_query(runner, param, query))
        .collect::<Result<Vec<_>>>()?;

    let column = |f: fn(&QueryRow) -> f64| per_query.iter().map(f).collect::<Vec<_>>();
    let latencies = column(|r| r.latency_ms);

    Ok(ParamRun {
        name: param.name.clone(),
        params: param.clone(),
        metrics: QueryMetrics {
            recall_at_k: mean(&column(|r| r.metrics.recall_at_k)),
            mrr: mean(&column(|r| r.metrics.mrr)),
            ndcg_at_k: mean(&column(|r| r.metrics.ndcg_at_k)),
        },
        latency_ms: LatencySummary::from_samples(&latencies),
        per_query,
    })
}

fn run_query(runner: &ScenarioRunner<'_>, param: &SearchParam, query: &Query) -> Result<QueryRow> {
    let request = build_search_request(query, param, runner.filter_merge);

    let start = runner.clock.now();
    let ranked = runner
        .gateway
        .search(&request)
        .with_context(|| format!("Search failed for query {} ({})", query.id, param.name))?;
    let latency_ms = runner.clock.now().saturating_sub(start).as_secs_f64() * 1000.0;

    Ok(QueryRow {
        query_id: query.id.clone(),
        latency_ms,
        metrics: compute_query_metrics(&query.positive_ids, &ranked, param.k),
    })
}
