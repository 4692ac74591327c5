//! Scenario runner - ingest a labeled dataset, then evaluate parameter sets
//!
//! Public interface:
//! - `ScenarioRunner::run()` - the full pipeline for one scenario config
//! - `ScenarioRunner::prepare_index()` - health, upload, ingestion wait, warm-up
//! - `ScenarioRunner::run_single_param()` - evaluate one parameter set on a ready index
//! - `build_search_request()` / `merge_filters()` - payload construction
//! - `ScenarioReport`, `ParamRun`, `QueryRow` - result structure
//!
//! Follows dependable-rust: step sequencing and aggregation are internal

mod internal;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::config::ScenarioConfig;
use crate::dataset::DatasetReader;
use crate::gateway::{SearchGateway, SearchRequest};
use crate::models::{Document, JsonMap, Query, SearchParam};

pub use internal::{ConfigEcho, ParamRun, QueryRow, ScenarioReport};

/// How a parameter set's filter combines with a query's own filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMerge {
    /// Flat key merge; the query's keys win on conflict
    #[default]
    QueryWins,
    /// `{"$and": [param_filter, query_filter]}`
    And,
}

/// Combine the two optional filters; `None` means the field is omitted
pub fn merge_filters(
    param: Option<&JsonMap>,
    query: Option<&JsonMap>,
    strategy: FilterMerge,
) -> Option<JsonMap> {
    internal::merge_filters(param, query, strategy)
}

/// Search payload for one query under one parameter set
pub fn build_search_request(query: &Query, param: &SearchParam, strategy: FilterMerge) -> SearchRequest {
    internal::build_search_request(query, param, strategy)
}

/// Drives a scenario against injected dataset, gateway and clock implementations
#[derive(Clone, Copy)]
pub struct ScenarioRunner<'a> {
    reader: &'a dyn DatasetReader,
    gateway: &'a dyn SearchGateway,
    clock: &'a dyn Clock,
    filter_merge: FilterMerge,
}

impl<'a> ScenarioRunner<'a> {
    pub fn new(
        reader: &'a dyn DatasetReader,
        gateway: &'a dyn SearchGateway,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            reader,
            gateway,
            clock,
            filter_merge: FilterMerge::default(),
        }
    }

    /// Filter strategy for `run_single_param`; `run` takes it from the config
    pub fn with_filter_merge(mut self, strategy: FilterMerge) -> Self {
        self.filter_merge = strategy;
        self
    }

    /// Load, ingest, warm up, then evaluate every configured parameter set
    ///
    /// Any fatal error aborts the whole run; there are no partial results.
    pub fn run(&self, cfg: &ScenarioConfig) -> Result<ScenarioReport> {
        internal::run(&self.with_filter_merge(cfg.search.filter_merge), cfg)
    }

    /// Health check, batch upload, ingestion wait and search warm-up
    pub fn prepare_index(
        &self,
        cfg: &ScenarioConfig,
        documents: &[Document],
        queries: &[Query],
    ) -> Result<()> {
        internal::prepare_index(self, cfg, documents, queries)
    }

    /// Evaluate one parameter set over all queries; the index must be ready
    pub fn run_single_param(&self, param: &SearchParam, queries: &[Query]) -> Result<ParamRun> {
        internal::run_single_param(self, param, queries)
    }
}
