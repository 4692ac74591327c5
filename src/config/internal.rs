//! Internal implementation for config module
//!
//! Scenario and tuning YAML files. Every section except the required keys
//! falls back to defaults; unknown keys are ignored.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::SearchParam;
use crate::optimizer::{Dimension, Direction, SamplerKind, SearchSpace};
use crate::retry::RetryPolicy;
use crate::scenario::FilterMerge;
use crate::tuning::ObjectiveMetric;

// =============================================================================
// Scenario Config
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Backend base URL, without trailing '/'
    pub base_url: String,
    pub datasets: DatasetPaths,
    pub search: SearchSection,
    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout_sec")]
    pub timeout_sec: f64,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub ingestion: IngestionSection,
    #[serde(default)]
    pub warmup: WarmupSection,
    #[serde(default)]
    pub output: OutputSection,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetPaths {
    pub documents: PathBuf,
    pub queries: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSection {
    pub params: Vec<SearchParam>,
    #[serde(default)]
    pub filter_merge: FilterMerge,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IngestionSection {
    #[serde(default = "default_poll_interval_sec")]
    pub poll_interval_sec: f64,
    #[serde(default = "default_ingestion_timeout_sec")]
    pub timeout_sec: f64,
}

impl Default for IngestionSection {
    fn default() -> Self {
        Self {
            poll_interval_sec: default_poll_interval_sec(),
            timeout_sec: default_ingestion_timeout_sec(),
        }
    }
}

/// Search readiness probing after ingestion completes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WarmupSection {
    #[serde(default = "default_warmup_timeout_sec")]
    pub timeout_sec: f64,
    #[serde(default = "default_warmup_interval_sec")]
    pub interval_sec: f64,
}

impl Default for WarmupSection {
    fn default() -> Self {
        Self {
            timeout_sec: default_warmup_timeout_sec(),
            interval_sec: default_warmup_interval_sec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSection {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_true")]
    pub save_json: bool,
    #[serde(default = "default_true")]
    pub save_csv: bool,
    #[serde(default = "default_save_prefix")]
    pub save_prefix: String,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            save_json: true,
            save_csv: true,
            save_prefix: default_save_prefix(),
        }
    }
}

fn default_request_timeout_sec() -> f64 {
    30.0
}
fn default_poll_interval_sec() -> f64 {
    1.0
}
fn default_ingestion_timeout_sec() -> f64 {
    600.0
}
fn default_warmup_timeout_sec() -> f64 {
    60.0
}
fn default_warmup_interval_sec() -> f64 {
    1.0
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("outputs")
}
fn default_save_prefix() -> String {
    "run".to_string()
}
fn default_log_level() -> String {
    "INFO".to_string()
}
fn default_true() -> bool {
    true
}

impl ScenarioConfig {
    /// Parse, fill in derived values, and validate
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let mut config: ScenarioConfig =
            serde_yaml::from_str(content).context("Failed to parse scenario config")?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    fn normalize(&mut self) {
        self.base_url = self.base_url.trim_end_matches('/').to_string();
        self.datasets.documents = expand_path(&self.datasets.documents);
        self.datasets.queries = expand_path(&self.datasets.queries);
        self.output.dir = expand_path(&self.output.dir);
        for (i, param) in self.search.params.iter_mut().enumerate() {
            if param.name.trim().is_empty() {
                param.name = format!("param_{}", i + 1);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            bail!("base_url must not be empty");
        }
        if self.search.params.is_empty() {
            bail!("search.params must be a non-empty list");
        }
        for param in &self.search.params {
            if param.k < 1 {
                bail!("search param '{}': k must be >= 1", param.name);
            }
            if param.ef == Some(0) {
                bail!("search param '{}': ef must be >= 1", param.name);
            }
        }
        validate_retry(&self.retry)?;
        duration_secs("timeout_sec", self.timeout_sec)?;
        duration_secs("ingestion.poll_interval_sec", self.ingestion.poll_interval_sec)?;
        duration_secs("ingestion.timeout_sec", self.ingestion.timeout_sec)?;
        duration_secs("warmup.timeout_sec", self.warmup.timeout_sec)?;
        duration_secs("warmup.interval_sec", self.warmup.interval_sec)?;
        Ok(())
    }
}

fn validate_retry(retry: &RetryPolicy) -> Result<()> {
    if retry.max_attempts < 1 {
        bail!("retry.max_attempts must be >= 1");
    }
    duration_secs("retry.base_backoff_sec", retry.base_backoff_sec)?;
    duration_secs("retry.max_backoff_sec", retry.max_backoff_sec)?;
    if retry.max_backoff_sec < retry.base_backoff_sec {
        bail!(
            "retry.max_backoff_sec ({}) must be >= retry.base_backoff_sec ({})",
            retry.max_backoff_sec,
            retry.base_backoff_sec
        );
    }
    Ok(())
}

fn non_negative(key: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        bail!("{} must be a non-negative number, got {}", key, value);
    }
    Ok(())
}

/// Seconds that fit in a `Duration`
fn duration_secs(key: &str, value: f64) -> Result<()> {
    non_negative(key, value)?;
    if Duration::try_from_secs_f64(value).is_err() {
        bail!("{} is too large, got {}", key, value);
    }
    Ok(())
}

fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref())
}

// =============================================================================
// Tuning Config
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningConfig {
    /// Scenario config supplying backend, dataset and retry settings
    pub base_scenario: PathBuf,
    #[serde(default)]
    pub study: StudySection,
    pub search_space: SearchSpaceSection,
    #[serde(default)]
    pub constraints: ConstraintsSection,
    #[serde(default)]
    pub objective: ObjectiveSection,
    #[serde(default)]
    pub output: TuningOutputSection,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySection {
    #[serde(default = "default_study_name")]
    pub name: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default = "default_n_trials")]
    pub n_trials: usize,
    #[serde(default)]
    pub timeout_sec: Option<f64>,
    #[serde(default)]
    pub sampler_seed: Option<u64>,
    #[serde(default)]
    pub sampler: SamplerKind,
    /// Random trials before TPE starts modeling
    #[serde(default = "default_n_startup_trials")]
    pub n_startup_trials: usize,
    /// Record failing trials and continue instead of aborting the study
    #[serde(default)]
    pub catch_errors: bool,
}

impl Default for StudySection {
    fn default() -> Self {
        Self {
            name: default_study_name(),
            direction: Direction::default(),
            n_trials: default_n_trials(),
            timeout_sec: None,
            sampler_seed: None,
            sampler: SamplerKind::default(),
            n_startup_trials: default_n_startup_trials(),
            catch_errors: false,
        }
    }
}

fn default_study_name() -> String {
    "musubi-tuning".to_string()
}
fn default_n_trials() -> usize {
    20
}
fn default_n_startup_trials() -> usize {
    10
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntRange {
    pub low: i64,
    pub high: i64,
    #[serde(default = "default_int_step")]
    pub step: i64,
}

fn default_int_step() -> i64 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloatRange {
    pub low: f64,
    pub high: f64,
    #[serde(default)]
    pub step: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchSpaceSection {
    pub k: IntRange,
    pub ef: IntRange,
    pub alpha: FloatRange,
}

impl SearchSpaceSection {
    /// Optimizer search space over `k`, `ef` and `alpha`
    pub fn to_search_space(&self) -> Result<SearchSpace> {
        Ok(SearchSpace::new()
            .with(
                "k",
                Dimension::int(self.k.low, self.k.high, self.k.step).context("search_space.k")?,
            )
            .with(
                "ef",
                Dimension::int(self.ef.low, self.ef.high, self.ef.step).context("search_space.ef")?,
            )
            .with(
                "alpha",
                Dimension::float(self.alpha.low, self.alpha.high, self.alpha.step)
                    .context("search_space.alpha")?,
            ))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintsSection {
    #[serde(default)]
    pub max_latency_p95_ms: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveSection {
    #[serde(default)]
    pub metric: ObjectiveMetric,
    /// Score cost per millisecond of p95 latency
    #[serde(default)]
    pub latency_penalty: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningOutputSection {
    #[serde(default = "default_tuning_output_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_true")]
    pub save_history_json: bool,
    #[serde(default = "default_true")]
    pub save_history_csv: bool,
    #[serde(default = "default_true")]
    pub save_best_yaml: bool,
}

impl Default for TuningOutputSection {
    fn default() -> Self {
        Self {
            dir: default_tuning_output_dir(),
            save_history_json: true,
            save_history_csv: true,
            save_best_yaml: true,
        }
    }
}

fn default_tuning_output_dir() -> PathBuf {
    PathBuf::from("outputs/tuning")
}

impl TuningConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let mut config: TuningConfig =
            serde_yaml::from_str(content).context("Failed to parse tuning config")?;
        config.base_scenario = expand_path(&config.base_scenario);
        config.output.dir = expand_path(&config.output.dir);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.study.n_trials < 1 {
            bail!("study.n_trials must be >= 1");
        }
        if let Some(timeout) = self.study.timeout_sec {
            duration_secs("study.timeout_sec", timeout)?;
        }
        if self.search_space.k.low < 1 {
            bail!("search_space.k.low must be >= 1");
        }
        if self.search_space.ef.low < 1 {
            bail!("search_space.ef.low must be >= 1");
        }
        if self.search_space.ef.high > i64::from(u32::MAX) {
            bail!("search_space.ef.high is out of range");
        }
        self.search_space.to_search_space()?;
        if let Some(max) = self.constraints.max_latency_p95_ms {
            non_negative("constraints.max_latency_p95_ms", max)?;
        }
        non_negative("objective.latency_penalty", self.objective.latency_penalty)?;
        Ok(())
    }
}

// =============================================================================
// Loading
// =============================================================================

pub fn load_scenario(path: &Path) -> Result<ScenarioConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario config: {}", path.display()))?;
    ScenarioConfig::from_yaml_str(&content)
        .with_context(|| format!("Invalid scenario config: {}", path.display()))
}

pub fn load_tuning(path: &Path) -> Result<TuningConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read tuning config: {}", path.display()))?;
    TuningConfig::from_yaml_str(&content)
        .with_context(|| format!("Invalid tuning config: {}", path.display()))
}

/// Untyped YAML document, for rewriting a config while keeping unknown keys
pub fn load_raw_yaml(path: &Path) -> Result<serde_yaml::Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}
