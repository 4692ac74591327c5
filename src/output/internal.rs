//! Internal implementation for output module

use anyhow::{Context, Result};
use serde::Serialize;
use serde_yaml::{Mapping, Value as YamlValue};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::{self, OutputSection, TuningConfig};
use crate::scenario::{ParamRun, ScenarioReport};
use crate::tuning::{TrialResult, TunedParams, TuningReport};

/// Artifact name -> written path
pub type Artifacts = BTreeMap<String, PathBuf>;

const RUN_CSV_HEADER: &str =
    "name,recall_at_k,mrr,ndcg_at_k,latency_mean_ms,latency_p50_ms,latency_p95_ms";

const TUNING_CSV_HEADER: &str = "trial,k,ef,alpha,recall_at_k,mrr,ndcg_at_k,latency_mean_ms,latency_p95_ms,score,constraint_violated,status";

pub fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

// =============================================================================
// Scenario results
// =============================================================================

pub fn save_results(report: &ScenarioReport, output: &OutputSection, stamp: &str) -> Result<Artifacts> {
    ensure_dir(&output.dir)?;
    let mut artifacts = Artifacts::new();

    if output.save_json {
        let path = output.dir.join(format!("{}_{}.json", output.save_prefix, stamp));
        write_json(&path, report)?;
        artifacts.insert("json".to_string(), path);
    }

    if output.save_csv {
        let path = output.dir.join(format!("{}_{}.csv", output.save_prefix, stamp));
        write_file(&path, &run_csv(&report.runs))?;
        artifacts.insert("csv".to_string(), path);
    }

    Ok(artifacts)
}

fn run_csv(runs: &[ParamRun]) -> String {
    let mut out = String::new();
    out.push_str(RUN_CSV_HEADER);
    out.push('\n');
    for run in runs {
        out.push_str(&format!(
            "{},{:.6},{:.6},{:.6},{:.3},{:.3},{:.3}\n",
            csv_field(&run.name),
            run.metrics.recall_at_k,
            run.metrics.mrr,
            run.metrics.ndcg_at_k,
            run.latency_ms.mean,
            run.latency_ms.p50.unwrap_or(0.0),
            run.latency_ms.p95.unwrap_or(0.0),
        ));
    }
    out
}

// =============================================================================
// Tuning results
// =============================================================================

pub fn save_tuning_results(report: &TuningReport, cfg: &TuningConfig, stamp: &str) -> Result<Artifacts> {
    let output = &cfg.output;
    ensure_dir(&output.dir)?;
    let mut artifacts = Artifacts::new();

    if output.save_history_json {
        let path = output.dir.join(format!("tuning_{}.json", stamp));
        write_json(&path, report)?;
        artifacts.insert("history_json".to_string(), path);
    }

    if output.save_history_csv {
        let path = output.dir.join(format!("tuning_{}.csv", stamp));
        write_file(&path, &tuning_csv(&report.trials))?;
        artifacts.insert("history_csv".to_string(), path);
    }

    if output.save_best_yaml {
        #[derive(Serialize)]
        struct BestParams<'a> {
            best_params: &'a TunedParams,
        }

        let path = output.dir.join(format!("best_params_{}.yaml", stamp));
        let yaml = serde_yaml::to_string(&BestParams {
            best_params: &report.best_params,
        })
        .context("Failed to serialize best params")?;
        write_file(&path, &yaml)?;
        artifacts.insert("best_yaml".to_string(), path);

        if let Some(path) = save_best_scenario(cfg, &report.best_params, stamp)? {
            artifacts.insert("best_scenario".to_string(), path);
        }
    }

    Ok(artifacts)
}

fn tuning_csv(trials: &[TrialResult]) -> String {
    let mut out = String::new();
    out.push_str(TUNING_CSV_HEADER);
    out.push('\n');
    for trial in trials {
        out.push_str(&format!(
            "{},{},{},{},{:.6},{:.6},{:.6},{:.3},{:.3},{:.6},{},{}\n",
            trial.number,
            trial.params.k,
            trial.params.ef,
            trial.params.alpha,
            trial.metrics.recall_at_k,
            trial.metrics.mrr,
            trial.metrics.ndcg_at_k,
            trial.latency_ms.mean,
            trial.latency_ms.p95,
            trial.score,
            trial.constraint_violated,
            csv_field(&trial.status),
        ));
    }
    out
}

/// Base scenario with `search.params` replaced by the single best point
///
/// Returns `None` when the base scenario cannot be read back; the other
/// artifacts are still kept.
fn save_best_scenario(cfg: &TuningConfig, best: &TunedParams, stamp: &str) -> Result<Option<PathBuf>> {
    #[derive(Serialize)]
    struct TunedEntry {
        name: &'static str,
        k: usize,
        ef: u32,
        alpha: f64,
    }

    let mut raw = match config::load_raw_yaml(&cfg.base_scenario) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %format!("{:#}", e), "skipping best scenario output");
            return Ok(None);
        }
    };
    let Some(root) = raw.as_mapping_mut() else {
        warn!(path = %cfg.base_scenario.display(), "base scenario is not a mapping, skipping best scenario output");
        return Ok(None);
    };

    let entry = serde_yaml::to_value(vec![TunedEntry {
        name: "tuned_best",
        k: best.k,
        ef: best.ef,
        alpha: best.alpha,
    }])
    .context("Failed to serialize tuned params")?;

    let mut search = root
        .get("search")
        .and_then(YamlValue::as_mapping)
        .cloned()
        .unwrap_or_else(Mapping::new);
    search.insert("params".into(), entry);
    root.insert("search".into(), YamlValue::Mapping(search));

    let path = cfg.output.dir.join(format!("best_scenario_{}.yaml", stamp));
    let yaml = serde_yaml::to_string(&raw).context("Failed to serialize best scenario")?;
    write_file(&path, &yaml)?;
    Ok(Some(path))
}

// =============================================================================
// Helpers
// =============================================================================

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize results")?;
    write_file(path, &json)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "wrote output");
    Ok(())
}

/// Quote a CSV field when it contains a delimiter, quote or newline
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_timestamp_format() {
        let stamp = timestamp();
        assert_eq!(stamp.len(), 15);
        assert_eq!(&stamp[8..9], "_");
        assert!(stamp.chars().filter(|c| *c != '_').all(|c| c.is_ascii_digit()));
    }
}
