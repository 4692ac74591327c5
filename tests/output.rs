//! Result files written for scenario runs and tuning studies

mod common;

use std::fs;
use std::path::Path;
use std::time::Duration;

use common::{two_doc_dataset, FakeGateway, TWO_DOC_SCENARIO};
use musubi_eval::config::load_scenario;
use musubi_eval::output::{save_results_at, save_tuning_results_at};
use musubi_eval::{ManualClock, ParamTuner, ScenarioConfig, ScenarioRunner, TuningConfig};

const STAMP: &str = "20261015_093000";

fn scenario_in(dir: &Path) -> ScenarioConfig {
    let mut cfg = ScenarioConfig::from_yaml_str(TWO_DOC_SCENARIO).unwrap();
    cfg.output.dir = dir.to_path_buf();
    cfg
}

#[test]
fn test_scenario_json_and_csv() {
    let tmp = tempfile::tempdir().unwrap();
    let cfg = scenario_in(tmp.path());
    let reader = two_doc_dataset();
    let gateway = FakeGateway::echoing_two_docs();
    let clock = ManualClock::with_tick(Duration::from_millis(1));
    let report = ScenarioRunner::new(&reader, &gateway, &clock).run(&cfg).unwrap();

    let artifacts = save_results_at(&report, &cfg.output, STAMP).unwrap();

    let json_path = tmp.path().join("run_20261015_093000.json");
    let csv_path = tmp.path().join("run_20261015_093000.csv");
    assert_eq!(artifacts["json"], json_path);
    assert_eq!(artifacts["csv"], csv_path);

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(json["config"]["base_url"], "http://musubi.test");
    assert_eq!(json["runs"][1]["name"], "wide");
    assert_eq!(json["runs"][1]["per_query"][0]["query_id"], "q1");
    assert_eq!(json["runs"][1]["per_query"][0]["recall_at_k"], 1.0);

    let csv = fs::read_to_string(&csv_path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines,
        vec![
            "name,recall_at_k,mrr,ndcg_at_k,latency_mean_ms,latency_p50_ms,latency_p95_ms",
            "narrow,1.000000,1.000000,1.000000,1.000,1.000,1.000",
            "wide,1.000000,1.000000,1.000000,1.000,1.000,1.000",
        ]
    );
}

#[test]
fn test_missing_percentiles_written_as_zero() {
    let tmp = tempfile::tempdir().unwrap();
    let mut cfg = scenario_in(tmp.path());
    cfg.output.save_json = false;
    cfg.output.save_prefix = "empty".to_string();
    let mut reader = two_doc_dataset();
    reader.queries.clear();
    let gateway = FakeGateway::echoing_two_docs();
    let clock = ManualClock::new();
    let report = ScenarioRunner::new(&reader, &gateway, &clock).run(&cfg).unwrap();

    let artifacts = save_results_at(&report, &cfg.output, STAMP).unwrap();

    assert!(!artifacts.contains_key("json"));
    assert!(!tmp.path().join("empty_20261015_093000.json").exists());
    let csv = fs::read_to_string(&artifacts["csv"]).unwrap();
    assert!(csv.contains("narrow,0.000000,0.000000,0.000000,0.000,0.000,0.000"));
}

#[test]
fn test_output_directory_is_created() {
    let tmp = tempfile::tempdir().unwrap();
    let nested = tmp.path().join("a").join("b");
    let cfg = scenario_in(&nested);
    let reader = two_doc_dataset();
    let gateway = FakeGateway::echoing_two_docs();
    let clock = ManualClock::new();
    let report = ScenarioRunner::new(&reader, &gateway, &clock).run(&cfg).unwrap();

    let artifacts = save_results_at(&report, &cfg.output, STAMP).unwrap();

    assert_eq!(artifacts.len(), 2);
    assert!(artifacts.values().all(|p| p.starts_with(&nested) && p.exists()));
}

/// Base scenario on disk plus a tuning config pointing at it
fn tuning_setup(dir: &Path, extra: &str) -> (ScenarioConfig, TuningConfig) {
    let base_path = dir.join("base.yaml");
    let base_yaml = TWO_DOC_SCENARIO.replace("search:\n", "search:\n  filter_merge: and\n");
    fs::write(&base_path, base_yaml).unwrap();

    let tuning_yaml = format!(
        r#"
base_scenario: {}
study: {{n_trials: 3, sampler_seed: 11}}
search_space:
  k: {{low: 2, high: 8, step: 2}}
  ef: {{low: 32, high: 64}}
  alpha: {{low: 0.0, high: 1.0}}
output:
  dir: {}
{}"#,
        base_path.display(),
        dir.join("tuning").display(),
        extra
    );
    let tuning = TuningConfig::from_yaml_str(&tuning_yaml).unwrap();
    let base = load_scenario(&base_path).unwrap();
    (base, tuning)
}

#[test]
fn test_tuning_artifacts() {
    let tmp = tempfile::tempdir().unwrap();
    let (base, cfg) = tuning_setup(tmp.path(), "");
    let reader = two_doc_dataset();
    let gateway = FakeGateway::echoing_two_docs();
    let clock = ManualClock::with_tick(Duration::from_millis(1));
    let report = ParamTuner::new(&reader, &gateway, &clock)
        .run_with_base(&cfg, &base)
        .unwrap();

    let artifacts = save_tuning_results_at(&report, &cfg, STAMP).unwrap();

    let out = tmp.path().join("tuning");
    assert_eq!(artifacts["history_json"], out.join("tuning_20261015_093000.json"));
    assert_eq!(artifacts["history_csv"], out.join("tuning_20261015_093000.csv"));
    assert_eq!(artifacts["best_yaml"], out.join("best_params_20261015_093000.yaml"));
    assert_eq!(artifacts["best_scenario"], out.join("best_scenario_20261015_093000.yaml"));

    let history: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&artifacts["history_json"]).unwrap()).unwrap();
    assert_eq!(history["n_trials"], 3);
    assert_eq!(history["trials"].as_array().unwrap().len(), 3);
    assert_eq!(history["trials"][0]["status"], "completed");

    let csv = fs::read_to_string(&artifacts["history_csv"]).unwrap();
    assert_eq!(csv.lines().count(), 4);
    assert!(csv.starts_with("trial,k,ef,alpha,"));
    assert!(csv.lines().nth(1).unwrap().ends_with(",false,completed"));

    let best: serde_yaml::Value =
        serde_yaml::from_str(&fs::read_to_string(&artifacts["best_yaml"]).unwrap()).unwrap();
    assert_eq!(
        best["best_params"]["k"].as_u64(),
        Some(report.best_params.k as u64)
    );
    assert_eq!(
        best["best_params"]["ef"].as_u64(),
        Some(u64::from(report.best_params.ef))
    );

    // The rewritten scenario loads as a regular config with one tuned entry
    let tuned = load_scenario(&artifacts["best_scenario"]).unwrap();
    assert_eq!(tuned.base_url, base.base_url);
    assert_eq!(tuned.search.filter_merge, base.search.filter_merge);
    assert_eq!(tuned.search.params.len(), 1);
    let entry = &tuned.search.params[0];
    assert_eq!(entry.name, "tuned_best");
    assert_eq!(entry.k, report.best_params.k);
    assert_eq!(entry.ef, Some(report.best_params.ef));
    approx::assert_relative_eq!(entry.alpha.unwrap(), report.best_params.alpha);
}

#[test]
fn test_best_scenario_skipped_when_base_is_gone() {
    let tmp = tempfile::tempdir().unwrap();
    let (base, cfg) = tuning_setup(tmp.path(), "");
    let reader = two_doc_dataset();
    let gateway = FakeGateway::echoing_two_docs();
    let clock = ManualClock::new();
    let report = ParamTuner::new(&reader, &gateway, &clock)
        .run_with_base(&cfg, &base)
        .unwrap();
    fs::remove_file(&cfg.base_scenario).unwrap();

    let artifacts = save_tuning_results_at(&report, &cfg, STAMP).unwrap();

    assert!(artifacts.contains_key("best_yaml"));
    assert!(!artifacts.contains_key("best_scenario"));
}

#[test]
fn test_disabled_tuning_outputs() {
    let tmp = tempfile::tempdir().unwrap();
    let (base, cfg) = tuning_setup(
        tmp.path(),
        "  save_history_csv: false\n  save_best_yaml: false\n",
    );
    let reader = two_doc_dataset();
    let gateway = FakeGateway::echoing_two_docs();
    let clock = ManualClock::new();
    let report = ParamTuner::new(&reader, &gateway, &clock)
        .run_with_base(&cfg, &base)
        .unwrap();

    let artifacts = save_tuning_results_at(&report, &cfg, STAMP).unwrap();

    assert_eq!(artifacts.keys().collect::<Vec<_>>(), vec!["history_json"]);
}
