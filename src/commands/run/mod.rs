//! Run command - execute one benchmark scenario
//!
//! Public interface:
//! - `execute()` - run against the backend, persist and summarize

use anyhow::{Context, Result};
use std::time::Duration;

use musubi_eval::config::ScenarioConfig;
use musubi_eval::output;
use musubi_eval::scenario::ScenarioReport;
use musubi_eval::{JsonlDatasetReader, MusubiHttpClient, ScenarioRunner, SystemClock};

/// Execute a loaded scenario config
pub fn execute(cfg: &ScenarioConfig) -> Result<()> {
    let client = MusubiHttpClient::new(
        &cfg.base_url,
        Duration::from_secs_f64(cfg.timeout_sec),
        cfg.retry,
    )?;
    let reader = JsonlDatasetReader;
    let clock = SystemClock::new();

    let report = ScenarioRunner::new(&reader, &client, &clock)
        .run(cfg)
        .context("Scenario run failed")?;

    let artifacts = output::save_results(&report, &cfg.output)?;

    print_summary(&report);
    if !artifacts.is_empty() {
        println!();
        println!("   Saved:");
        for (name, path) in &artifacts {
            println!("   ├─ {:<6} {}", name, path.display());
        }
    }
    Ok(())
}

fn print_summary(report: &ScenarioReport) {
    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📊 Scenario results: {}", report.config.base_url);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!(
        "   {:<20} {:>10} {:>8} {:>8} {:>10} {:>10} {:>10}",
        "name", "recall@k", "mrr", "ndcg@k", "mean ms", "p50 ms", "p95 ms"
    );
    for run in &report.runs {
        println!(
            "   {:<20} {:>10.4} {:>8.4} {:>8.4} {:>10.1} {:>10} {:>10}",
            truncate(&run.name, 20),
            run.metrics.recall_at_k,
            run.metrics.mrr,
            run.metrics.ndcg_at_k,
            run.latency_ms.mean,
            fmt_ms(run.latency_ms.p50),
            fmt_ms(run.latency_ms.p95),
        );
    }
}

fn fmt_ms(value: Option<f64>) -> String {
    value.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
