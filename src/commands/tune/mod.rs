//! Tune command - search k / ef / alpha against the backend
//!
//! Public interface:
//! - `execute()` - run the study, persist and summarize

use anyhow::{Context, Result};
use std::time::Duration;

use musubi_eval::config::{ScenarioConfig, TuningConfig};
use musubi_eval::output;
use musubi_eval::tuning::TuningReport;
use musubi_eval::{JsonlDatasetReader, MusubiHttpClient, ParamTuner, SystemClock};

/// Execute a loaded tuning config against its base scenario
pub fn execute(cfg: &TuningConfig, base: &ScenarioConfig) -> Result<()> {
    let client = MusubiHttpClient::new(
        &base.base_url,
        Duration::from_secs_f64(base.timeout_sec),
        base.retry,
    )?;
    let reader = JsonlDatasetReader;
    let clock = SystemClock::new();

    let report = ParamTuner::new(&reader, &client, &clock)
        .run_with_base(cfg, base)
        .context("Tuning failed")?;

    let artifacts = output::save_tuning_results(&report, cfg)?;

    print_summary(cfg, &report);
    if !artifacts.is_empty() {
        println!();
        println!("   Saved:");
        for (name, path) in &artifacts {
            println!("   ├─ {:<13} {}", name, path.display());
        }
    }
    Ok(())
}

fn print_summary(cfg: &TuningConfig, report: &TuningReport) {
    let violated = report.trials.iter().filter(|t| t.constraint_violated).count();
    let failed = report.trials.iter().filter(|t| !t.is_completed()).count();

    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("🎯 Tuning results: {}", report.study_name);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
    println!(
        "   Trials:     {} ({} over latency limit, {} failed)",
        report.n_trials, violated, failed
    );
    println!(
        "   Objective:  {} ({})",
        cfg.objective.metric.as_str(),
        cfg.study.direction.as_str()
    );
    if let Some(max) = cfg.constraints.max_latency_p95_ms {
        println!("   Max p95:    {:.1}ms", max);
    }
    println!();
    println!("   Best trial #{}:", report.best_trial);
    println!("   ├─ k:      {}", report.best_params.k);
    println!("   ├─ ef:     {}", report.best_params.ef);
    println!("   ├─ alpha:  {:.3}", report.best_params.alpha);
    println!("   └─ score:  {:.6}", report.best_score);
}
