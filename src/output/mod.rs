//! Output module - persist scenario and tuning results
//!
//! Public interface:
//! - `save_results()` - `<prefix>_<ts>.json` and `<prefix>_<ts>.csv`
//! - `save_tuning_results()` - trial history JSON/CSV, best params and best scenario YAML
//!
//! Both return a map from artifact name (`json`, `csv`, `history_json`, ...)
//! to the path written. Disabled outputs are simply absent from the map.
//!
//! CSV metrics use 6 decimals, latencies 3; a percentile with no samples is
//! written as `0.000`.

mod internal;

use anyhow::Result;

use crate::config::{OutputSection, TuningConfig};
use crate::scenario::ScenarioReport;
use crate::tuning::TuningReport;

pub use internal::Artifacts;

/// Write a scenario report, stamped with the current local time
pub fn save_results(report: &ScenarioReport, output: &OutputSection) -> Result<Artifacts> {
    internal::save_results(report, output, &internal::timestamp())
}

/// Same as [`save_results`] with an explicit `YYYYmmdd_HHMMSS` stamp
pub fn save_results_at(report: &ScenarioReport, output: &OutputSection, stamp: &str) -> Result<Artifacts> {
    internal::save_results(report, output, stamp)
}

/// Write a tuning report, stamped with the current local time
pub fn save_tuning_results(report: &TuningReport, cfg: &TuningConfig) -> Result<Artifacts> {
    internal::save_tuning_results(report, cfg, &internal::timestamp())
}

pub fn save_tuning_results_at(report: &TuningReport, cfg: &TuningConfig, stamp: &str) -> Result<Artifacts> {
    internal::save_tuning_results(report, cfg, stamp)
}
