//! Config module - scenario and tuning YAML files
//!
//! Public interface:
//! - `load_scenario()` - read and validate a scenario config
//! - `load_tuning()` - read and validate a tuning config
//! - `load_raw_yaml()` - untyped document, used when rewriting a scenario
//!
//! Dataset and output paths have `~` expanded. Relative paths are resolved
//! against the working directory, not the config file.
//!
//! # Example
//!
//! ```no_run
//! use musubi_eval::config;
//! use std::path::Path;
//!
//! let scenario = config::load_scenario(Path::new("scenarios/basic.yaml"))?;
//! println!("{} parameter sets", scenario.search.params.len());
//! # Ok::<(), anyhow::Error>(())
//! ```

mod internal;

pub use internal::{
    load_raw_yaml, load_scenario, load_tuning, ConstraintsSection, DatasetPaths, FloatRange,
    IngestionSection, IntRange, ObjectiveSection, OutputSection, ScenarioConfig, SearchSection,
    SearchSpaceSection, StudySection, TuningConfig, TuningOutputSection, WarmupSection,
};
