//! Validate command - check a documents/queries dataset pair
//!
//! Public interface:
//! - `execute()` - print statistics and every problem found

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

use musubi_eval::dataset::{self, DatasetValidation, FieldStats};

const DOCUMENTS_FILE: &str = "documents.jsonl";
const QUERIES_FILE: &str = "queries.jsonl";

/// Options for dataset validation
pub struct ValidateOptions {
    pub documents: Option<PathBuf>,
    pub queries: Option<PathBuf>,
    /// Directory holding documents.jsonl and queries.jsonl
    pub dataset_dir: Option<PathBuf>,
    /// Output as JSON
    pub json: bool,
}

/// Validate and report; fails when the dataset has any error
pub fn execute(options: ValidateOptions) -> Result<()> {
    let (documents, queries) = resolve_paths(&options)?;
    let report = dataset::validate_dataset(&documents, &queries)?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&documents, &queries, &report);
    }

    if !report.is_valid() {
        bail!("dataset has {} error(s)", report.errors.len());
    }
    Ok(())
}

fn resolve_paths(options: &ValidateOptions) -> Result<(PathBuf, PathBuf)> {
    let from_dir = |file: &str| options.dataset_dir.as_ref().map(|dir| dir.join(file));
    let documents = options.documents.clone().or_else(|| from_dir(DOCUMENTS_FILE));
    let queries = options.queries.clone().or_else(|| from_dir(QUERIES_FILE));

    match (documents, queries) {
        (Some(documents), Some(queries)) => Ok((documents, queries)),
        _ => bail!("provide --documents and --queries, or --dataset-dir"),
    }
}

fn print_report(documents: &Path, queries: &Path, report: &DatasetValidation) {
    println!("🔍 Dataset validation");
    println!("   Documents: {}", documents.display());
    println!("   Queries:   {}", queries.display());
    println!();

    if let Some(stats) = &report.stats {
        println!("   Statistics:");
        println!("   ├─ documents:           {}", stats.documents_count);
        println!("   ├─ queries:             {}", stats.queries_count);
        println!("   ├─ query length:        {}", fmt_stats(&stats.query_length_chars));
        println!("   ├─ positives per query: {}", fmt_stats(&stats.positive_ids_per_query));
        println!("   └─ document length:     {}", fmt_stats(&stats.doc_text_length_chars));
        println!();
    }

    if report.is_valid() {
        println!("✅ No problems found");
    } else {
        println!("❌ {} problem(s):", report.errors.len());
        for error in &report.errors {
            println!("   - {}", error);
        }
    }
}

fn fmt_stats(stats: &FieldStats) -> String {
    format!("min {} / max {} / mean {:.2}", stats.min, stats.max, stats.mean)
}
