//! Internal implementation for dataset module
//!
//! JSONL parsing, row conversion, and dataset validation.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::models::{Document, JsonMap, Query};

/// Parsed JSONL row with its 1-based line number
struct Row {
    line: usize,
    value: Value,
}

fn read_jsonl(path: &Path) -> Result<Vec<Row>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read dataset file: {}", path.display()))?;

    let mut rows = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: invalid JSON", path.display(), idx + 1))?;
        rows.push(Row {
            line: idx + 1,
            value,
        });
    }
    Ok(rows)
}

/// Stringify an id-like value ("d1" stays "d1", 42 becomes "42")
fn id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn optional_object(row: &JsonMap, key: &str) -> Result<Option<JsonMap>> {
    match row.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map.clone())),
        Some(other) => bail!("'{}' must be an object, got {}", key, other),
    }
}

fn as_object<'a>(row: &'a Row, path: &Path) -> Result<&'a JsonMap> {
    row.value.as_object().with_context(|| {
        format!(
            "{}:{}: row must be a JSON object",
            path.display(),
            row.line
        )
    })
}

pub(crate) fn load_documents(path: &Path) -> Result<Vec<Document>> {
    let mut docs = Vec::new();
    for row in read_jsonl(path)? {
        let obj = as_object(&row, path)?;
        let (Some(id), Some(text)) = (obj.get("id"), obj.get("text")) else {
            bail!(
                "{}:{}: document row must include 'id' and 'text'",
                path.display(),
                row.line
            );
        };
        let metadata = optional_object(obj, "metadata")
            .with_context(|| format!("{}:{}", path.display(), row.line))?;
        docs.push(Document {
            id: id_string(id),
            text: match text {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
            metadata,
        });
    }
    Ok(docs)
}

pub(crate) fn load_queries(path: &Path) -> Result<Vec<Query>> {
    let mut queries = Vec::new();
    for row in read_jsonl(path)? {
        let obj = as_object(&row, path)?;
        let (Some(id), Some(query), Some(positives)) =
            (obj.get("id"), obj.get("query"), obj.get("positive_ids"))
        else {
            bail!(
                "{}:{}: query row must include 'id', 'query', and 'positive_ids'",
                path.display(),
                row.line
            );
        };
        let Some(positives) = positives.as_array() else {
            bail!(
                "{}:{}: 'positive_ids' must be a list",
                path.display(),
                row.line
            );
        };
        let filter = optional_object(obj, "filter")
            .with_context(|| format!("{}:{}", path.display(), row.line))?;
        queries.push(Query {
            id: id_string(id),
            query: match query {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
            positive_ids: positives.iter().map(id_string).collect(),
            filter,
        });
    }
    Ok(queries)
}

// =============================================================================
// Validation
// =============================================================================

/// min / max / mean of an integer-valued field
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldStats {
    pub min: usize,
    pub max: usize,
    pub mean: f64,
}

impl FieldStats {
    fn from_values(values: &[usize]) -> Self {
        if values.is_empty() {
            return Self {
                min: 0,
                max: 0,
                mean: 0.0,
            };
        }
        let sum: usize = values.iter().sum();
        let mean = sum as f64 / values.len() as f64;
        Self {
            min: values.iter().copied().min().unwrap_or(0),
            max: values.iter().copied().max().unwrap_or(0),
            mean: (mean * 100.0).round() / 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStats {
    pub documents_count: usize,
    pub queries_count: usize,
    pub query_length_chars: FieldStats,
    pub positive_ids_per_query: FieldStats,
    pub doc_text_length_chars: FieldStats,
}

/// Everything wrong with a dataset, plus summary statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct DatasetValidation {
    pub errors: Vec<String>,
    /// Absent when a file could not be found
    pub stats: Option<DatasetStats>,
}

impl DatasetValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

fn check_required_keys(rows: &[Row], required: &[&str], label: &str) -> Vec<String> {
    let mut errors = Vec::new();
    for (idx, row) in rows.iter().enumerate() {
        for key in required {
            if row.value.get(key).is_none() {
                errors.push(format!("{}[{}]: missing required key '{}'", label, idx, key));
            }
        }
    }
    errors
}

fn check_duplicate_ids(rows: &[Row], label: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    for (idx, row) in rows.iter().enumerate() {
        let Some(id) = row.value.get("id").map(id_string) else {
            continue;
        };
        if let Some(first) = seen.get(&id) {
            errors.push(format!(
                "{}[{}]: duplicate id '{}' (first at index {})",
                label, idx, id, first
            ));
        } else {
            seen.insert(id, idx);
        }
    }
    errors
}

fn check_positive_ids_reference(queries: &[Row], doc_ids: &HashSet<String>) -> Vec<String> {
    let mut errors = Vec::new();
    for (idx, q) in queries.iter().enumerate() {
        let query_id = q.value.get("id").map(id_string).unwrap_or_else(|| "?".into());
        let positives = q
            .value
            .get("positive_ids")
            .and_then(Value::as_array)
            .map(|a| a.as_slice())
            .unwrap_or(&[]);
        for pid in positives.iter().map(id_string) {
            if !doc_ids.contains(&pid) {
                errors.push(format!(
                    "queries[{}] (id={}): positive_id '{}' not found in documents",
                    idx, query_id, pid
                ));
            }
        }
    }
    errors
}

fn str_len(row: &Row, key: &str) -> usize {
    row.value
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.chars().count())
        .unwrap_or(0)
}

fn compute_stats(documents: &[Row], queries: &[Row]) -> DatasetStats {
    let query_lengths: Vec<usize> = queries.iter().map(|q| str_len(q, "query")).collect();
    let positive_counts: Vec<usize> = queries
        .iter()
        .map(|q| {
            q.value
                .get("positive_ids")
                .and_then(Value::as_array)
                .map(|a| a.len())
                .unwrap_or(0)
        })
        .collect();
    let doc_lengths: Vec<usize> = documents.iter().map(|d| str_len(d, "text")).collect();

    DatasetStats {
        documents_count: documents.len(),
        queries_count: queries.len(),
        query_length_chars: FieldStats::from_values(&query_lengths),
        positive_ids_per_query: FieldStats::from_values(&positive_counts),
        doc_text_length_chars: FieldStats::from_values(&doc_lengths),
    }
}

pub(crate) fn validate(documents_path: &Path, queries_path: &Path) -> Result<DatasetValidation> {
    let mut errors = Vec::new();
    for path in [documents_path, queries_path] {
        if !path.exists() {
            errors.push(format!("file not found: {}", path.display()));
        }
    }
    if !errors.is_empty() {
        return Ok(DatasetValidation {
            errors,
            stats: None,
        });
    }

    let documents = read_jsonl(documents_path)?;
    let queries = read_jsonl(queries_path)?;

    errors.extend(check_required_keys(&documents, &["id", "text"], "documents"));
    errors.extend(check_required_keys(
        &queries,
        &["id", "query", "positive_ids"],
        "queries",
    ));
    errors.extend(check_duplicate_ids(&documents, "documents"));
    errors.extend(check_duplicate_ids(&queries, "queries"));

    let doc_ids: HashSet<String> = documents
        .iter()
        .filter_map(|d| d.value.get("id").map(id_string))
        .collect();
    errors.extend(check_positive_ids_reference(&queries, &doc_ids));

    Ok(DatasetValidation {
        errors,
        stats: Some(compute_stats(&documents, &queries)),
    })
}
