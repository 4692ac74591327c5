//! Normalization of search responses into ranked id lists
//!
//! The backend has answered with several shapes over time:
//! - `["d1", "d2"]` or `[{"id": "d1"}, ...]`
//! - `{"results": [...]}`, `{"documents": [...]}`, `{"hits": [...]}`
//!
//! Keys are tried in that order and the first non-empty list wins.

use serde::Deserialize;
use serde_json::Value;

/// Known response shapes
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SearchResponse {
    Bare(Vec<Value>),
    Keyed {
        #[serde(default)]
        results: Option<Value>,
        #[serde(default)]
        documents: Option<Value>,
        #[serde(default)]
        hits: Option<Value>,
    },
}

/// One ranked entry: a plain id or a record carrying an `id`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResultItem {
    Id(String),
    Record { id: Value },
}

impl ResultItem {
    fn into_id(self) -> Option<String> {
        match self {
            ResultItem::Id(id) => Some(id),
            ResultItem::Record { id: Value::String(s) } => Some(s),
            ResultItem::Record { id: Value::Null } => None,
            ResultItem::Record { id } => Some(id.to_string()),
        }
    }
}

impl SearchResponse {
    /// Parse a raw response body; scalars and `null` are rejected
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Result ids in rank order; unrecognized items are skipped
    pub fn into_ids(self) -> Vec<String> {
        let items = match self {
            SearchResponse::Bare(items) => items,
            SearchResponse::Keyed {
                results,
                documents,
                hits,
            } => [results, documents, hits]
                .into_iter()
                .flatten()
                .find_map(|v| match v {
                    Value::Array(items) if !items.is_empty() => Some(items),
                    _ => None,
                })
                .unwrap_or_default(),
        };

        items
            .into_iter()
            .filter_map(|item| serde_json::from_value::<ResultItem>(item).ok())
            .filter_map(ResultItem::into_id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(value: Value) -> Vec<String> {
        SearchResponse::from_value(value).unwrap().into_ids()
    }

    #[test]
    fn test_bare_list_of_strings() {
        assert_eq!(ids(json!(["d2", "d1"])), vec!["d2", "d1"]);
    }

    #[test]
    fn test_bare_list_of_records() {
        assert_eq!(
            ids(json!([{"id": "d1", "score": 0.9}, {"id": 5}, {"score": 0.1}])),
            vec!["d1", "5"]
        );
    }

    #[test]
    fn test_keyed_priority_order() {
        let body = json!({
            "results": [],
            "documents": [{"id": "doc"}],
            "hits": [{"id": "hit"}]
        });
        assert_eq!(ids(body), vec!["doc"]);

        let body = json!({"results": ["r1"], "hits": ["h1"]});
        assert_eq!(ids(body), vec!["r1"]);

        assert_eq!(ids(json!({"hits": [{"id": "h1"}, "h2"]})), vec!["h1", "h2"]);
    }

    #[test]
    fn test_keyed_without_lists_is_empty() {
        assert!(ids(json!({"text": "not json"})).is_empty());
        assert!(ids(json!({"results": {"id": "d1"}})).is_empty());
    }

    #[test]
    fn test_scalar_is_rejected() {
        assert!(SearchResponse::from_value(json!(42)).is_err());
        assert!(SearchResponse::from_value(Value::Null).is_err());
    }
}
