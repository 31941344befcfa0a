//! File-backed document store.
//!
//! Collections live at `<root>/<database>/<collection>.json` as JSON arrays.
//! Filters follow the familiar document-database query shape: field
//! equality, comparison operators, and `$and` / `$or`.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use super::DocumentBackend;
use crate::error::BackendError;

/// Maximum documents serialized into a tool result.
const MAX_DOCUMENTS: usize = 100;

/// Document store reading JSON collections from disk.
#[derive(Debug, Clone)]
pub struct JsonDocumentStore {
    root: PathBuf,
}

impl JsonDocumentStore {
    /// Creates a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Connection`] if `root` is not a directory.
    pub fn open(source_name: &str, root: &Path) -> Result<Self, BackendError> {
        if !root.is_dir() {
            return Err(BackendError::Connection {
                source_name: source_name.to_string(),
                message: format!("document store root {} is not a directory", root.display()),
            });
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    fn collection_path(&self, database: &str, collection: &str) -> Result<PathBuf, String> {
        let valid = |s: &str| {
            !s.is_empty()
                && s
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        };
        if !valid(database) || !valid(collection) {
            return Err(format!(
                "Error: invalid database or collection name ({database}.{collection})"
            ));
        }
        Ok(self.root.join(database).join(format!("{collection}.json")))
    }

    fn load_collection(&self, database: &str, collection: &str) -> Result<Vec<Value>, String> {
        let path = self.collection_path(database, collection)?;
        let text = std::fs::read_to_string(&path)
            .map_err(|_| format!("Error: collection {database}.{collection} does not exist"))?;
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Array(docs)) => Ok(docs),
            Ok(_) => Err(format!(
                "Error: collection {database}.{collection} is not an array of documents"
            )),
            Err(e) => Err(format!("Error reading collection {database}.{collection}: {e}")),
        }
    }
}

impl DocumentBackend for JsonDocumentStore {
    fn find(&self, database: &str, collection: &str, filter: &Map<String, Value>) -> String {
        let docs = match self.load_collection(database, collection) {
            Ok(docs) => docs,
            Err(message) => return message,
        };

        let mut matched = Vec::new();
        for doc in docs {
            match matches_filter(&doc, filter) {
                Ok(true) => matched.push(doc),
                Ok(false) => {}
                Err(message) => return message,
            }
            if matched.len() == MAX_DOCUMENTS {
                break;
            }
        }

        if matched.is_empty() {
            return "Query executed successfully, no results.".to_string();
        }
        serde_json::to_string(&matched).unwrap_or_else(|e| format!("Error serializing results: {e}"))
    }
}

/// Evaluates a filter document against one document.
pub fn matches_filter(doc: &Value, filter: &Map<String, Value>) -> Result<bool, String> {
    for (key, condition) in filter {
        let ok = match key.as_str() {
            "$and" => all_of(doc, condition)?,
            "$or" => any_of(doc, condition)?,
            op if op.starts_with('$') => {
                return Err(format!("Error: unsupported top-level operator {op}"));
            }
            field => matches_condition(lookup(doc, field), condition)?,
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn sub_filters(condition: &Value) -> Result<Vec<&Map<String, Value>>, String> {
    condition
        .as_array()
        .ok_or_else(|| "Error: $and/$or expects an array of filters".to_string())?
        .iter()
        .map(|v| {
            v.as_object()
                .ok_or_else(|| "Error: $and/$or entries must be objects".to_string())
        })
        .collect()
}

fn all_of(doc: &Value, condition: &Value) -> Result<bool, String> {
    for f in sub_filters(condition)? {
        if !matches_filter(doc, f)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn any_of(doc: &Value, condition: &Value) -> Result<bool, String> {
    for f in sub_filters(condition)? {
        if matches_filter(doc, f)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Resolves a dotted field path.
fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |current, part| current.get(part))
}

fn is_operator_object(condition: &Value) -> bool {
    condition
        .as_object()
        .is_some_and(|m| !m.is_empty() && m.keys().all(|k| k.starts_with('$')))
}

fn matches_condition(field: Option<&Value>, condition: &Value) -> Result<bool, String> {
    let Some(ops) = condition.as_object().filter(|_| is_operator_object(condition)) else {
        return Ok(field.is_some_and(|v| equals(v, condition)));
    };

    for (op, operand) in ops {
        let ok = match op.as_str() {
            "$eq" => field.is_some_and(|v| equals(v, operand)),
            "$ne" => !field.is_some_and(|v| equals(v, operand)),
            "$gt" => compare(field, operand).is_some_and(Ordering::is_gt),
            "$gte" => compare(field, operand).is_some_and(Ordering::is_ge),
            "$lt" => compare(field, operand).is_some_and(Ordering::is_lt),
            "$lte" => compare(field, operand).is_some_and(Ordering::is_le),
            "$in" => in_list(field, operand)?,
            "$nin" => !in_list(field, operand)?,
            "$exists" => field.is_some() == operand.as_bool().unwrap_or(true),
            other => return Err(format!("Error: unsupported operator {other}")),
        };
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Equality with array-membership semantics for array fields.
fn equals(value: &Value, expected: &Value) -> bool {
    if value == expected {
        return true;
    }
    if let (Value::Number(a), Value::Number(b)) = (value, expected) {
        return a.as_f64() == b.as_f64();
    }
    matches!(value, Value::Array(items) if items.iter().any(|item| item == expected))
}

fn compare(field: Option<&Value>, operand: &Value) -> Option<Ordering> {
    match (field?, operand) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn in_list(field: Option<&Value>, operand: &Value) -> Result<bool, String> {
    let candidates = operand
        .as_array()
        .ok_or_else(|| "Error: $in/$nin expects an array".to_string())?;
    Ok(field.is_some_and(|v| candidates.iter().any(|c| equals(v, c))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn filter(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap_or_default()
    }

    fn store() -> (tempfile::TempDir, JsonDocumentStore) {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let db = dir.path().join("logs");
        std::fs::create_dir_all(&db).unwrap_or_else(|_| unreachable!());
        let events = json!([
            {"level": "critical", "service": "api", "latency_ms": 1200, "tags": ["prod"]},
            {"level": "info", "service": "api", "latency_ms": 40, "tags": ["prod", "canary"]},
            {"level": "critical", "service": "worker", "latency_ms": 300, "meta": {"region": "eu"}}
        ]);
        std::fs::write(db.join("events.json"), events.to_string()).unwrap_or_else(|_| unreachable!());
        let store = JsonDocumentStore::open("app_logs", dir.path()).unwrap_or_else(|_| unreachable!());
        (dir, store)
    }

    #[test]
    fn test_equality_and_comparison() {
        let (_dir, store) = store();
        let out = store.find(
            "logs",
            "events",
            &filter(json!({"level": "critical", "latency_ms": {"$gte": 500}})),
        );
        let docs: Vec<Value> = serde_json::from_str(&out).unwrap_or_default();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["service"], "api");
    }

    #[test]
    fn test_or_in_and_nested_fields() {
        let doc = json!({"level": "info", "tags": ["canary"], "meta": {"region": "eu"}});
        assert_eq!(matches_filter(&doc, &filter(json!({"tags": "canary"}))), Ok(true));
        assert_eq!(matches_filter(&doc, &filter(json!({"meta.region": "eu"}))), Ok(true));
        assert_eq!(
            matches_filter(
                &doc,
                &filter(json!({"$or": [{"level": "critical"}, {"level": {"$in": ["info"]}}]}))
            ),
            Ok(true)
        );
        assert_eq!(
            matches_filter(&doc, &filter(json!({"owner": {"$exists": false}}))),
            Ok(true)
        );
        assert_eq!(matches_filter(&doc, &filter(json!({"level": {"$ne": "info"}}))), Ok(false));
    }

    #[test]
    fn test_no_match_and_missing_collection() {
        let (_dir, store) = store();
        let none = store.find("logs", "events", &filter(json!({"level": "debug"})));
        assert!(crate::core::has_error(&none));
        let missing = store.find("logs", "nope", &Map::new());
        assert!(missing.starts_with("Error:"));
        let traversal = store.find("..", "events", &Map::new());
        assert!(traversal.starts_with("Error: invalid"));
    }

    #[test]
    fn test_unsupported_operator() {
        let doc = json!({"a": 1});
        assert!(matches_filter(&doc, &filter(json!({"a": {"$regex": "x"}}))).is_err());
    }
}
