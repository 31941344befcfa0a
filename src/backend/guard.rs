//! Read-only enforcement for generated queries.
//!
//! Every query produced by a model passes through here before it reaches a
//! driver. A rejection is returned to the model as a tool result, so the
//! rendered messages start with `Error:` and the classifier labels them as
//! failed attempts.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// SQL keywords that alter data, schema, or connection state.
const MUTATING_KEYWORDS: &[&str] = &[
    "insert", "update", "delete", "drop", "alter", "truncate", "create", "replace", "merge",
    "grant", "revoke", "attach", "detach", "pragma", "vacuum", "reindex",
];

/// Leading keywords a read query may start with.
const READ_PREFIXES: &[&str] = &["select", "with"];

/// Document-filter operators that run server-side code or write output.
const BLOCKED_OPERATORS: &[&str] = &[
    "$where",
    "$function",
    "$accumulator",
    "$expr",
    "$out",
    "$merge",
];

/// String literals and comments, removed before keyword scanning.
static LITERALS_AND_COMMENTS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)'(?:[^']|'')*'|--[^\n]*|/\*.*?\*/").ok());

/// Why a query was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The SQL contains a data- or schema-altering keyword.
    Mutating {
        /// Offending keyword.
        keyword: String,
    },
    /// The SQL does not start with a read statement.
    NotAQuery,
    /// More than one statement was submitted.
    MultipleStatements,
    /// The document filter uses a blocked operator.
    BlockedOperator {
        /// Offending operator.
        operator: String,
    },
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mutating { keyword } => write!(
                f,
                "Error: operation not permitted ({keyword}). Only read-only SELECT queries are allowed."
            ),
            Self::NotAQuery => f.write_str(
                "Error: operation not permitted. Queries must start with SELECT or WITH.",
            ),
            Self::MultipleStatements => {
                f.write_str("Error: operation not permitted. Submit a single statement.")
            }
            Self::BlockedOperator { operator } => {
                write!(f, "Error: document operator {operator} is not permitted.")
            }
        }
    }
}

/// Lowercased word tokens of `sql` with literals and comments removed.
fn sql_words(sql: &str) -> (String, Vec<String>) {
    let stripped = LITERALS_AND_COMMENTS
        .as_ref()
        .map_or_else(|| sql.to_string(), |re| re.replace_all(sql, " ").into_owned());
    let words = stripped
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();
    (stripped, words)
}

/// Checks that `sql` is a single read-only statement.
pub fn check_sql(sql: &str) -> Result<(), Rejection> {
    let (stripped, words) = sql_words(sql);

    if let Some(keyword) = words
        .iter()
        .find(|w| MUTATING_KEYWORDS.contains(&w.as_str()))
    {
        return Err(Rejection::Mutating {
            keyword: keyword.clone(),
        });
    }

    match words.first() {
        Some(first) if READ_PREFIXES.contains(&first.as_str()) => {}
        _ => return Err(Rejection::NotAQuery),
    }

    if stripped.trim().trim_end_matches(';').contains(';') {
        return Err(Rejection::MultipleStatements);
    }

    Ok(())
}

/// Checks a parsed document filter for blocked operators at any depth.
pub fn check_document_filter(filter: &Value) -> Result<(), Rejection> {
    match filter {
        Value::Object(map) => {
            for (key, value) in map {
                let lowered = key.to_lowercase();
                if BLOCKED_OPERATORS.contains(&lowered.as_str()) {
                    return Err(Rejection::BlockedOperator {
                        operator: key.clone(),
                    });
                }
                check_document_filter(value)?;
            }
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(check_document_filter),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case("SELECT product, SUM(amount) FROM sales GROUP BY product" ; "aggregate")]
    #[test_case("select * from sales where note = 'please delete me';" ; "keyword inside literal")]
    #[test_case("WITH t AS (SELECT 1 AS x) SELECT x FROM t" ; "cte")]
    #[test_case("SELECT created_at, updated_by FROM audit" ; "keyword-like column names")]
    fn test_read_queries_pass(sql: &str) {
        assert_eq!(check_sql(sql), Ok(()));
    }

    #[test_case("DELETE FROM sales", "delete" ; "delete")]
    #[test_case("drop table sales", "drop" ; "drop")]
    #[test_case("SELECT 1; UPDATE sales SET amount = 0", "update" ; "chained update")]
    #[test_case("WITH x AS (SELECT 1) INSERT INTO t SELECT * FROM x", "insert" ; "cte insert")]
    #[test_case("PRAGMA writable_schema = 1", "pragma" ; "pragma")]
    fn test_mutations_rejected(sql: &str, keyword: &str) {
        assert_eq!(
            check_sql(sql),
            Err(Rejection::Mutating {
                keyword: keyword.to_string()
            })
        );
    }

    #[test]
    fn test_multiple_selects_rejected() {
        assert_eq!(
            check_sql("SELECT 1; SELECT 2"),
            Err(Rejection::MultipleStatements)
        );
    }

    #[test]
    fn test_non_query_rejected() {
        assert_eq!(check_sql("EXPLAIN QUERY PLAN SELECT 1"), Err(Rejection::NotAQuery));
        assert_eq!(check_sql("   "), Err(Rejection::NotAQuery));
    }

    #[test]
    fn test_rejection_text_is_classified_as_error() {
        let text = Rejection::Mutating {
            keyword: "drop".to_string(),
        }
        .to_string();
        assert!(text.starts_with("Error:"));
        assert!(crate::core::has_error(&text));
    }

    #[test]
    fn test_document_operators() {
        assert_eq!(check_document_filter(&json!({"level": "error"})), Ok(()));
        assert_eq!(
            check_document_filter(&json!({"$or": [{"a": 1}, {"$where": "sleep(1000)"}]})),
            Err(Rejection::BlockedOperator {
                operator: "$where".to_string()
            })
        );
        assert!(check_document_filter(&json!({"x": {"$expr": {"$gt": ["$a", 1]}}})).is_err());
    }
}
