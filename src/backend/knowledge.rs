//! In-memory vector knowledge base.
//!
//! Documents are embedded as term-frequency vectors over lowercased Unicode
//! words and ranked by cosine similarity. Small enough to load at startup,
//! read-only afterwards.

use std::collections::HashMap;
use std::fmt::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use unicode_segmentation::UnicodeSegmentation;

use super::KnowledgeBase;
use crate::error::BackendError;

/// Returned when a search finds nothing.
pub const NO_DOCUMENTS: &str = "No relevant documents found in the knowledge base.";

/// A stored document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    /// Document text.
    pub content: String,
    /// Arbitrary metadata (source file, section, ...).
    #[serde(default)]
    pub metadata: Value,
}

/// One similarity-search result.
#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeHit {
    /// Document text.
    pub content: String,
    /// Document metadata.
    pub metadata: Value,
    /// Cosine similarity in `(0, 1]`.
    pub score: f64,
}

#[derive(Debug)]
struct Entry {
    document: KnowledgeDocument,
    terms: HashMap<String, f64>,
    norm: f64,
}

/// Term-frequency cosine index held in memory.
#[derive(Debug, Default)]
pub struct InMemoryKnowledgeBase {
    entries: Vec<Entry>,
}

fn term_vector(text: &str) -> (HashMap<String, f64>, f64) {
    let mut terms: HashMap<String, f64> = HashMap::new();
    for word in text.unicode_words() {
        *terms.entry(word.to_lowercase()).or_default() += 1.0;
    }
    let norm = terms.values().map(|v| v * v).sum::<f64>().sqrt();
    (terms, norm)
}

impl InMemoryKnowledgeBase {
    /// Builds an index over `documents`.
    #[must_use]
    pub fn from_documents(documents: Vec<KnowledgeDocument>) -> Self {
        let entries = documents
            .into_iter()
            .map(|document| {
                let (terms, norm) = term_vector(&document.content);
                Entry {
                    document,
                    terms,
                    norm,
                }
            })
            .collect();
        Self { entries }
    }

    /// Loads documents from a JSON array of `{content, metadata}` objects.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Load`] if the file is unreadable or malformed.
    pub fn load(path: &Path) -> Result<Self, BackendError> {
        let to_err = |message: String| BackendError::Load {
            path: path.to_path_buf(),
            message,
        };
        let text = std::fs::read_to_string(path).map_err(|e| to_err(e.to_string()))?;
        let documents: Vec<KnowledgeDocument> =
            serde_json::from_str(&text).map_err(|e| to_err(e.to_string()))?;
        tracing::debug!(documents = documents.len(), path = %path.display(), "loaded knowledge base");
        Ok(Self::from_documents(documents))
    }

    /// Number of indexed documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KnowledgeBase for InMemoryKnowledgeBase {
    fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<KnowledgeHit>, BackendError> {
        let (query_terms, query_norm) = term_vector(query);
        if query_norm == 0.0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(f64, &Entry)> = self
            .entries
            .iter()
            .filter(|e| e.norm > 0.0)
            .map(|e| {
                let dot: f64 = query_terms
                    .iter()
                    .filter_map(|(t, q)| e.terms.get(t).map(|d| q * d))
                    .sum();
                (dot / (query_norm * e.norm), e)
            })
            .filter(|(score, _)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(score, e)| KnowledgeHit {
                content: e.document.content.clone(),
                metadata: e.document.metadata.clone(),
                score,
            })
            .collect())
    }
}

/// Renders hits as the `knowledge_search` tool result.
#[must_use]
pub fn format_hits(hits: &[KnowledgeHit]) -> String {
    if hits.is_empty() {
        return NO_DOCUMENTS.to_string();
    }
    let mut out = String::new();
    for (i, hit) in hits.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n");
        }
        let _ = write!(
            out,
            "Document {}:\nContent: {}\nMetadata: {}",
            i + 1,
            hit.content,
            hit.metadata
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kb() -> InMemoryKnowledgeBase {
        InMemoryKnowledgeBase::from_documents(vec![
            KnowledgeDocument {
                content: "Product A is our flagship widget, launched in 2021.".to_string(),
                metadata: json!({"source": "catalog.md"}),
            },
            KnowledgeDocument {
                content: "Refunds are processed within five business days.".to_string(),
                metadata: json!({"source": "policy.md"}),
            },
            KnowledgeDocument {
                content: "Product B replaced the legacy gadget line.".to_string(),
                metadata: Value::Null,
            },
        ])
    }

    #[test]
    fn test_ranks_by_similarity() {
        let hits = kb()
            .similarity_search("when was product A launched", 3)
            .unwrap_or_default();
        assert!(!hits.is_empty());
        assert!(hits[0].content.starts_with("Product A"));
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_respects_k_and_drops_unrelated() {
        let hits = kb().similarity_search("product", 1).unwrap_or_default();
        assert_eq!(hits.len(), 1);
        let none = kb().similarity_search("zebra", 3).unwrap_or_default();
        assert!(none.is_empty());
        assert_eq!(format_hits(&none), NO_DOCUMENTS);
    }

    #[test]
    fn test_format_hits() {
        let hits = kb().similarity_search("refunds", 3).unwrap_or_default();
        let text = format_hits(&hits);
        assert!(text.starts_with("Document 1:\nContent: Refunds"));
        assert!(text.contains("Metadata: {\"source\":\"policy.md\"}"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let path = dir.path().join("kb.json");
        std::fs::write(&path, r#"[{"content": "hello world"}]"#).unwrap_or_else(|_| unreachable!());
        let kb = InMemoryKnowledgeBase::load(&path).unwrap_or_else(|_| unreachable!());
        assert_eq!(kb.len(), 1);

        std::fs::write(&path, "{not json").unwrap_or_else(|_| unreachable!());
        assert!(matches!(
            InMemoryKnowledgeBase::load(&path),
            Err(BackendError::Load { .. })
        ));
    }
}
