//! Term records and the search request/response shapes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::identifiers::TermId;

/// Dense embedding of a text; all vectors from one provider share a length.
pub type EmbeddingVector = Vec<f32>;

/// Longest accepted query, in characters.
pub const MAX_QUERY_CHARS: usize = 500;
/// Inclusive bounds of `top_k`.
pub const MIN_TOP_K: usize = 1;
pub const MAX_TOP_K: usize = 10;
/// `top_k` used when the request omits it.
pub const DEFAULT_TOP_K: usize = 3;

/// One economic term of the corpus.
///
/// A record without an embedding is kept but excluded from ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermRecord {
    pub id: TermId,
    pub term: String,
    #[serde(default)]
    pub english: String,
    pub definition: String,
    #[serde(default)]
    pub embedding: Option<EmbeddingVector>,
    #[serde(default)]
    pub source: String,
    #[serde(default, alias = "embedding_text")]
    pub embedding_text: String,
    pub created_at: DateTime<Utc>,
}

impl TermRecord {
    pub fn dimension(&self) -> Option<usize> {
        self.embedding.as_ref().map(|v| v.len())
    }
}

/// A term as produced by the external extractor, before embedding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermDraft {
    pub term: String,
    #[serde(default)]
    pub english: String,
    pub definition: String,
}

impl TermDraft {
    pub fn new(term: impl Into<String>, english: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            english: english.into(),
            definition: definition.into(),
        }
    }

    /// Text fed to the embedding provider: `"<term> (<english>) : <definition>"`,
    /// leaving out the parts that are empty.
    pub fn embedding_text(&self) -> String {
        let mut parts = vec![self.term.trim().to_string()];
        let english = self.english.trim();
        if !english.is_empty() {
            parts.push(format!("({})", english));
        }
        let definition = self.definition.trim();
        if !definition.is_empty() {
            parts.push(format!(": {}", definition));
        }
        parts.join(" ")
    }
}

/// A precomputed record from an external ingestion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermRecordInput {
    pub term: String,
    #[serde(default)]
    pub english: String,
    pub definition: String,
    #[serde(default)]
    pub embedding: Option<EmbeddingVector>,
    #[serde(default, alias = "embedding_text")]
    pub embedding_text: String,
    #[serde(default)]
    pub source: String,
}

/// Search request as received from the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermSearchRequest {
    pub query: String,
    #[serde(default = "default_top_k", alias = "top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

impl TermSearchRequest {
    pub fn new(query: impl Into<String>, top_k: usize) -> Self {
        Self {
            query: query.into(),
            top_k,
        }
    }
}

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedResult {
    pub term: String,
    pub english: String,
    pub definition: String,
    /// Cosine similarity in `[-1, 1]`.
    pub similarity: f32,
    /// `similarity * 100`, rounded to one decimal.
    pub similarity_percent: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermSearchResponse {
    pub query: String,
    pub results: Vec<RankedResult>,
    pub count: usize,
}

impl TermSearchResponse {
    pub fn new(query: impl Into<String>, results: Vec<RankedResult>) -> Self {
        let count = results.len();
        Self {
            query: query.into(),
            results,
            count,
        }
    }
}
