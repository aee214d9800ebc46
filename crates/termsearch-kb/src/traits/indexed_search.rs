//! IndexedSearchBackend trait definition

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::data::{BackendUnavailable, TermId, TermRecord};

/// One hit reported by a native index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexHit {
    pub id: TermId,
    pub score: f32,
}

/// How a backend's scores relate to cosine similarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMetric {
    /// Scores are cosine similarities in `[-1, 1]`.
    Cosine,
    /// Scores are `(1 + cos) / 2` in `[0, 1]`, as reported by Neo4j vector indexes.
    NormalizedCosine,
}

impl ScoreMetric {
    pub fn to_cosine(&self, score: f32) -> f32 {
        match self {
            ScoreMetric::Cosine => score,
            ScoreMetric::NormalizedCosine => 2.0 * score - 1.0,
        }
    }
}

/// A native vector index that can answer top-k queries faster than a scan.
///
/// `search` either returns the complete ranking (descending, at most `k`
/// hits) or fails; there are no partial answers.
#[async_trait]
pub trait IndexedSearchBackend: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &str;

    fn score_metric(&self) -> ScoreMetric;

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<IndexHit>, BackendUnavailable>;

    /// Refreshes the index after a corpus rebuild.
    async fn rebuild(&self, _records: &[TermRecord]) -> Result<(), BackendUnavailable> {
        Ok(())
    }
}
