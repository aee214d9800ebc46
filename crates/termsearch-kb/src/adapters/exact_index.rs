use async_trait::async_trait;
use parking_lot::RwLock;
use std::cmp::Ordering;
use tracing::debug;

use crate::data::{BackendUnavailable, TermId, TermRecord};
use crate::similarity::normalize;
use crate::traits::{IndexHit, IndexedSearchBackend, ScoreMetric};

struct Snapshot {
    dimension: usize,
    ids: Vec<TermId>,
    /// Unit vectors, `dimension` floats per id, contiguous.
    vectors: Vec<f32>,
}

/// In-process exact index over unit-normalised vectors.
///
/// Cosine similarity reduces to a dot product over a flat buffer. Reports
/// `IndexMissing` until [`IndexedSearchBackend::rebuild`] has run.
#[derive(Default)]
pub struct ExactVectorIndex {
    snapshot: RwLock<Option<Snapshot>>,
}

impl ExactVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshot.read().as_ref().map_or(0, |s| s.ids.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn build(records: &[TermRecord]) -> Result<Snapshot, BackendUnavailable> {
        let mut dimension = None;
        let mut ids = Vec::new();
        let mut vectors = Vec::new();

        for record in records {
            let Some(embedding) = record.embedding.as_deref() else {
                continue;
            };
            match dimension {
                None => dimension = Some(embedding.len()),
                Some(d) if d != embedding.len() => {
                    return Err(BackendUnavailable::Malformed(format!(
                        "term '{}' has dimension {}, index has {}",
                        record.term,
                        embedding.len(),
                        d
                    )));
                }
                Some(_) => {}
            }
            ids.push(record.id);
            vectors.extend(normalize(embedding));
        }

        Ok(Snapshot {
            dimension: dimension.unwrap_or(0),
            ids,
            vectors,
        })
    }
}

#[async_trait]
impl IndexedSearchBackend for ExactVectorIndex {
    fn name(&self) -> &str {
        "exact"
    }

    fn score_metric(&self) -> ScoreMetric {
        ScoreMetric::Cosine
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<IndexHit>, BackendUnavailable> {
        let guard = self.snapshot.read();
        let snapshot = guard
            .as_ref()
            .ok_or_else(|| BackendUnavailable::IndexMissing("exact index not built".to_string()))?;

        if snapshot.ids.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != snapshot.dimension {
            return Err(BackendUnavailable::Unsupported(format!(
                "query dimension {} does not match index dimension {}",
                query.len(),
                snapshot.dimension
            )));
        }

        let query = normalize(query);
        let mut hits: Vec<IndexHit> = snapshot
            .ids
            .iter()
            .zip(snapshot.vectors.chunks_exact(snapshot.dimension))
            .map(|(&id, vector)| {
                let dot: f64 = query.iter().zip(vector).map(|(&a, &b)| a as f64 * b as f64).sum();
                let score = if dot.is_nan() { 0.0 } else { dot.clamp(-1.0, 1.0) as f32 };
                IndexHit { id, score }
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }

    async fn rebuild(&self, records: &[TermRecord]) -> Result<(), BackendUnavailable> {
        let snapshot = Self::build(records)?;
        debug!(vectors = snapshot.ids.len(), dimension = snapshot.dimension, "Exact index rebuilt");
        *self.snapshot.write() = Some(snapshot);
        Ok(())
    }
}
