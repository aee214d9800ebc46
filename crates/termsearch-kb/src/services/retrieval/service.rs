use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use termsearch_monitoring::SearchMetrics;

use crate::data::{
    BackendUnavailable, RankedResult, RetrievalError, TermRecord, TermSearchRequest,
    TermSearchResponse, TraceContext, MAX_QUERY_CHARS, MAX_TOP_K, MIN_TOP_K,
};
use crate::services::messages::{SearchMessage, SearchResponse, SearchResultSender};
use crate::services::stats::{RetrievalStats, ServedPath};
use crate::similarity::{similarity_percent, top_k};
use crate::traits::{EmbeddingProvider, IndexHit, IndexedSearchBackend, TermRepository};

/// Result of asking the indexed backend.
#[derive(Debug)]
pub enum IndexedOutcome {
    /// The backend produced a complete, well-formed ranking.
    Served(Vec<RankedResult>),
    /// The backend could not answer; the full scan takes over.
    Unavailable(BackendUnavailable),
}

/// Answers term searches: embed the query, try the indexed backend, and fall
/// back to an exhaustive scan of the repository whenever the backend cannot
/// answer.
///
/// Holds only shared handles, so clones are cheap and serve concurrently.
#[derive(Clone)]
pub struct RetrievalService {
    provider: Arc<dyn EmbeddingProvider>,
    repository: Arc<dyn TermRepository>,
    backend: Option<Arc<dyn IndexedSearchBackend>>,
    stats: Arc<RetrievalStats>,
}

impl RetrievalService {
    /// Creates a service without an indexed backend; every search is a full scan.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, repository: Arc<dyn TermRepository>) -> Self {
        Self {
            provider,
            repository,
            backend: None,
            stats: Arc::new(RetrievalStats::default()),
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn IndexedSearchBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn stats(&self) -> Arc<RetrievalStats> {
        Arc::clone(&self.stats)
    }

    /// Loads the repository into the indexed backend.
    ///
    /// A backend failure is logged and left to the fallback path; a repository
    /// failure is returned.
    pub async fn warm_index(&self) -> Result<(), RetrievalError> {
        let Some(backend) = &self.backend else {
            return Ok(());
        };

        let records = self.repository.scan_all().await?;
        match backend.rebuild(&records).await {
            Ok(()) => info!(backend = %backend.name(), records = records.len(), "Indexed backend warmed"),
            Err(e) => warn!(
                backend = %backend.name(),
                reason = e.kind(),
                error = %e,
                "Indexed backend could not be warmed; searches will use the full scan"
            ),
        }
        Ok(())
    }

    /// Runs the service, answering search messages from the channel.
    /// Each request is processed in a separate task.
    pub async fn run(self, mut search_rx: mpsc::Receiver<(SearchMessage, SearchResultSender)>) {
        info!("RetrievalService started");
        while let Some((message, reply)) = search_rx.recv().await {
            let service = self.clone();
            tokio::spawn(async move {
                let response = match service.search(&message.request, &message.trace_ctx).await {
                    Ok(response) => SearchResponse::Success(response),
                    Err(e) => SearchResponse::Error(e),
                };
                // The caller may have gone away
                let _ = reply.sender.send(response);
            });
        }
        info!("RetrievalService channel closed, shutting down");
    }

    /// Searches the corpus for the terms closest to `request.query`.
    #[instrument(
        skip(self, request, trace_ctx),
        fields(trace_id = %trace_ctx.trace_id, top_k = request.top_k)
    )]
    pub async fn search(
        &self,
        request: &TermSearchRequest,
        trace_ctx: &TraceContext,
    ) -> Result<TermSearchResponse, RetrievalError> {
        let started = Instant::now();
        let outcome = self.execute(request).await;
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok((results, path)) => {
                self.stats.record_served(path);
                SearchMetrics::record_served(path.as_str(), duration_ms, results.len());
                info!(path = path.as_str(), results = results.len(), duration_ms, "Search served");
                Ok(TermSearchResponse::new(request.query.clone(), results))
            }
            Err(e) => {
                self.stats.record_failure();
                SearchMetrics::record_failure(e.class().as_str());
                warn!(error = %e, class = e.class().as_str(), "Search failed");
                Err(e)
            }
        }
    }

    async fn execute(&self, request: &TermSearchRequest) -> Result<(Vec<RankedResult>, ServedPath), RetrievalError> {
        validate(request)?;

        debug!(stage = "embedding", "Embedding query");
        let query_vector = self.provider.embed(&request.query).await?;

        debug!(stage = "indexed_attempt", "Trying indexed backend");
        match self.indexed_attempt(&query_vector, request.top_k).await? {
            IndexedOutcome::Served(results) => Ok((results, ServedPath::Indexed)),
            IndexedOutcome::Unavailable(reason) => {
                if !matches!(reason, BackendUnavailable::NotConfigured) {
                    warn!(
                        reason = reason.kind(),
                        error = %reason,
                        "Indexed search unavailable, serving from full scan"
                    );
                }
                debug!(stage = "fallback_scan", "Scanning repository");
                let results = self.fallback_scan(&query_vector, request.top_k).await?;
                Ok((results, ServedPath::Fallback))
            }
        }
    }

    /// Asks the backend and resolves its hits against the repository.
    ///
    /// Backend problems become `Unavailable`; repository errors stay fatal.
    pub(crate) async fn indexed_attempt(&self, query: &[f32], k: usize) -> Result<IndexedOutcome, RetrievalError> {
        let Some(backend) = &self.backend else {
            return Ok(IndexedOutcome::Unavailable(BackendUnavailable::NotConfigured));
        };

        let metric = backend.score_metric();
        let hits = match backend.search(query, k).await {
            Ok(hits) => hits,
            Err(e) => return Ok(IndexedOutcome::Unavailable(e)),
        };

        let similarities = match check_hits(&hits, k, |score| metric.to_cosine(score)) {
            Ok(similarities) => similarities,
            Err(e) => return Ok(IndexedOutcome::Unavailable(e)),
        };

        let ids: Vec<_> = hits.iter().map(|hit| hit.id).collect();
        let records = self.repository.get_by_ids(&ids).await?;

        let mut results = Vec::with_capacity(hits.len());
        for ((hit, record), similarity) in hits.iter().zip(records).zip(similarities) {
            let record = match record {
                Some(record) if record.embedding.is_some() => record,
                Some(_) => {
                    return Ok(IndexedOutcome::Unavailable(BackendUnavailable::Malformed(format!(
                        "backend returned term {} which has no embedding",
                        hit.id
                    ))));
                }
                None => {
                    return Ok(IndexedOutcome::Unavailable(BackendUnavailable::Malformed(format!(
                        "backend returned unknown term id {}",
                        hit.id
                    ))));
                }
            };
            results.push(ranked(record, similarity));
        }

        Ok(IndexedOutcome::Served(results))
    }

    async fn fallback_scan(&self, query: &[f32], k: usize) -> Result<Vec<RankedResult>, RetrievalError> {
        let records = self.repository.scan_all().await?;
        let total = records.len();

        let candidates = records
            .iter()
            .enumerate()
            .filter_map(|(position, record)| record.embedding.as_deref().map(|v| (position, v)));
        let ranked_positions = top_k(query, candidates, k)?;

        debug!(scanned = total, returned = ranked_positions.len(), "Full scan finished");

        let mut records: Vec<Option<TermRecord>> = records.into_iter().map(Some).collect();
        Ok(ranked_positions
            .into_iter()
            .filter_map(|(position, similarity)| records[position].take().map(|r| ranked(r, similarity)))
            .collect())
    }
}

fn validate(request: &TermSearchRequest) -> Result<(), RetrievalError> {
    if request.query.is_empty() {
        return Err(RetrievalError::InvalidRequest("query must not be empty".to_string()));
    }
    let chars = request.query.chars().count();
    if chars > MAX_QUERY_CHARS {
        return Err(RetrievalError::InvalidRequest(format!(
            "query is {} characters, at most {} allowed",
            chars, MAX_QUERY_CHARS
        )));
    }
    if !(MIN_TOP_K..=MAX_TOP_K).contains(&request.top_k) {
        return Err(RetrievalError::InvalidRequest(format!(
            "top_k must be within {}..={}, got {}",
            MIN_TOP_K, MAX_TOP_K, request.top_k
        )));
    }
    Ok(())
}

/// Checks that `hits` is a complete ranking and converts scores to cosine similarity.
fn check_hits<F>(hits: &[IndexHit], k: usize, to_cosine: F) -> Result<Vec<f32>, BackendUnavailable>
where
    F: Fn(f32) -> f32,
{
    if hits.len() > k {
        return Err(BackendUnavailable::Malformed(format!(
            "{} hits returned for k = {}",
            hits.len(),
            k
        )));
    }

    let mut seen = HashSet::with_capacity(hits.len());
    let mut similarities = Vec::with_capacity(hits.len());
    for hit in hits {
        if !hit.score.is_finite() {
            return Err(BackendUnavailable::Malformed(format!(
                "non-finite score for term {}",
                hit.id
            )));
        }
        if !seen.insert(hit.id) {
            return Err(BackendUnavailable::Malformed(format!("term {} returned twice", hit.id)));
        }
        let similarity = to_cosine(hit.score).clamp(-1.0, 1.0);
        if matches!(similarities.last(), Some(&previous) if similarity > previous) {
            return Err(BackendUnavailable::Malformed("hits are not in descending order".to_string()));
        }
        similarities.push(similarity);
    }
    Ok(similarities)
}

fn ranked(record: TermRecord, similarity: f32) -> RankedResult {
    RankedResult {
        term: record.term,
        english: record.english,
        definition: record.definition,
        similarity,
        similarity_percent: similarity_percent(similarity),
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::data::TermId;
    use crate::traits::ScoreMetric;

    fn hit(score: f32) -> IndexHit {
        IndexHit {
            id: TermId::new_v4(),
            score,
        }
    }

    #[test]
    fn test_validate_bounds() {
        assert!(validate(&TermSearchRequest::new("금리", 1)).is_ok());
        assert!(validate(&TermSearchRequest::new("금리", 10)).is_ok());
        assert!(validate(&TermSearchRequest::new("금리", 0)).is_err());
        assert!(validate(&TermSearchRequest::new("금리", 11)).is_err());
        assert!(validate(&TermSearchRequest::new("", 3)).is_err());
        assert!(validate(&TermSearchRequest::new("가".repeat(500), 3)).is_ok());
        assert!(validate(&TermSearchRequest::new("가".repeat(501), 3)).is_err());
    }

    #[test]
    fn test_check_hits_converts_normalized_scores() {
        let metric = ScoreMetric::NormalizedCosine;
        let similarities = check_hits(&[hit(1.0), hit(0.75), hit(0.5)], 3, |s| metric.to_cosine(s)).unwrap();
        assert_eq!(similarities, vec![1.0, 0.5, 0.0]);
    }

    #[test]
    fn test_check_hits_rejects_malformed_rankings() {
        let identity = |s: f32| s;
        assert!(check_hits(&[hit(0.9), hit(0.8)], 1, identity).is_err());
        assert!(check_hits(&[hit(0.5), hit(0.9)], 2, identity).is_err());
        assert!(check_hits(&[hit(f32::NAN)], 1, identity).is_err());

        let repeated = hit(0.4);
        assert!(check_hits(&[repeated, repeated], 2, identity).is_err());

        assert!(check_hits(&[hit(0.9), hit(0.9), hit(0.1)], 3, identity).is_ok());
    }
}
