use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use termsearch_monitoring::SearchMetrics;

use crate::data::{
    IngestionError, TermDraft, TermId, TermRecord, TermRecordInput, TraceContext,
};
use crate::traits::{EmbeddingProvider, IndexedSearchBackend, TermRepository};

/// Summary of one corpus rebuild or import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestionReport {
    pub source: String,
    /// Records written to the repository
    pub records: usize,
    /// Records carrying an embedding
    pub embedded: usize,
    /// Embedding calls made
    pub batches: usize,
    pub dimension: Option<usize>,
    pub duration_ms: u64,
}

/// Builds the term corpus offline: composes embedding texts, embeds them in
/// bounded batches, and replaces the repository contents in one write.
pub struct IngestionPipeline {
    provider: Arc<dyn EmbeddingProvider>,
    repository: Arc<dyn TermRepository>,
    index: Option<Arc<dyn IndexedSearchBackend>>,
    batch_size: usize,
}

impl IngestionPipeline {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        repository: Arc<dyn TermRepository>,
        batch_size: usize,
    ) -> Self {
        Self {
            provider,
            repository,
            index: None,
            batch_size: batch_size.max(1),
        }
    }

    /// Also refresh `index` after every rebuild.
    pub fn with_index(mut self, index: Arc<dyn IndexedSearchBackend>) -> Self {
        self.index = Some(index);
        self
    }

    /// Embeds `drafts` and replaces the corpus with the result.
    ///
    /// Nothing is written unless every draft is valid and every batch embedded.
    #[instrument(skip(self, drafts, trace_ctx), fields(trace_id = %trace_ctx.trace_id, drafts = drafts.len()))]
    pub async fn rebuild_corpus(
        &self,
        drafts: Vec<TermDraft>,
        source: &str,
        trace_ctx: &TraceContext,
    ) -> Result<IngestionReport, IngestionError> {
        let started = Instant::now();

        for (index, draft) in drafts.iter().enumerate() {
            if draft.term.trim().is_empty() {
                return Err(IngestionError::InvalidDraft {
                    index,
                    reason: "term is empty".to_string(),
                });
            }
            if draft.definition.trim().is_empty() {
                return Err(IngestionError::InvalidDraft {
                    index,
                    reason: format!("definition of '{}' is empty", draft.term),
                });
            }
        }

        let texts: Vec<String> = drafts.iter().map(TermDraft::embedding_text).collect();

        let mut embeddings = Vec::with_capacity(texts.len());
        let mut batches = 0;
        for chunk in texts.chunks(self.batch_size) {
            let vectors = self.provider.embed_batch(chunk).await?;
            batches += 1;
            debug!(batch = batches, size = chunk.len(), "Embedded batch");
            embeddings.extend(vectors);
        }

        let created_at = Utc::now();
        let records: Vec<TermRecord> = drafts
            .into_iter()
            .zip(texts)
            .zip(embeddings)
            .map(|((draft, embedding_text), embedding)| TermRecord {
                id: TermId::new_v4(),
                term: draft.term.trim().to_string(),
                english: draft.english.trim().to_string(),
                definition: draft.definition.trim().to_string(),
                embedding,
                source: source.to_string(),
                embedding_text,
                created_at,
            })
            .collect();

        self.write_corpus(records, source, batches, started).await
    }

    /// Replaces the corpus with records embedded elsewhere.
    ///
    /// Every embedding must match the provider's dimension, so imported
    /// vectors stay comparable with query vectors.
    #[instrument(skip(self, inputs, trace_ctx), fields(trace_id = %trace_ctx.trace_id, inputs = inputs.len()))]
    pub async fn import_precomputed(
        &self,
        inputs: Vec<TermRecordInput>,
        trace_ctx: &TraceContext,
    ) -> Result<IngestionReport, IngestionError> {
        let started = Instant::now();
        let expected = self.provider.dimension();

        for (index, input) in inputs.iter().enumerate() {
            if input.term.trim().is_empty() || input.definition.trim().is_empty() {
                return Err(IngestionError::InvalidDraft {
                    index,
                    reason: "term and definition are required".to_string(),
                });
            }
            if let Some(embedding) = &input.embedding {
                if embedding.len() != expected {
                    return Err(IngestionError::DimensionMismatch {
                        expected,
                        actual: embedding.len(),
                    });
                }
            }
        }

        let source = inputs
            .first()
            .map(|input| input.source.clone())
            .unwrap_or_default();
        let created_at = Utc::now();
        let records: Vec<TermRecord> = inputs
            .into_iter()
            .map(|input| {
                let embedding_text = if input.embedding_text.trim().is_empty() {
                    TermDraft::new(&input.term, &input.english, &input.definition).embedding_text()
                } else {
                    input.embedding_text
                };
                TermRecord {
                    id: TermId::new_v4(),
                    term: input.term,
                    english: input.english,
                    definition: input.definition,
                    embedding: input.embedding,
                    source: input.source,
                    embedding_text,
                    created_at,
                }
            })
            .collect();

        self.write_corpus(records, &source, 0, started).await
    }

    async fn write_corpus(
        &self,
        records: Vec<TermRecord>,
        source: &str,
        batches: usize,
        started: Instant,
    ) -> Result<IngestionReport, IngestionError> {
        let embedded = records.iter().filter(|r| r.embedding.is_some()).count();
        let dimension = records.iter().find_map(|r| r.dimension());
        let total = records.len();

        if let Some(index) = &self.index {
            self.repository.replace_all(records.clone()).await?;
            if let Err(e) = index.rebuild(&records).await {
                warn!(
                    backend = %index.name(),
                    reason = e.kind(),
                    error = %e,
                    "Index refresh failed; searches will use the full scan"
                );
            }
        } else {
            self.repository.replace_all(records).await?;
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        SearchMetrics::record_corpus_rebuild(total, duration_ms as f64);
        info!(
            source,
            records = total,
            embedded,
            batches,
            dimension = ?dimension,
            duration_ms,
            "Corpus rebuilt"
        );

        Ok(IngestionReport {
            source: source.to_string(),
            records: total,
            embedded,
            batches,
            dimension,
            duration_ms,
        })
    }
}
