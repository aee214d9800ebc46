use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::data::{EmbeddingError, EmbeddingVector, StoreError, TermId, TermRecord};
use crate::traits::{EmbeddingProvider, TermRepository};

/// Builds a record with a fresh id, placeholder definition and the given embedding.
pub fn record(term: &str, embedding: Option<EmbeddingVector>) -> TermRecord {
    TermRecord {
        id: TermId::new_v4(),
        term: term.to_string(),
        english: String::new(),
        definition: format!("definition of {}", term),
        embedding,
        source: "test".to_string(),
        embedding_text: term.to_string(),
        created_at: Utc::now(),
    }
}

/// Embedding provider answering from a fixed text-to-vector table.
///
/// Unknown texts get the default vector if one is set, otherwise a provider
/// error. Counts `encode` calls and records each batch size.
pub struct StaticEmbeddingProvider {
    dimension: usize,
    vectors: HashMap<String, EmbeddingVector>,
    default: Option<EmbeddingVector>,
    failure: Option<EmbeddingError>,
    encode_calls: AtomicUsize,
    batch_sizes: Mutex<Vec<usize>>,
}

impl StaticEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: HashMap::new(),
            default: None,
            failure: None,
            encode_calls: AtomicUsize::new(0),
            batch_sizes: Mutex::new(Vec::new()),
        }
    }

    pub fn with_vector(mut self, text: impl Into<String>, vector: EmbeddingVector) -> Self {
        self.vectors.insert(text.into(), vector);
        self
    }

    pub fn with_default(mut self, vector: EmbeddingVector) -> Self {
        self.default = Some(vector);
        self
    }

    /// Every `encode` call fails with `error`.
    pub fn failing_with(mut self, error: EmbeddingError) -> Self {
        self.failure = Some(error);
        self
    }

    pub fn encode_calls(&self) -> usize {
        self.encode_calls.load(Ordering::SeqCst)
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().clone()
    }
}

#[async_trait]
impl EmbeddingProvider for StaticEmbeddingProvider {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "static"
    }

    async fn encode(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, EmbeddingError> {
        self.encode_calls.fetch_add(1, Ordering::SeqCst);
        self.batch_sizes.lock().push(texts.len());

        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        texts
            .iter()
            .map(|text| {
                self.vectors
                    .get(text)
                    .or(self.default.as_ref())
                    .cloned()
                    .ok_or_else(|| EmbeddingError::Provider(format!("no vector for '{}'", text)))
            })
            .collect()
    }
}

/// Repository whose every operation fails.
#[derive(Debug, Default)]
pub struct FailingTermRepository;

impl FailingTermRepository {
    fn error() -> StoreError {
        StoreError::Backend("repository unavailable".to_string())
    }
}

#[async_trait]
impl TermRepository for FailingTermRepository {
    async fn scan_all(&self) -> Result<Vec<TermRecord>, StoreError> {
        Err(Self::error())
    }

    async fn get_by_ids(&self, _ids: &[TermId]) -> Result<Vec<Option<TermRecord>>, StoreError> {
        Err(Self::error())
    }

    async fn upsert(&self, _record: TermRecord) -> Result<(), StoreError> {
        Err(Self::error())
    }

    async fn replace_all(&self, _records: Vec<TermRecord>) -> Result<(), StoreError> {
        Err(Self::error())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Err(Self::error())
    }
}
