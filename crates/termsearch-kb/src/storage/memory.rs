use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::data::{StoreError, TermId, TermRecord};
use crate::storage::Corpus;
use crate::traits::TermRepository;

/// In-memory term repository
#[derive(Clone, Default)]
pub struct InMemoryTermRepository {
    corpus: Arc<RwLock<Corpus>>,
}

impl InMemoryTermRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository pre-filled with `records`.
    pub fn with_records(records: Vec<TermRecord>) -> Result<Self, StoreError> {
        Ok(Self {
            corpus: Arc::new(RwLock::new(Corpus::from_records(records)?)),
        })
    }
}

#[async_trait]
impl TermRepository for InMemoryTermRepository {
    async fn scan_all(&self) -> Result<Vec<TermRecord>, StoreError> {
        Ok(self.corpus.read().await.records().to_vec())
    }

    async fn get_by_ids(&self, ids: &[TermId]) -> Result<Vec<Option<TermRecord>>, StoreError> {
        Ok(self.corpus.read().await.get_by_ids(ids))
    }

    async fn upsert(&self, record: TermRecord) -> Result<(), StoreError> {
        self.corpus.write().await.upsert(record)
    }

    async fn replace_all(&self, records: Vec<TermRecord>) -> Result<(), StoreError> {
        let corpus = Corpus::from_records(records)?;
        *self.corpus.write().await = corpus;
        Ok(())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.corpus.read().await.len())
    }
}
