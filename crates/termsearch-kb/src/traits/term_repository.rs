//! TermRepository trait definition

use async_trait::async_trait;

use crate::data::{StoreError, TermId, TermRecord};

/// Durable store of term records.
///
/// Writes belong to ingestion; retrieval only reads. A repository never holds
/// embeddings of two different dimensions at once.
#[async_trait]
pub trait TermRepository: Send + Sync {
    /// Every record, in insertion order.
    async fn scan_all(&self) -> Result<Vec<TermRecord>, StoreError>;

    /// Looks up records by id. The result is aligned with `ids`; unknown ids
    /// yield `None`.
    async fn get_by_ids(&self, ids: &[TermId]) -> Result<Vec<Option<TermRecord>>, StoreError>;

    /// Inserts or replaces one record.
    async fn upsert(&self, record: TermRecord) -> Result<(), StoreError>;

    /// Replaces the whole corpus.
    async fn replace_all(&self, records: Vec<TermRecord>) -> Result<(), StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;
}
