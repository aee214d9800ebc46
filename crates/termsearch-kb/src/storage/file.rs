use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::data::{StoreError, TermId, TermRecord};
use crate::storage::Corpus;
use crate::traits::TermRepository;

/// Term repository persisted as a JSON array of records.
///
/// The whole corpus is kept in memory. Every write produces the new snapshot,
/// writes it to a temporary file next to the target and renames it over the
/// target; the in-memory copy changes only after the rename succeeded.
pub struct JsonFileTermRepository {
    path: PathBuf,
    corpus: RwLock<Corpus>,
}

impl JsonFileTermRepository {
    /// Opens the repository at `path`; a missing file is an empty corpus.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let records: Vec<TermRecord> = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let corpus = Corpus::from_records(records)?;
        info!(path = %path.display(), records = corpus.len(), "Term repository opened");
        Ok(Self {
            path,
            corpus: RwLock::new(corpus),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, corpus: &Corpus) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec_pretty(corpus.records())?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), records = corpus.len(), bytes = bytes.len(), "Term repository persisted");
        Ok(())
    }
}

#[async_trait]
impl TermRepository for JsonFileTermRepository {
    async fn scan_all(&self) -> Result<Vec<TermRecord>, StoreError> {
        Ok(self.corpus.read().await.records().to_vec())
    }

    async fn get_by_ids(&self, ids: &[TermId]) -> Result<Vec<Option<TermRecord>>, StoreError> {
        Ok(self.corpus.read().await.get_by_ids(ids))
    }

    async fn upsert(&self, record: TermRecord) -> Result<(), StoreError> {
        let mut current = self.corpus.write().await;
        let mut next = current.clone();
        next.upsert(record)?;
        self.persist(&next).await?;
        *current = next;
        Ok(())
    }

    async fn replace_all(&self, records: Vec<TermRecord>) -> Result<(), StoreError> {
        let next = Corpus::from_records(records)?;
        let mut current = self.corpus.write().await;
        self.persist(&next).await?;
        *current = next;
        Ok(())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.corpus.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::record;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_file_opens_empty() {
        let dir = tempdir().unwrap();
        let repo = JsonFileTermRepository::open(dir.path().join("terms.json")).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("terms.json");

        let a = record("a", Some(vec![1.0, 0.0]));
        let b = record("b", None);
        {
            let repo = JsonFileTermRepository::open(&path).await.unwrap();
            repo.replace_all(vec![a.clone(), b.clone()]).await.unwrap();
        }

        let reopened = JsonFileTermRepository::open(&path).await.unwrap();
        assert_eq!(reopened.scan_all().await.unwrap(), vec![a, b]);
        assert!(!dir.path().join("nested").join("terms.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_rejected_write_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("terms.json");
        let repo = JsonFileTermRepository::open(&path).await.unwrap();
        repo.upsert(record("a", Some(vec![1.0, 0.0]))).await.unwrap();

        let err = repo.upsert(record("b", Some(vec![1.0]))).await.unwrap_err();
        assert!(matches!(err, StoreError::DimensionMismatch { .. }));

        let reopened = JsonFileTermRepository::open(&path).await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("terms.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();

        assert!(matches!(
            JsonFileTermRepository::open(&path).await,
            Err(StoreError::Serialization(_))
        ));
    }
}
