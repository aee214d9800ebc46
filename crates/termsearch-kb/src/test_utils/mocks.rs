//! Indexed search backends with scripted behaviour

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::data::{BackendUnavailable, TermRecord};
use crate::traits::{IndexHit, IndexedSearchBackend, ScoreMetric};

/// Backend that fails every search with the same error.
pub struct FailingIndexBackend {
    error: BackendUnavailable,
    search_calls: AtomicUsize,
    rebuild_calls: AtomicUsize,
}

impl FailingIndexBackend {
    pub fn new(error: BackendUnavailable) -> Self {
        Self {
            error,
            search_calls: AtomicUsize::new(0),
            rebuild_calls: AtomicUsize::new(0),
        }
    }

    pub fn transient() -> Self {
        Self::new(BackendUnavailable::Transient("connection refused".to_string()))
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn rebuild_calls(&self) -> usize {
        self.rebuild_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IndexedSearchBackend for FailingIndexBackend {
    fn name(&self) -> &str {
        "failing"
    }

    fn score_metric(&self) -> ScoreMetric {
        ScoreMetric::Cosine
    }

    async fn search(&self, _query: &[f32], _k: usize) -> Result<Vec<IndexHit>, BackendUnavailable> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }

    async fn rebuild(&self, _records: &[TermRecord]) -> Result<(), BackendUnavailable> {
        self.rebuild_calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

/// Backend that returns a fixed hit list, whatever the query.
pub struct ScriptedIndexBackend {
    hits: Mutex<Vec<IndexHit>>,
    metric: ScoreMetric,
    search_calls: AtomicUsize,
    rebuilt_with: Mutex<Option<usize>>,
}

impl ScriptedIndexBackend {
    pub fn new(hits: Vec<IndexHit>, metric: ScoreMetric) -> Self {
        Self {
            hits: Mutex::new(hits),
            metric,
            search_calls: AtomicUsize::new(0),
            rebuilt_with: Mutex::new(None),
        }
    }

    pub fn set_hits(&self, hits: Vec<IndexHit>) {
        *self.hits.lock() = hits;
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    /// Number of records passed to the last `rebuild`, if any.
    pub fn rebuilt_with(&self) -> Option<usize> {
        *self.rebuilt_with.lock()
    }
}

#[async_trait]
impl IndexedSearchBackend for ScriptedIndexBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn score_metric(&self) -> ScoreMetric {
        self.metric
    }

    async fn search(&self, _query: &[f32], _k: usize) -> Result<Vec<IndexHit>, BackendUnavailable> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.hits.lock().clone())
    }

    async fn rebuild(&self, records: &[TermRecord]) -> Result<(), BackendUnavailable> {
        *self.rebuilt_with.lock() = Some(records.len());
        Ok(())
    }
}
