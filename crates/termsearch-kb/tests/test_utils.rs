//! Helpers shared by the integration tests

#![allow(dead_code)]

use std::sync::Arc;

use termsearch_kb::test_utils::{record, StaticEmbeddingProvider};
use termsearch_kb::{InMemoryTermRepository, RetrievalService, TermRecord};

pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("termsearch_kb=debug,test=debug")
        .with_test_writer()
        .try_init();
}

/// Three terms in two dimensions: `[1,0]`, `[0,1]`, `[0.9,0.1]`
pub fn toy_corpus() -> Vec<TermRecord> {
    vec![
        record("term1", Some(vec![1.0, 0.0])),
        record("term2", Some(vec![0.0, 1.0])),
        record("term3", Some(vec![0.9, 0.1])),
    ]
}

/// Provider answering `[1,0]` for every query
pub fn unit_x_provider() -> Arc<StaticEmbeddingProvider> {
    Arc::new(StaticEmbeddingProvider::new(2).with_default(vec![1.0, 0.0]))
}

pub fn scan_only_service(records: Vec<TermRecord>) -> RetrievalService {
    let repository = Arc::new(InMemoryTermRepository::with_records(records).expect("valid corpus"));
    RetrievalService::new(unit_x_provider(), repository)
}
