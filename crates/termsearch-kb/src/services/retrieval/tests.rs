use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::{IndexedOutcome, RetrievalService};
use crate::adapters::ExactVectorIndex;
use crate::data::{
    BackendUnavailable, EmbeddingError, ErrorClass, RetrievalError, TermRecord, TermSearchRequest,
    TraceContext,
};
use crate::services::{StatsSnapshot, TermSearchClient};
use crate::storage::InMemoryTermRepository;
use crate::test_utils::{
    record, FailingIndexBackend, FailingTermRepository, ScriptedIndexBackend, StaticEmbeddingProvider,
};
use crate::traits::{IndexHit, IndexedSearchBackend, ScoreMetric};

fn toy_corpus() -> Vec<TermRecord> {
    vec![
        record("term1", Some(vec![1.0, 0.0])),
        record("term2", Some(vec![0.0, 1.0])),
        record("term3", Some(vec![0.9, 0.1])),
    ]
}

fn provider() -> Arc<StaticEmbeddingProvider> {
    Arc::new(StaticEmbeddingProvider::new(2).with_default(vec![1.0, 0.0]))
}

fn service_over(records: Vec<TermRecord>, provider: Arc<StaticEmbeddingProvider>) -> RetrievalService {
    let repository = Arc::new(InMemoryTermRepository::with_records(records).unwrap());
    RetrievalService::new(provider, repository)
}

fn terms(response: &crate::data::TermSearchResponse) -> Vec<&str> {
    response.results.iter().map(|r| r.term.as_str()).collect()
}

#[tokio::test]
async fn test_full_scan_ranks_toy_corpus() {
    let service = service_over(toy_corpus(), provider());

    let response = service
        .search(&TermSearchRequest::new("inflation", 2), &TraceContext::new_root())
        .await
        .unwrap();

    assert_eq!(terms(&response), vec!["term1", "term3"]);
    assert_eq!(response.results[0].similarity, 1.0);
    assert_eq!(response.results[0].similarity_percent, 100.0);
    assert_eq!(response.results[1].similarity_percent, 99.4);
    assert_eq!(response.count, 2);
    assert_eq!(response.query, "inflation");
}

#[tokio::test]
async fn test_corpus_without_embeddings_returns_empty_list() {
    let records = vec![record("a", None), record("b", None)];
    let service = service_over(records, provider());

    let response = service
        .search(&TermSearchRequest::new("anything", 3), &TraceContext::new_root())
        .await
        .unwrap();

    assert!(response.results.is_empty());
    assert_eq!(response.count, 0);
}

#[tokio::test]
async fn test_records_without_embedding_are_excluded_not_zero_scored() {
    let records = vec![
        record("orthogonal", Some(vec![0.0, 1.0])),
        record("unembedded", None),
        record("opposite", Some(vec![-1.0, 0.0])),
    ];
    let service = service_over(records, provider());

    let response = service
        .search(&TermSearchRequest::new("q", 10), &TraceContext::new_root())
        .await
        .unwrap();

    assert_eq!(terms(&response), vec!["orthogonal", "opposite"]);
    assert_eq!(response.results[1].similarity, -1.0);
}

#[tokio::test]
async fn test_empty_query_is_rejected_before_embedding() {
    let provider = provider();
    let service = service_over(toy_corpus(), provider.clone());

    let err = service
        .search(&TermSearchRequest::new("", 3), &TraceContext::new_root())
        .await
        .unwrap_err();

    assert!(matches!(err, RetrievalError::InvalidRequest(_)));
    assert_eq!(err.class(), ErrorClass::ClientFault);
    assert_eq!(provider.encode_calls(), 0);
}

#[tokio::test]
async fn test_out_of_range_top_k_is_rejected() {
    let provider = provider();
    let service = service_over(toy_corpus(), provider.clone());

    for top_k in [0, 11] {
        let err = service
            .search(&TermSearchRequest::new("q", top_k), &TraceContext::new_root())
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::InvalidRequest(_)));
    }
    assert_eq!(provider.encode_calls(), 0);
}

#[tokio::test]
async fn test_whitespace_query_is_empty_input() {
    let service = service_over(toy_corpus(), provider());

    let err = service
        .search(&TermSearchRequest::new("   ", 3), &TraceContext::new_root())
        .await
        .unwrap_err();

    assert!(matches!(err, RetrievalError::EmptyInput));
    assert_eq!(err.class(), ErrorClass::ClientFault);
}

#[tokio::test]
async fn test_provider_failures_are_fatal() {
    let failing = Arc::new(
        StaticEmbeddingProvider::new(2).failing_with(EmbeddingError::Provider("model not loaded".into())),
    );
    let service = service_over(toy_corpus(), failing);
    let err = service
        .search(&TermSearchRequest::new("q", 3), &TraceContext::new_root())
        .await
        .unwrap_err();
    assert!(matches!(err, RetrievalError::ProviderFailure(_)));
    assert_eq!(err.class(), ErrorClass::ServiceFailure);

    let timing_out = Arc::new(
        StaticEmbeddingProvider::new(2).failing_with(EmbeddingError::Timeout(Duration::from_millis(50))),
    );
    let service = service_over(toy_corpus(), timing_out);
    let err = service
        .search(&TermSearchRequest::new("q", 3), &TraceContext::new_root())
        .await
        .unwrap_err();
    assert!(matches!(err, RetrievalError::ProviderTimeout(_)));
}

#[tokio::test]
async fn test_repository_failure_during_fallback_is_fatal() {
    let service = RetrievalService::new(provider(), Arc::new(FailingTermRepository));

    let err = service
        .search(&TermSearchRequest::new("q", 3), &TraceContext::new_root())
        .await
        .unwrap_err();

    assert!(matches!(err, RetrievalError::Repository(_)));
    assert_eq!(err.class(), ErrorClass::ServiceFailure);
    assert_eq!(service.stats().snapshot().failures, 1);
}

#[tokio::test]
async fn test_stored_dimension_mismatch_is_fatal() {
    let records = vec![record("three-d", Some(vec![1.0, 0.0, 0.0]))];
    let service = service_over(records, provider());

    let err = service
        .search(&TermSearchRequest::new("q", 3), &TraceContext::new_root())
        .await
        .unwrap_err();

    assert!(matches!(err, RetrievalError::DimensionMismatch { query: 2, stored: 3 }));
}

#[tokio::test]
async fn test_failing_backend_falls_back_transparently() {
    let backend = Arc::new(FailingIndexBackend::transient());
    let healthy = service_over(toy_corpus(), provider());
    let degraded = service_over(toy_corpus(), provider()).with_backend(backend.clone());

    for top_k in 1..=3 {
        let request = TermSearchRequest::new("q", top_k);
        let expected = healthy.search(&request, &TraceContext::new_root()).await.unwrap();
        let actual = degraded.search(&request, &TraceContext::new_root()).await.unwrap();
        assert_eq!(actual, expected);
    }

    assert_eq!(backend.search_calls(), 3);
    assert_eq!(
        degraded.stats().snapshot(),
        StatsSnapshot {
            served_indexed: 0,
            served_fallback: 3,
            failures: 0,
        }
    );
}

#[tokio::test]
async fn test_exact_index_serves_same_response_as_fallback() {
    let corpus = toy_corpus();
    let index = Arc::new(ExactVectorIndex::new());
    index.rebuild(&corpus).await.unwrap();

    let indexed = service_over(corpus.clone(), provider()).with_backend(index);
    let scanned = service_over(corpus, provider());

    let request = TermSearchRequest::new("q", 3);
    let via_index = indexed.search(&request, &TraceContext::new_root()).await.unwrap();
    let via_scan = scanned.search(&request, &TraceContext::new_root()).await.unwrap();

    assert_eq!(terms(&via_index), terms(&via_scan));
    for (a, b) in via_index.results.iter().zip(&via_scan.results) {
        assert!((a.similarity - b.similarity).abs() < 1e-6);
    }
    assert_eq!(indexed.stats().snapshot().served_indexed, 1);
}

#[tokio::test]
async fn test_normalized_backend_scores_are_converted() {
    let corpus = toy_corpus();
    let hits = vec![
        IndexHit { id: corpus[0].id, score: 1.0 },
        IndexHit { id: corpus[1].id, score: 0.5 },
    ];
    let backend = Arc::new(ScriptedIndexBackend::new(hits, ScoreMetric::NormalizedCosine));
    let service = service_over(corpus, provider()).with_backend(backend);

    let response = service
        .search(&TermSearchRequest::new("q", 2), &TraceContext::new_root())
        .await
        .unwrap();

    assert_eq!(terms(&response), vec!["term1", "term2"]);
    assert_eq!(response.results[0].similarity, 1.0);
    assert_eq!(response.results[1].similarity, 0.0);
}

#[tokio::test]
async fn test_malformed_backend_results_trigger_fallback() {
    let corpus = toy_corpus();
    let unknown = record("ghost", Some(vec![1.0, 0.0]));
    let backend = Arc::new(ScriptedIndexBackend::new(
        vec![IndexHit { id: unknown.id, score: 0.99 }],
        ScoreMetric::Cosine,
    ));
    let service = service_over(corpus.clone(), provider()).with_backend(backend.clone());
    let request = TermSearchRequest::new("q", 2);

    // Unknown id
    let response = service.search(&request, &TraceContext::new_root()).await.unwrap();
    assert_eq!(terms(&response), vec!["term1", "term3"]);

    // More hits than requested
    backend.set_hits(vec![
        IndexHit { id: corpus[0].id, score: 0.9 },
        IndexHit { id: corpus[2].id, score: 0.8 },
        IndexHit { id: corpus[1].id, score: 0.1 },
    ]);
    let response = service.search(&request, &TraceContext::new_root()).await.unwrap();
    assert_eq!(terms(&response), vec!["term1", "term3"]);

    // Ascending order
    backend.set_hits(vec![
        IndexHit { id: corpus[1].id, score: 0.1 },
        IndexHit { id: corpus[0].id, score: 0.9 },
    ]);
    let response = service.search(&request, &TraceContext::new_root()).await.unwrap();
    assert_eq!(terms(&response), vec!["term1", "term3"]);

    assert_eq!(service.stats().snapshot().served_fallback, 3);
    assert_eq!(service.stats().snapshot().served_indexed, 0);
}

#[tokio::test]
async fn test_indexed_attempt_reports_not_configured() {
    let service = service_over(toy_corpus(), provider());
    match service.indexed_attempt(&[1.0, 0.0], 3).await.unwrap() {
        IndexedOutcome::Unavailable(BackendUnavailable::NotConfigured) => {}
        other => panic!("expected NotConfigured, got {:?}", other),
    }
}

#[tokio::test]
async fn test_warm_index_builds_exact_index() {
    let index = Arc::new(ExactVectorIndex::new());
    let service = service_over(toy_corpus(), provider()).with_backend(index.clone());

    service.warm_index().await.unwrap();
    assert_eq!(index.len(), 3);

    let failing = Arc::new(FailingIndexBackend::transient());
    let service = service_over(toy_corpus(), provider()).with_backend(failing.clone());
    service.warm_index().await.unwrap();
    assert_eq!(failing.rebuild_calls(), 1);
}

#[tokio::test]
async fn test_channel_front_end() {
    let (search_tx, search_rx) = mpsc::channel(8);
    let service = service_over(toy_corpus(), provider());
    let handle = tokio::spawn(service.run(search_rx));
    let client = TermSearchClient::new(search_tx);

    let response = client.search_text("q", 2).await.unwrap();
    assert_eq!(terms(&response), vec!["term1", "term3"]);

    let err = client.search_text("", 2).await.unwrap_err();
    assert!(matches!(err, RetrievalError::InvalidRequest(_)));

    drop(client);
    handle.await.unwrap();
}

#[tokio::test]
async fn test_client_reports_closed_service() {
    let (search_tx, search_rx) = mpsc::channel(1);
    drop(search_rx);
    let client = TermSearchClient::new(search_tx);

    let err = client.search_text("q", 1).await.unwrap_err();
    assert!(matches!(err, RetrievalError::ServiceClosed(_)));
}
