//! End-to-end retrieval scenarios through the public API

use pretty_assertions::assert_eq;
use std::sync::Arc;

use termsearch_kb::test_utils::{record, FailingIndexBackend, StaticEmbeddingProvider};
use termsearch_kb::{
    top_k, BackendUnavailable, ExactVectorIndex, InMemoryTermRepository, IndexedSearchBackend,
    RetrievalError, RetrievalService, TermSearchRequest, TermSearchResponse, TraceContext,
};

mod test_utils;
use test_utils::{init_test_tracing, scan_only_service, toy_corpus, unit_x_provider};

fn terms(response: &TermSearchResponse) -> Vec<&str> {
    response.results.iter().map(|r| r.term.as_str()).collect()
}

#[tokio::test]
async fn test_toy_corpus_top_two() {
    init_test_tracing();
    let service = scan_only_service(toy_corpus());

    let response = service
        .search(&TermSearchRequest::new("금리", 2), &TraceContext::new_root())
        .await
        .unwrap();

    assert_eq!(terms(&response), vec!["term1", "term3"]);
    assert_eq!(response.results[0].similarity, 1.0);
    assert_eq!(response.count, 2);
}

#[tokio::test]
async fn test_unembedded_corpus_gives_empty_results() {
    init_test_tracing();
    let service = scan_only_service(vec![record("a", None), record("b", None)]);

    let response = service
        .search(&TermSearchRequest::new("금리", 3), &TraceContext::new_root())
        .await
        .unwrap();

    let wire = serde_json::to_value(&response).unwrap();
    assert_eq!(wire, serde_json::json!({"query": "금리", "results": [], "count": 0}));
}

#[tokio::test]
async fn test_empty_query_never_reaches_provider() {
    init_test_tracing();
    let provider = unit_x_provider();
    let repository = Arc::new(InMemoryTermRepository::with_records(toy_corpus()).unwrap());
    let service = RetrievalService::new(provider.clone(), repository);

    let err = service
        .search(&TermSearchRequest::new("", 3), &TraceContext::new_root())
        .await
        .unwrap_err();

    assert!(matches!(err, RetrievalError::InvalidRequest(_)));
    assert_eq!(provider.encode_calls(), 0);
}

#[tokio::test]
async fn test_unavailable_backend_serves_same_responses() {
    init_test_tracing();
    let healthy = scan_only_service(toy_corpus());

    for error in [
        BackendUnavailable::IndexMissing("termEmbeddings".into()),
        BackendUnavailable::Unsupported("vector indexes need Neo4j 5.11".into()),
        BackendUnavailable::Transient("connection reset".into()),
    ] {
        let backend = Arc::new(FailingIndexBackend::new(error));
        let degraded = scan_only_service(toy_corpus()).with_backend(backend);

        for top_k in 1..=10 {
            let request = TermSearchRequest::new("q", top_k);
            let expected = healthy.search(&request, &TraceContext::new_root()).await.unwrap();
            let actual = degraded.search(&request, &TraceContext::new_root()).await.unwrap();
            assert_eq!(
                serde_json::to_value(&actual).unwrap(),
                serde_json::to_value(&expected).unwrap()
            );
        }
        assert_eq!(degraded.stats().snapshot().served_fallback, 10);
    }
}

#[tokio::test]
async fn test_exact_index_matches_brute_force_on_larger_corpus() {
    init_test_tracing();
    let corpus: Vec<_> = (0..50)
        .map(|i| {
            let angle = i as f32 * 0.37;
            record(&format!("t{}", i), Some(vec![angle.cos(), angle.sin(), (i % 7) as f32 * 0.1]))
        })
        .collect();
    let query = vec![0.3, 0.8, 0.2];

    let index = ExactVectorIndex::new();
    index.rebuild(&corpus).await.unwrap();
    let hits = index.search(&query, 10).await.unwrap();

    let brute = top_k(
        &query,
        corpus.iter().filter_map(|r| r.embedding.as_deref().map(|v| (r.id, v))),
        10,
    )
    .unwrap();

    let hit_ids: Vec<_> = hits.iter().map(|h| h.id).collect();
    let brute_ids: Vec<_> = brute.iter().map(|(id, _)| *id).collect();
    assert_eq!(hit_ids, brute_ids);
    for (hit, (_, similarity)) in hits.iter().zip(&brute) {
        assert!((hit.score - similarity).abs() < 1e-5);
    }
}

#[tokio::test]
async fn test_concurrent_searches_share_one_service() {
    init_test_tracing();
    let provider = Arc::new(
        StaticEmbeddingProvider::new(2)
            .with_vector("x", vec![1.0, 0.0])
            .with_vector("y", vec![0.0, 1.0]),
    );
    let repository = Arc::new(InMemoryTermRepository::with_records(toy_corpus()).unwrap());
    let service = RetrievalService::new(provider, repository).with_backend(Arc::new(ExactVectorIndex::new()));
    service.warm_index().await.unwrap();

    let mut handles = Vec::new();
    for i in 0..20 {
        let service = service.clone();
        let query = if i % 2 == 0 { "x" } else { "y" };
        handles.push(tokio::spawn(async move {
            let response = service
                .search(&TermSearchRequest::new(query, 1), &TraceContext::new_root())
                .await
                .unwrap();
            (query, response.results[0].term.clone())
        }));
    }

    for handle in handles {
        let (query, top) = handle.await.unwrap();
        let expected = if query == "x" { "term1" } else { "term2" };
        assert_eq!(top, expected);
    }
    assert_eq!(service.stats().snapshot().served_indexed, 20);
}
