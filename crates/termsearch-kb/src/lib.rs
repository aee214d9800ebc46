//! Semantic search over a knowledge base of economic terms.
//!
//! A query is embedded, ranked against stored term embeddings by cosine
//! similarity, and answered with the closest definitions. An indexed backend
//! answers when it can; otherwise an exhaustive scan produces the same ranking.

// Core modules
pub mod config;
pub mod data;
pub mod similarity;
pub mod traits;

pub mod embedding;
pub mod services;
pub mod storage;

// Indexed search backends
pub mod adapters;

// Fakes and mocks shared by unit and integration tests
pub mod test_utils;

// Re-export key types for convenient usage
pub use config::{IndexConfig, TermSearchConfig};
pub use data::{
    BackendUnavailable, ConfigError, EmbeddingError, EmbeddingVector, ErrorClass, IngestionError,
    RankedResult, RetrievalError, SimilarityError, StoreError, TermDraft, TermId, TermRecord,
    TermRecordInput, TermSearchRequest, TermSearchResponse, TraceContext,
};

// Re-export core traits
pub use traits::{EmbeddingProvider, IndexHit, IndexedSearchBackend, ScoreMetric, TermRepository};

// Re-export embedding providers
pub use embedding::{
    create_embedding_provider, EmbeddingConfig, EmbeddingKind, GuardedEmbeddingProvider,
    HashingEmbeddingProvider,
};
#[cfg(feature = "reqwest")]
pub use embedding::HttpEmbeddingProvider;
#[cfg(feature = "async-openai")]
pub use embedding::OpenAiEmbeddingProvider;

// Re-export backends and repositories
#[cfg(feature = "neo4rs")]
pub use adapters::Neo4jVectorIndex;
pub use adapters::{ExactVectorIndex, Neo4jIndexConfig};
pub use storage::{InMemoryTermRepository, JsonFileTermRepository};

// Re-export services
pub use services::{
    IngestionPipeline, IngestionReport, RetrievalService, RetrievalStats, ServedPath, StatsSnapshot,
    TermSearchClient,
};
pub use similarity::{cosine_similarity, similarity_percent, top_k};
