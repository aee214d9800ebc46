//! Core data types for the term search engine

pub mod entities;
pub mod errors;
pub mod identifiers;
pub mod trace_context;

pub use entities::{
    EmbeddingVector, RankedResult, TermDraft, TermRecord, TermRecordInput, TermSearchRequest,
    TermSearchResponse, DEFAULT_TOP_K, MAX_QUERY_CHARS, MAX_TOP_K, MIN_TOP_K,
};
pub use errors::{
    BackendUnavailable, ConfigError, EmbeddingError, ErrorClass, IngestionError, RetrievalError,
    SimilarityError, StoreError,
};
pub use identifiers::TermId;
pub use trace_context::TraceContext;
