//! Error types for the term search engine

use std::time::Duration;
use thiserror::Error;

/// Errors raised by an embedding provider.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbeddingError {
    #[error("Empty input: text to embed is empty or whitespace-only")]
    EmptyInput,

    #[error("Embedding call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding provider returned {actual} vectors for {expected} inputs")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Embedding provider failure: {0}")]
    Provider(String),
}

/// Errors raised by a term repository.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Repository I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Repository serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Embedding dimension mismatch for term '{term}': repository holds {expected}, record has {actual}")]
    DimensionMismatch {
        term: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid term record: {0}")]
    InvalidRecord(String),

    #[error("Repository backend error: {0}")]
    Backend(String),
}

/// Errors raised by the similarity functions.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityError {
    #[error("Cannot compare vectors of different length: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
}

/// An indexed search backend could not answer.
///
/// Never surfaced to callers of the retrieval service; every variant sends
/// the request down the full-scan path.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendUnavailable {
    #[error("No indexed search backend configured")]
    NotConfigured,

    #[error("Vector index missing: {0}")]
    IndexMissing(String),

    #[error("Vector search unsupported: {0}")]
    Unsupported(String),

    #[error("Transient backend failure: {0}")]
    Transient(String),

    #[error("Malformed backend result: {0}")]
    Malformed(String),
}

impl BackendUnavailable {
    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            BackendUnavailable::NotConfigured => "not_configured",
            BackendUnavailable::IndexMissing(_) => "index_missing",
            BackendUnavailable::Unsupported(_) => "unsupported",
            BackendUnavailable::Transient(_) => "transient",
            BackendUnavailable::Malformed(_) => "malformed",
        }
    }
}

/// Who is at fault for a failed search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request itself was bad (4xx-equivalent).
    ClientFault,
    /// A dependency of the service failed (5xx-equivalent).
    ServiceFailure,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::ClientFault => "client_fault",
            ErrorClass::ServiceFailure => "service_failure",
        }
    }
}

/// Errors a caller of the retrieval service can observe.
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Empty input: query is empty or whitespace-only")]
    EmptyInput,

    #[error("Embedding provider timed out after {0:?}")]
    ProviderTimeout(Duration),

    #[error("Embedding provider failure: {0}")]
    ProviderFailure(String),

    #[error("Term repository failure: {0}")]
    Repository(#[from] StoreError),

    #[error("Embedding dimension mismatch: query has {query}, stored vectors have {stored}")]
    DimensionMismatch { query: usize, stored: usize },

    #[error("Search service unavailable: {0}")]
    ServiceClosed(String),
}

impl RetrievalError {
    pub fn class(&self) -> ErrorClass {
        match self {
            RetrievalError::InvalidRequest(_) | RetrievalError::EmptyInput => ErrorClass::ClientFault,
            RetrievalError::ProviderTimeout(_)
            | RetrievalError::ProviderFailure(_)
            | RetrievalError::Repository(_)
            | RetrievalError::DimensionMismatch { .. }
            | RetrievalError::ServiceClosed(_) => ErrorClass::ServiceFailure,
        }
    }
}

impl From<EmbeddingError> for RetrievalError {
    fn from(err: EmbeddingError) -> Self {
        match err {
            EmbeddingError::EmptyInput => RetrievalError::EmptyInput,
            EmbeddingError::Timeout(after) => RetrievalError::ProviderTimeout(after),
            other => RetrievalError::ProviderFailure(other.to_string()),
        }
    }
}

impl From<SimilarityError> for RetrievalError {
    fn from(err: SimilarityError) -> Self {
        match err {
            SimilarityError::DimensionMismatch { left, right } => RetrievalError::DimensionMismatch {
                query: left,
                stored: right,
            },
        }
    }
}

/// Errors raised while building or importing a corpus.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Invalid term at position {index}: {reason}")]
    InvalidDraft { index: usize, reason: String },

    #[error("Embedding failed during ingestion: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Writing the corpus failed: {0}")]
    Store(#[from] StoreError),

    #[error("Imported embedding has dimension {actual}, provider produces {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
