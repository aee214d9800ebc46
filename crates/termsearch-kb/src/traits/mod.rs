//! Core traits (interfaces) for the term search engine

mod embedding_provider;
mod indexed_search;
mod term_repository;

pub use embedding_provider::EmbeddingProvider;
pub(crate) use embedding_provider::is_blank;
pub use indexed_search::{IndexHit, IndexedSearchBackend, ScoreMetric};
pub use term_repository::TermRepository;
