//! Retrieval and ingestion services

pub mod client;
pub mod ingestion;
pub mod messages;
pub mod retrieval;
pub mod stats;

pub use client::TermSearchClient;
pub use ingestion::{IngestionPipeline, IngestionReport};
pub use messages::{SearchMessage, SearchResponse, SearchResultSender};
pub use retrieval::{IndexedOutcome, RetrievalService};
pub use stats::{RetrievalStats, ServedPath, StatsSnapshot};
