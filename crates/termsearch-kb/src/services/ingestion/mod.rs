mod service;

pub use service::{IngestionPipeline, IngestionReport};
