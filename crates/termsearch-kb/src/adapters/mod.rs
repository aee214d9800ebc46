//! Indexed search backends

use serde::{Deserialize, Serialize};

mod exact_index;
#[cfg(feature = "neo4rs")]
mod neo4j_index;

pub use exact_index::ExactVectorIndex;
#[cfg(feature = "neo4rs")]
pub use neo4j_index::Neo4jVectorIndex;

/// Connection and index settings for the Neo4j vector index backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Neo4jIndexConfig {
    pub uri: String,
    pub username: String,
    pub password: String,
    pub database: Option<String>,
    pub index_name: String,
    /// Node label holding the term vectors
    pub label: String,
    /// Candidates examined by the index before the top k are taken
    pub num_candidates: usize,
    pub pool_size: usize,
}

impl Default for Neo4jIndexConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            username: "neo4j".to_string(),
            password: "password".to_string(),
            database: None,
            index_name: "termEmbeddings".to_string(),
            label: "EconomicTerm".to_string(),
            num_candidates: 100,
            pool_size: 4,
        }
    }
}
