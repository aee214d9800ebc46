//! Configuration for the term search engine
//!
//! Values come from built-in defaults, then an optional YAML file named by
//! `TERMSEARCH_CONFIG`, then environment variables (a `.env` file is loaded
//! first). Invalid environment values are logged and ignored.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use termsearch_monitoring::MonitoringConfig;

use crate::adapters::Neo4jIndexConfig;
use crate::data::{ConfigError, MAX_TOP_K, MIN_TOP_K};
use crate::embedding::{EmbeddingConfig, EmbeddingKind};

/// Which indexed search backend, if any, sits in front of the full scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndexConfig {
    /// Every search is answered by the full scan
    None,
    /// In-process exact index, built from the repository at start
    Exact,
    /// Neo4j native vector index
    Neo4j(Neo4jIndexConfig),
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig::Exact
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TermSearchConfig {
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    /// JSON file holding the term corpus
    pub corpus_path: PathBuf,
    /// `top_k` used by the CLI when none is given
    pub default_top_k: usize,
    /// Texts per embedding call during ingestion
    pub batch_size: usize,
    pub monitoring: MonitoringConfig,
}

impl Default for TermSearchConfig {
    fn default() -> Self {
        Self {
            embedding: EmbeddingConfig::default(),
            index: IndexConfig::default(),
            corpus_path: PathBuf::from("data/terms.json"),
            default_top_k: 3,
            batch_size: 64,
            monitoring: MonitoringConfig::default(),
        }
    }
}

impl TermSearchConfig {
    /// Load configuration from the optional config file and the environment
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let mut config = match env::var("TERMSEARCH_CONFIG") {
            Ok(path) => Self::from_yaml_file(&path)?,
            Err(_) => Self::default(),
        };

        config.apply_env_overrides(|key| env::var(key).ok());
        config.validate()?;

        info!(
            embedding = ?config.embedding.kind,
            index = config.index_kind(),
            corpus_path = %config.corpus_path.display(),
            batch_size = config.batch_size,
            "Configuration loaded"
        );
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Applies overrides read through `lookup` (the process environment in [`Self::load`]).
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(kind) = lookup("TERMSEARCH_EMBEDDING_PROVIDER") {
            match kind.parse::<EmbeddingKind>() {
                Ok(kind) => self.embedding.kind = kind,
                Err(_) => warn!("Invalid TERMSEARCH_EMBEDDING_PROVIDER value: {}", kind),
            }
        }

        if let Some(model) = lookup("TERMSEARCH_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }

        if let Some(endpoint) = lookup("TERMSEARCH_EMBEDDING_ENDPOINT") {
            self.embedding.endpoint = Some(endpoint);
        }

        if let Some(api_key) = lookup("OPENAI_API_KEY") {
            self.embedding.api_key = Some(api_key);
        }

        if let Some(value) = lookup("TERMSEARCH_EMBEDDING_DIMENSION") {
            match value.parse::<usize>() {
                Ok(dimension) => self.embedding.dimension = dimension,
                Err(_) => warn!("Invalid TERMSEARCH_EMBEDDING_DIMENSION value: {}", value),
            }
        }

        if let Some(value) = lookup("TERMSEARCH_EMBEDDING_TIMEOUT_MS") {
            match value.parse::<u64>() {
                Ok(timeout_ms) => self.embedding.timeout_ms = timeout_ms,
                Err(_) => warn!("Invalid TERMSEARCH_EMBEDDING_TIMEOUT_MS value: {}", value),
            }
        }

        if let Some(value) = lookup("TERMSEARCH_EMBEDDING_MAX_CONCURRENCY") {
            match value.parse::<usize>() {
                Ok(0) => self.embedding.max_concurrent_requests = None,
                Ok(n) => self.embedding.max_concurrent_requests = Some(n),
                Err(_) => warn!("Invalid TERMSEARCH_EMBEDDING_MAX_CONCURRENCY value: {}", value),
            }
        }

        if let Some(kind) = lookup("TERMSEARCH_INDEX") {
            match kind.to_lowercase().as_str() {
                "none" => self.index = IndexConfig::None,
                "exact" => self.index = IndexConfig::Exact,
                "neo4j" => {
                    if !matches!(self.index, IndexConfig::Neo4j(_)) {
                        self.index = IndexConfig::Neo4j(Neo4jIndexConfig::default());
                    }
                }
                _ => warn!("Invalid TERMSEARCH_INDEX value: {}", kind),
            }
        }

        if let IndexConfig::Neo4j(neo4j) = &mut self.index {
            if let Some(uri) = lookup("NEO4J_URI") {
                neo4j.uri = uri;
            }
            if let Some(username) = lookup("NEO4J_USERNAME") {
                neo4j.username = username;
            }
            if let Some(password) = lookup("NEO4J_PASSWORD") {
                neo4j.password = password;
            }
            if let Some(database) = lookup("NEO4J_DATABASE") {
                neo4j.database = Some(database);
            }
            if let Some(index_name) = lookup("TERMSEARCH_NEO4J_INDEX_NAME") {
                neo4j.index_name = index_name;
            }
            if let Some(value) = lookup("TERMSEARCH_NEO4J_NUM_CANDIDATES") {
                match value.parse::<usize>() {
                    Ok(n) => neo4j.num_candidates = n,
                    Err(_) => warn!("Invalid TERMSEARCH_NEO4J_NUM_CANDIDATES value: {}", value),
                }
            }
        }

        if let Some(path) = lookup("TERMSEARCH_CORPUS_PATH") {
            self.corpus_path = PathBuf::from(path);
        }

        if let Some(value) = lookup("TERMSEARCH_DEFAULT_TOP_K") {
            match value.parse::<usize>() {
                Ok(top_k) => self.default_top_k = top_k,
                Err(_) => warn!("Invalid TERMSEARCH_DEFAULT_TOP_K value: {}", value),
            }
        }

        if let Some(value) = lookup("TERMSEARCH_BATCH_SIZE") {
            match value.parse::<usize>() {
                Ok(batch_size) => self.batch_size = batch_size,
                Err(_) => warn!("Invalid TERMSEARCH_BATCH_SIZE value: {}", value),
            }
        }

        if let Some(filter) = lookup("TERMSEARCH_LOG_FILTER") {
            self.monitoring.log_filter = filter;
        }

        if let Some(json) = lookup("TERMSEARCH_LOG_JSON") {
            self.monitoring.enable_json_logging = json.to_lowercase() == "true" || json == "1";
        }

        if let Some(log_file) = lookup("TERMSEARCH_LOG_FILE") {
            self.monitoring.log_file = Some(log_file);
        }

        if let Some(addr) = lookup("TERMSEARCH_METRICS_ADDR") {
            self.monitoring.metrics_listen_addr = Some(addr);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.embedding.dimension == 0 {
            return Err(ConfigError::Invalid("embedding.dimension must be positive".to_string()));
        }
        if self.embedding.timeout_ms == 0 {
            return Err(ConfigError::Invalid("embedding.timeout_ms must be positive".to_string()));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid("batch_size must be positive".to_string()));
        }
        if !(MIN_TOP_K..=MAX_TOP_K).contains(&self.default_top_k) {
            return Err(ConfigError::Invalid(format!(
                "default_top_k must be within {}..={}",
                MIN_TOP_K, MAX_TOP_K
            )));
        }
        if let IndexConfig::Neo4j(neo4j) = &self.index {
            if neo4j.num_candidates == 0 {
                return Err(ConfigError::Invalid("index.num_candidates must be positive".to_string()));
            }
        }
        Ok(())
    }

    pub fn index_kind(&self) -> &'static str {
        match self.index {
            IndexConfig::None => "none",
            IndexConfig::Exact => "exact",
            IndexConfig::Neo4j(_) => "neo4j",
        }
    }
}
