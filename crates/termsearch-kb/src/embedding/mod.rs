//! Embedding providers and the factory that builds the configured one

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::data::ConfigError;
use crate::traits::EmbeddingProvider;

mod guard;
mod hashing;
#[cfg(feature = "reqwest")]
mod http;
#[cfg(feature = "async-openai")]
mod openai;

pub use guard::GuardedEmbeddingProvider;
pub use hashing::HashingEmbeddingProvider;
#[cfg(feature = "reqwest")]
pub use http::HttpEmbeddingProvider;
#[cfg(feature = "async-openai")]
pub use openai::OpenAiEmbeddingProvider;

/// Which embedding provider to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingKind {
    /// OpenAI embeddings API
    OpenAi,
    /// Self-hosted text-embeddings-inference compatible server
    Http,
    /// Deterministic feature hashing, no model required
    Hashing,
}

impl std::str::FromStr for EmbeddingKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "open_ai" => Ok(EmbeddingKind::OpenAi),
            "http" | "tei" => Ok(EmbeddingKind::Http),
            "hashing" | "hash" => Ok(EmbeddingKind::Hashing),
            other => Err(ConfigError::Invalid(format!("unknown embedding provider '{}'", other))),
        }
    }
}

/// Configuration for the embedding provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub kind: EmbeddingKind,
    /// Model name sent to the provider
    pub model: String,
    /// Base URL of the embedding server (`http` kind)
    pub endpoint: Option<String>,
    /// API key (`openai` kind)
    pub api_key: Option<String>,
    /// Vector length the provider must return
    pub dimension: usize,
    /// Upper bound on one embedding call
    pub timeout_ms: u64,
    /// Maximum in-flight calls; `1` serializes a non-reentrant model
    pub max_concurrent_requests: Option<usize>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            kind: EmbeddingKind::Hashing,
            model: "hashing".to_string(),
            endpoint: None,
            api_key: None,
            dimension: 768,
            timeout_ms: 30_000,
            max_concurrent_requests: None,
        }
    }
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Builds the configured provider, wrapped in a [`GuardedEmbeddingProvider`].
///
/// Called once at start; the returned handle is shared by retrieval and ingestion.
pub fn create_embedding_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>, ConfigError> {
    if config.dimension == 0 {
        return Err(ConfigError::Invalid("embedding dimension must be positive".to_string()));
    }
    if config.timeout_ms == 0 {
        return Err(ConfigError::Invalid("embedding timeout must be positive".to_string()));
    }

    let inner: Arc<dyn EmbeddingProvider> = match config.kind {
        EmbeddingKind::Hashing => Arc::new(HashingEmbeddingProvider::new(config.dimension)),
        #[cfg(feature = "async-openai")]
        EmbeddingKind::OpenAi => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| ConfigError::Invalid("openai provider requires an api key".to_string()))?;
            Arc::new(OpenAiEmbeddingProvider::new(api_key, config.model.clone(), config.dimension))
        }
        #[cfg(not(feature = "async-openai"))]
        EmbeddingKind::OpenAi => {
            return Err(ConfigError::Invalid(
                "openai provider requires the 'async-openai' feature".to_string(),
            ));
        }
        #[cfg(feature = "reqwest")]
        EmbeddingKind::Http => {
            let endpoint = config
                .endpoint
                .clone()
                .ok_or_else(|| ConfigError::Invalid("http provider requires an endpoint".to_string()))?;
            Arc::new(
                HttpEmbeddingProvider::new(endpoint, config.model.clone(), config.dimension, config.timeout())
                    .map_err(|e| ConfigError::Invalid(e.to_string()))?,
            )
        }
        #[cfg(not(feature = "reqwest"))]
        EmbeddingKind::Http => {
            return Err(ConfigError::Invalid(
                "http provider requires the 'reqwest' feature".to_string(),
            ));
        }
    };

    info!(
        kind = ?config.kind,
        model = %inner.model_name(),
        dimension = config.dimension,
        timeout_ms = config.timeout_ms,
        max_concurrent_requests = ?config.max_concurrent_requests,
        "Embedding provider created"
    );

    Ok(Arc::new(GuardedEmbeddingProvider::new(
        inner,
        config.timeout(),
        config.max_concurrent_requests,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_factory_builds_guarded_hashing_provider() {
        let config = EmbeddingConfig {
            dimension: 64,
            ..EmbeddingConfig::default()
        };
        let provider = create_embedding_provider(&config).unwrap();

        assert_eq!(provider.dimension(), 64);
        let vector = provider.embed("기준금리 인상").await.unwrap();
        assert_eq!(vector.len(), 64);
    }

    #[test]
    fn test_factory_rejects_invalid_config() {
        let zero_dim = EmbeddingConfig {
            dimension: 0,
            ..EmbeddingConfig::default()
        };
        assert!(matches!(create_embedding_provider(&zero_dim), Err(ConfigError::Invalid(_))));

        let openai_without_key = EmbeddingConfig {
            kind: EmbeddingKind::OpenAi,
            api_key: None,
            ..EmbeddingConfig::default()
        };
        assert!(create_embedding_provider(&openai_without_key).is_err());

        let http_without_endpoint = EmbeddingConfig {
            kind: EmbeddingKind::Http,
            endpoint: None,
            ..EmbeddingConfig::default()
        };
        assert!(create_embedding_provider(&http_without_endpoint).is_err());
    }

    #[test]
    fn test_embedding_kind_from_str() {
        assert_eq!("OpenAI".parse::<EmbeddingKind>().unwrap(), EmbeddingKind::OpenAi);
        assert_eq!("tei".parse::<EmbeddingKind>().unwrap(), EmbeddingKind::Http);
        assert!("word2vec".parse::<EmbeddingKind>().is_err());
    }
}
