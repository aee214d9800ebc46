use async_openai::{config::OpenAIConfig, types::CreateEmbeddingRequestArgs, Client};
use async_trait::async_trait;
use tracing::debug;

use crate::data::{EmbeddingError, EmbeddingVector};
use crate::traits::EmbeddingProvider;

/// Embeddings from the OpenAI API (`text-embedding-3-small` is 1536-d).
pub struct OpenAiEmbeddingProvider {
    client: Client<OpenAIConfig>,
    model: String,
    dimension: usize,
}

impl OpenAiEmbeddingProvider {
    pub fn new(api_key: String, model: String, dimension: usize) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        let client = Client::with_config(config);
        Self { client, model, dimension }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn encode(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, EmbeddingError> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(texts.to_vec())
            .build()
            .map_err(|e| EmbeddingError::Provider(e.to_string()))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| EmbeddingError::Provider(e.to_string()))?;

        debug!(model = %self.model, inputs = texts.len(), outputs = response.data.len(), "OpenAI embeddings received");

        // The API tags each vector with its input position; do not rely on response order.
        let mut data = response.data;
        data.sort_by_key(|d| d.index);
        if data.iter().enumerate().any(|(i, d)| d.index as usize != i) {
            return Err(EmbeddingError::Provider(
                "OpenAI response indices do not cover the request".to_string(),
            ));
        }

        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}
