use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::data::{EmbeddingError, EmbeddingVector};
use crate::traits::EmbeddingProvider;

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a [String],
}

/// Client for a self-hosted sentence-embedding server speaking the
/// text-embeddings-inference protocol: `POST /embed {"inputs": [...]}`
/// answered with one float array per input.
#[derive(Debug, Clone)]
pub struct HttpEmbeddingProvider {
    client: Client,
    endpoint: String,
    model: String,
    dimension: usize,
    timeout: Duration,
}

impl HttpEmbeddingProvider {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbeddingError::Provider(format!("failed to build HTTP client: {}", e)))?;

        let base_url = base_url.into();
        Ok(Self {
            client,
            endpoint: format!("{}/embed", base_url.trim_end_matches('/')),
            model: model.into(),
            dimension,
            timeout,
        })
    }

    /// Client-side deadlines map to [`EmbeddingError::Timeout`].
    fn request_error(&self, context: &str, error: reqwest::Error) -> EmbeddingError {
        if error.is_timeout() {
            EmbeddingError::Timeout(self.timeout)
        } else {
            EmbeddingError::Provider(format!("{}: {}", context, error))
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn encode(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, EmbeddingError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbedRequest { inputs: texts })
            .send()
            .await
            .map_err(|e| self.request_error("embedding request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Provider(format!(
                "embedding server returned {}: {}",
                status, body
            )));
        }

        let vectors: Vec<EmbeddingVector> = response
            .json()
            .await
            .map_err(|e| self.request_error("invalid embedding response", e))?;

        debug!(endpoint = %self.endpoint, inputs = texts.len(), "Embeddings received");
        Ok(vectors)
    }
}
