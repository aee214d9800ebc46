//! EmbeddingProvider trait definition

use async_trait::async_trait;

use crate::data::{EmbeddingError, EmbeddingVector};

/// Converts text into fixed-dimension vectors.
///
/// Implementors only supply [`EmbeddingProvider::encode`], which always
/// receives non-blank texts. Blank-input handling and batch re-alignment
/// live in the provided methods so every caller sees the same contract.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Length of every vector this provider returns.
    fn dimension(&self) -> usize;

    /// Model identifier, for logs.
    fn model_name(&self) -> &str;

    /// Encodes a batch of non-blank texts, one vector per text, in input order.
    async fn encode(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, EmbeddingError>;

    /// Embeds a single text. Fails with `EmptyInput` on blank text.
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        if is_blank(text) {
            return Err(EmbeddingError::EmptyInput);
        }

        let mut vectors = self.encode(&[text.to_string()]).await?;
        if vectors.len() != 1 {
            return Err(EmbeddingError::CountMismatch {
                expected: 1,
                actual: vectors.len(),
            });
        }
        Ok(vectors.remove(0))
    }

    /// Embeds many texts with a single `encode` call.
    ///
    /// The output has the same length and order as `texts`; blank entries are
    /// not sent to the model and come back as `None` at their position.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Option<EmbeddingVector>>, EmbeddingError> {
        let mut positions = Vec::with_capacity(texts.len());
        let mut retained = Vec::with_capacity(texts.len());
        for (position, text) in texts.iter().enumerate() {
            if !is_blank(text) {
                positions.push(position);
                retained.push(text.clone());
            }
        }

        let mut aligned = vec![None; texts.len()];
        if retained.is_empty() {
            return Ok(aligned);
        }

        let vectors = self.encode(&retained).await?;
        if vectors.len() != retained.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: retained.len(),
                actual: vectors.len(),
            });
        }

        for (position, vector) in positions.into_iter().zip(vectors) {
            aligned[position] = Some(vector);
        }
        Ok(aligned)
    }
}

pub(crate) fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}
