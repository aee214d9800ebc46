use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::warn;

use crate::data::{EmbeddingError, EmbeddingVector};
use crate::traits::EmbeddingProvider;

/// Wraps a provider with a call timeout, a dimension check on every returned
/// vector, and an optional cap on concurrent calls.
pub struct GuardedEmbeddingProvider {
    inner: Arc<dyn EmbeddingProvider>,
    timeout: Duration,
    permits: Option<Arc<Semaphore>>,
}

impl GuardedEmbeddingProvider {
    pub fn new(inner: Arc<dyn EmbeddingProvider>, timeout: Duration, max_concurrent_requests: Option<usize>) -> Self {
        let permits = max_concurrent_requests
            .filter(|&n| n > 0)
            .map(|n| Arc::new(Semaphore::new(n)));
        Self { inner, timeout, permits }
    }

    async fn encode_inner(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, EmbeddingError> {
        let _permit = match &self.permits {
            Some(permits) => Some(
                permits
                    .acquire()
                    .await
                    .map_err(|_| EmbeddingError::Provider("embedding semaphore closed".to_string()))?,
            ),
            None => None,
        };
        self.inner.encode(texts).await
    }
}

#[async_trait]
impl EmbeddingProvider for GuardedEmbeddingProvider {
    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    async fn encode(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, EmbeddingError> {
        let vectors = match tokio::time::timeout(self.timeout, self.encode_inner(texts)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    model = %self.inner.model_name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    batch_size = texts.len(),
                    "Embedding call timed out"
                );
                return Err(EmbeddingError::Timeout(self.timeout));
            }
        };

        if vectors.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                actual: vectors.len(),
            });
        }

        let expected = self.inner.dimension();
        if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: bad.len(),
            });
        }

        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::StaticEmbeddingProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records the highest number of overlapping `encode` calls.
    struct SlowProvider {
        delay: Duration,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for SlowProvider {
        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "slow"
        }

        async fn encode(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, EmbeddingError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    fn slow(delay_ms: u64) -> Arc<SlowProvider> {
        Arc::new(SlowProvider {
            delay: Duration::from_millis(delay_ms),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_timeout_surfaces_as_timeout_error() {
        let guarded = GuardedEmbeddingProvider::new(slow(200), Duration::from_millis(10), None);
        let err = guarded.embed("금리").await.unwrap_err();
        assert_eq!(err, EmbeddingError::Timeout(Duration::from_millis(10)));
    }

    #[tokio::test]
    async fn test_wrong_dimension_is_rejected() {
        let inner = Arc::new(StaticEmbeddingProvider::new(3).with_vector("금리", vec![1.0, 0.0]));
        let guarded = GuardedEmbeddingProvider::new(inner, Duration::from_secs(1), None);

        let err = guarded.embed("금리").await.unwrap_err();
        assert_eq!(err, EmbeddingError::DimensionMismatch { expected: 3, actual: 2 });
    }

    #[tokio::test]
    async fn test_single_permit_serializes_calls() {
        let inner = slow(20);
        let guarded = Arc::new(GuardedEmbeddingProvider::new(inner.clone(), Duration::from_secs(5), Some(1)));

        let mut handles = Vec::new();
        for i in 0..4 {
            let guarded = Arc::clone(&guarded);
            handles.push(tokio::spawn(async move { guarded.embed(&format!("term {}", i)).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(inner.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_blank_input_never_reaches_inner_provider() {
        let inner = Arc::new(StaticEmbeddingProvider::new(2));
        let guarded = GuardedEmbeddingProvider::new(inner.clone(), Duration::from_secs(1), None);

        assert_eq!(guarded.embed("   ").await.unwrap_err(), EmbeddingError::EmptyInput);
        assert_eq!(inner.encode_calls(), 0);
    }
}
