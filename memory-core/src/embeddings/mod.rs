//! Embedding provider trait, a deterministic mock, similarity utilities,
//! and the bounded cache in front of them.

mod cache;

pub use cache::{CacheMetrics, EmbeddingCache};

use async_trait::async_trait;

use crate::error::{Error, Result};

/// The embedding provider boundary. Category agents and the recall agent
/// call through this trait rather than a concrete network client.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Compute an embedding vector for one piece of text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmbeddingFailed`] on a provider failure.
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;

    /// Compute embeddings for a batch of texts. The default
    /// implementation calls [`EmbeddingProvider::embed_text`] once per
    /// input; providers with a native batch API should override this.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmbeddingFailed`] on a provider failure.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed_text(text).await?);
        }
        Ok(out)
    }

    /// Cosine similarity between two already-embedded vectors.
    fn similarity(&self, a: &[f32], b: &[f32]) -> f64 {
        cosine_similarity(a, b)
    }

    /// The dimensionality of vectors this provider produces.
    fn embedding_dimension(&self) -> usize;

    /// A human-readable model identifier, recorded alongside cached
    /// vectors so a model change invalidates stale entries.
    fn model_name(&self) -> &str;

    /// Whether the provider is currently reachable. Default `true`;
    /// network-backed providers should override this with a cheap
    /// health check.
    async fn is_available(&self) -> bool {
        true
    }
}

/// Cosine similarity between two vectors, clamped to `[-1, 1]`. Returns
/// `0.0` for mismatched or zero-length inputs rather than panicking.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let norm_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Normalize a vector to unit length in place. No-op on a zero vector.
pub fn normalize_vector(vector: &mut [f32]) {
    let norm: f64 = vector.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            #[allow(clippy::cast_possible_truncation)]
            {
                *value = (f64::from(*value) / norm) as f32;
            }
        }
    }
}

/// A deterministic, hash-based embedding provider for tests and for
/// environments with no configured real provider. Produces stable,
/// non-random vectors so similarity-based tests are reproducible.
#[derive(Debug, Clone)]
pub struct MockEmbeddingProvider {
    dimension: usize,
}

impl MockEmbeddingProvider {
    /// Build a mock provider producing vectors of `dimension` length.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new(crate::constants::defaults::DEFAULT_EMBEDDING_DIMENSION)
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(Error::EmbeddingFailed("cannot embed empty text".to_string()));
        }
        let mut vector = vec![0.0f32; self.dimension];
        for (i, byte) in text.bytes().enumerate() {
            let slot = i % self.dimension;
            #[allow(clippy::cast_precision_loss)]
            {
                vector[slot] += f32::from(byte) / 255.0;
            }
        }
        normalize_vector(&mut vector);
        Ok(vector)
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "mock-hash-embedding-v1"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_of_identical_vectors_is_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_similarity_of_orthogonal_vectors_is_zero() {
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-9);
    }

    #[test]
    fn cosine_similarity_handles_mismatched_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    }

    #[tokio::test]
    async fn mock_provider_is_deterministic() {
        let provider = MockEmbeddingProvider::default();
        let a = provider.embed_text("hello world").await.unwrap();
        let b = provider.embed_text("hello world").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn mock_provider_rejects_empty_text() {
        let provider = MockEmbeddingProvider::default();
        assert!(provider.embed_text("   ").await.is_err());
    }

    #[tokio::test]
    async fn similar_texts_have_higher_similarity_than_unrelated_ones() {
        let provider = MockEmbeddingProvider::default();
        let a = provider.embed_text("alice went hiking in yosemite").await.unwrap();
        let b = provider.embed_text("alice went hiking in yosemite park").await.unwrap();
        let c = provider.embed_text("quarterly tax filing deadline").await.unwrap();
        let close = cosine_similarity(&a, &b);
        let far = cosine_similarity(&a, &c);
        assert!(close > far);
    }
}
