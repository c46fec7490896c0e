//! Embedding seam and the deterministic hash backend.

use async_trait::async_trait;

use crate::error::EmbedError;

/// Text embedding backend.
///
/// `dimensions` drives the vector field width at provisioning time, so a
/// backend must report it before any text is embedded.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier of the underlying model, for logs.
    fn model_name(&self) -> &str;

    /// Width of the vectors this backend produces.
    fn dimensions(&self) -> usize;

    /// Embed a document body for storage.
    async fn embed_document(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    /// Embed a search query.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

/// Deterministic embedder that derives vectors from a hash of the input.
///
/// Carries no semantic signal, but identical inputs map to identical unit
/// vectors, which is all tests and local smoke setups need.
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut hasher = blake3::Hasher::new();
        hasher.update(text.as_bytes());
        let mut bytes = vec![0u8; self.dim * 4];
        hasher.finalize_xof().fill(&mut bytes);

        let mut vector: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|chunk| {
                let raw = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                (raw as f64 / u32::MAX as f64 * 2.0 - 1.0) as f32
            })
            .collect();

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash"
    }

    fn dimensions(&self) -> usize {
        self.dim
    }

    async fn embed_document(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        if text.trim().is_empty() {
            return Err(EmbedError::EmptyInput);
        }
        Ok(self.vector_for(text))
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        self.embed_document(text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn identical_inputs_embed_identically() {
        let embedder = HashEmbedder::new(16);
        let a = embedder.embed_document("the quick brown fox").await.unwrap();
        let b = embedder.embed_document("the quick brown fox").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn distinct_inputs_embed_differently() {
        let embedder = HashEmbedder::new(16);
        let a = embedder.embed_document("alpha").await.unwrap();
        let b = embedder.embed_document("beta").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn vectors_have_the_reported_width_and_unit_norm() {
        let embedder = HashEmbedder::new(384);
        let vector = embedder.embed_query("hello").await.unwrap();
        assert_eq!(vector.len(), embedder.dimensions());
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn blank_input_is_rejected() {
        let embedder = HashEmbedder::new(16);
        assert!(matches!(
            embedder.embed_document("   ").await,
            Err(EmbedError::EmptyInput)
        ));
    }
}
