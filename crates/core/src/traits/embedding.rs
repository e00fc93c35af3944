//! Embedding traits

use async_trait::async_trait;

use crate::Result;

/// Text embedding provider
///
/// Implementations:
/// - `OpenAIEmbedder` - OpenAI-compatible `/embeddings` endpoint
#[async_trait]
pub trait Embedder: Send + Sync + 'static {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Get model name for logging
    fn model_name(&self) -> &str;

    /// Check if the provider is reachable
    async fn is_available(&self) -> bool {
        true
    }
}
