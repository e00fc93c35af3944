//! Completion traits

use async_trait::async_trait;

use crate::{Passage, Result};

/// Grounded completion provider
///
/// Takes a fully formed instruction (already containing the user question)
/// and the passages to ground the answer on, and returns the model's text.
///
/// Implementations:
/// - `StuffDocumentsAdapter` - stuffs all passages into a retrieval-QA
///   system prompt and calls an `LlmBackend`
#[async_trait]
pub trait CompletionProvider: Send + Sync + 'static {
    /// Produce a completion for `instruction` grounded on `context`
    async fn complete(&self, instruction: &str, context: &[Passage]) -> Result<String>;

    /// Get model name for logging
    fn model_name(&self) -> &str;

    /// Check if the provider is reachable
    async fn is_available(&self) -> bool {
        true
    }
}
