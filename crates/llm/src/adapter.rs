//! Completion provider adapter
//!
//! Bridges the `LlmBackend` trait to the core `CompletionProvider` trait by
//! "stuffing" every passage into the retrieval-QA system message.

use std::sync::Arc;

use async_trait::async_trait;

use textbook_chat_config::prompts::RETRIEVAL_QA_SYSTEM;
use textbook_chat_core::{CompletionProvider, Passage, Result};

use crate::backend::{FinishReason, LlmBackend};
use crate::prompt::PromptBuilder;

/// Adapter that wraps an `LlmBackend` as a `CompletionProvider`.
///
/// # Example
///
/// ```ignore
/// let backend = OpenAIBackend::new(OpenAIConfig::from_settings(&settings))?;
/// let provider: Arc<dyn CompletionProvider> = Arc::new(
///     StuffDocumentsAdapter::new(backend)
///         .with_system_template(settings.prompts.retrieval_qa_system.clone()),
/// );
/// ```
pub struct StuffDocumentsAdapter {
    backend: Arc<dyn LlmBackend>,
    system_template: String,
    model_name: String,
}

impl StuffDocumentsAdapter {
    pub fn new<B: LlmBackend + 'static>(backend: B) -> Self {
        Self::from_arc(Arc::new(backend))
    }

    pub fn from_arc(backend: Arc<dyn LlmBackend>) -> Self {
        let model_name = backend.model_name().to_string();
        Self {
            backend,
            system_template: RETRIEVAL_QA_SYSTEM.to_string(),
            model_name,
        }
    }

    /// Override the system template; it must contain `{context}`
    pub fn with_system_template(mut self, template: impl Into<String>) -> Self {
        self.system_template = template.into();
        self
    }
}

#[async_trait]
impl CompletionProvider for StuffDocumentsAdapter {
    async fn complete(&self, instruction: &str, context: &[Passage]) -> Result<String> {
        let messages = PromptBuilder::new(self.system_template.as_str())
            .context(context)
            .user(instruction)
            .build();

        tracing::debug!(
            model = %self.model_name,
            passages = context.len(),
            "Requesting grounded completion"
        );

        let result = self.backend.generate(&messages).await?;
        if result.finish_reason != FinishReason::Stop {
            // The partial answer is still shown
            tracing::warn!(
                model = %self.model_name,
                finish_reason = ?result.finish_reason,
                tokens = result.tokens,
                "Completion ended early"
            );
        }
        Ok(result.text)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn is_available(&self) -> bool {
        self.backend.is_available().await
    }
}
