//! Answer synthesis
//!
//! Turns a question and its evidence into the final answer. Without evidence
//! the fixed fallback is returned and the completion provider is never
//! called.

use std::sync::Arc;

use textbook_chat_config::PromptsConfig;
use textbook_chat_core::{CompletionProvider, Passage, Result};

pub struct AnswerSynthesizer {
    provider: Arc<dyn CompletionProvider>,
    prompts: PromptsConfig,
}

impl AnswerSynthesizer {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self::with_prompts(provider, PromptsConfig::default())
    }

    pub fn with_prompts(provider: Arc<dyn CompletionProvider>, prompts: PromptsConfig) -> Self {
        Self { provider, prompts }
    }

    pub fn prompts(&self) -> &PromptsConfig {
        &self.prompts
    }

    /// Answer `question` from `passages`.
    ///
    /// The provider output is returned verbatim; it is not trimmed or
    /// checked for language.
    pub async fn answer(&self, question: &str, passages: &[Passage]) -> Result<String> {
        if passages.is_empty() {
            tracing::debug!("No evidence, returning fallback");
            return Ok(self.prompts.no_evidence_message.clone());
        }

        let instruction = self.prompts.instruction_for(question);
        self.provider.complete(&instruction, passages).await
    }
}
