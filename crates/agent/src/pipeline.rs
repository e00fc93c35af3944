//! Per-turn question answering pipeline
//!
//! ```text
//! question -> embed (once) -> route -> gather -> synthesize -> answer
//! ```
//!
//! With `reuse_probe_results` the routing probes double as the evidence, so
//! each index is queried once per turn. Without it the selected indexes are
//! queried a second time by the aggregator.

use std::sync::Arc;
use std::time::Instant;

use textbook_chat_config::{PromptsConfig, Settings};
use textbook_chat_core::{CompletionProvider, Embedder, Result, SubjectSelection};
use textbook_chat_rag::{EvidenceAggregator, QueryRouter, SubjectIndexes};

use crate::synthesizer::AnswerSynthesizer;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct QaPipelineConfig {
    /// Passages requested per index
    pub top_k: usize,
    pub reuse_probe_results: bool,
    pub prompts: PromptsConfig,
}

impl Default for QaPipelineConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            reuse_probe_results: true,
            prompts: PromptsConfig::default(),
        }
    }
}

impl QaPipelineConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            top_k: settings.index.top_k,
            reuse_probe_results: settings.routing.reuse_probe_results,
            prompts: settings.prompts.clone(),
        }
    }
}

/// Outcome of one answered question
#[derive(Debug, Clone, PartialEq)]
pub struct TurnAnswer {
    pub selection: SubjectSelection,
    /// Number of passages handed to the synthesizer
    pub passages_used: usize,
    pub answer: String,
}

pub struct QaPipeline {
    embedder: Arc<dyn Embedder>,
    router: QueryRouter,
    aggregator: EvidenceAggregator,
    synthesizer: AnswerSynthesizer,
    reuse_probe_results: bool,
}

impl QaPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        indexes: SubjectIndexes,
        completion: Arc<dyn CompletionProvider>,
        config: QaPipelineConfig,
    ) -> Self {
        Self {
            router: QueryRouter::new(embedder.clone(), indexes, config.top_k),
            aggregator: EvidenceAggregator::new(embedder.clone(), config.top_k),
            synthesizer: AnswerSynthesizer::with_prompts(completion, config.prompts),
            embedder,
            reuse_probe_results: config.reuse_probe_results,
        }
    }

    pub fn prompts(&self) -> &PromptsConfig {
        self.synthesizer.prompts()
    }

    /// Answer one question. Any provider failure aborts the whole turn.
    pub async fn run(&self, question: &str) -> Result<TurnAnswer> {
        let start = Instant::now();

        let vector = self.embedder.embed(question).await?;
        let classification = self.router.classify_vector(&vector).await?;
        let selection = classification.selection();

        let passages = if self.reuse_probe_results {
            classification.into_passages()
        } else {
            self.aggregator
                .gather_vector(&vector, &classification.indexes())
                .await?
        };

        let answer = self.synthesizer.answer(question, &passages).await?;

        tracing::info!(
            selection = %selection,
            passages = passages.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Question answered"
        );

        Ok(TurnAnswer {
            selection,
            passages_used: passages.len(),
            answer,
        })
    }
}
