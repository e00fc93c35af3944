//! Vector index traits

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Result, Subject};

/// Vector similarity index over one subject collection
///
/// Implementations:
/// - `PineconeIndex` - Pinecone serverless/pod index over REST
/// - `QdrantIndex` - Qdrant collection
///
/// # Example
///
/// ```ignore
/// let index: Arc<dyn SubjectIndex> = Arc::new(PineconeIndex::connect(config).await?);
/// let vector = embedder.embed("Какво е трансакционна цена?").await?;
/// for passage in index.similarity_search(&vector, 4).await? {
///     println!("[{}] {}", passage.subject, passage.text);
/// }
/// ```
#[async_trait]
pub trait SubjectIndex: Send + Sync + 'static {
    /// Return up to `top_k` passages closest to `query_vector`, best first.
    ///
    /// An empty result is a normal outcome, not an error.
    async fn similarity_search(
        &self,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<Passage>>;

    /// Subject this index was built over. Every returned passage carries it.
    fn subject(&self) -> Subject;

    /// Index name for logging
    fn name(&self) -> &str;
}

/// Retrieved unit of evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Passage text
    pub text: String,
    /// Collection the passage came from
    pub subject: Subject,
    /// Identifier inside the index, when the backend exposes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Similarity score reported by the index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl Passage {
    pub fn new(subject: Subject, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            subject,
            id: None,
            score: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }

    /// Whether the passage clears an optional similarity floor.
    /// Passages without a score always pass.
    pub fn meets_score(&self, min_score: Option<f32>) -> bool {
        match (min_score, self.score) {
            (Some(min), Some(score)) => score >= min,
            _ => true,
        }
    }
}
