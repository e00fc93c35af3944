//! Evidence aggregation
//!
//! Retrieves passages from the selected indexes and concatenates them in
//! selection order. No deduplication, no re-ranking, no cap beyond each
//! index's `top_k`.

use std::sync::Arc;

use futures::future::try_join_all;
use textbook_chat_core::{Embedder, Passage, Result};

use crate::router::IndexHandle;

/// Evidence aggregator
pub struct EvidenceAggregator {
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl EvidenceAggregator {
    pub fn new(embedder: Arc<dyn Embedder>, top_k: usize) -> Self {
        Self { embedder, top_k }
    }

    /// Gather evidence for `question` from `indexes`.
    ///
    /// With no indexes nothing is embedded or searched.
    pub async fn gather(&self, question: &str, indexes: &[IndexHandle]) -> Result<Vec<Passage>> {
        if indexes.is_empty() {
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed(question).await?;
        self.gather_vector(&vector, indexes).await
    }

    /// Gather evidence for an already embedded question
    pub async fn gather_vector(
        &self,
        query_vector: &[f32],
        indexes: &[IndexHandle],
    ) -> Result<Vec<Passage>> {
        if indexes.is_empty() {
            return Ok(Vec::new());
        }

        // try_join_all keeps input order
        let per_index = try_join_all(
            indexes
                .iter()
                .map(|handle| handle.search(query_vector, self.top_k)),
        )
        .await?;

        let passages: Vec<Passage> = per_index.into_iter().flatten().collect();
        tracing::debug!(
            indexes = indexes.len(),
            passages = passages.len(),
            "Evidence gathered"
        );

        Ok(passages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use textbook_chat_core::{Error, Subject, SubjectIndex};

    struct CountingEmbedder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![0.0, 1.0])
        }

        fn model_name(&self) -> &str {
            "counting"
        }
    }

    struct ListIndex {
        subject: Subject,
        texts: Vec<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SubjectIndex for ListIndex {
        async fn similarity_search(&self, _v: &[f32], top_k: usize) -> Result<Vec<Passage>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.texts.first() == Some(&"boom") {
                return Err(Error::Index("boom".to_string()));
            }
            Ok(self
                .texts
                .iter()
                .take(top_k)
                .map(|t| Passage::new(self.subject, *t))
                .collect())
        }

        fn subject(&self) -> Subject {
            self.subject
        }

        fn name(&self) -> &str {
            "list"
        }
    }

    fn list(subject: Subject, texts: &[&'static str]) -> Arc<ListIndex> {
        Arc::new(ListIndex {
            subject,
            texts: texts.to_vec(),
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_empty_indexes_makes_no_calls() {
        let embedder = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        });
        let aggregator = EvidenceAggregator::new(embedder.clone(), 4);

        let passages = aggregator.gather("q", &[]).await.unwrap();
        assert!(passages.is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_concatenates_in_order_without_dedup() {
        let embedder = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        });
        let inn = list(Subject::Innovations, &["shared", "i2"]);
        let eco = list(Subject::Economics, &["shared", "e2", "e3"]);
        let aggregator = EvidenceAggregator::new(embedder.clone(), 4);

        let passages = aggregator
            .gather("q", &[IndexHandle::new(inn), IndexHandle::new(eco)])
            .await
            .unwrap();

        let texts: Vec<_> = passages.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["shared", "i2", "shared", "e2", "e3"]);
        assert_eq!(passages[0].subject, Subject::Innovations);
        assert_eq!(passages[2].subject, Subject::Economics);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_only_selected_index_is_queried() {
        let embedder = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        });
        let inn = list(Subject::Innovations, &["i1"]);
        let eco = list(Subject::Economics, &["e1"]);
        let aggregator = EvidenceAggregator::new(embedder, 4);

        aggregator
            .gather("q", &[IndexHandle::new(eco.clone())])
            .await
            .unwrap();
        assert_eq!(inn.calls.load(Ordering::SeqCst), 0);
        assert_eq!(eco.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_index_failure_propagates() {
        let embedder = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
        });
        let aggregator = EvidenceAggregator::new(embedder, 4);
        let result = aggregator
            .gather("q", &[IndexHandle::new(list(Subject::Economics, &["boom"]))])
            .await;
        assert!(result.is_err());
    }
}
