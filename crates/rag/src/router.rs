//! Query routing
//!
//! Decides which textbook(s) a question belongs to by probing every subject
//! index with the question vector. A subject is selected iff its probe
//! returned at least one passage.

use std::sync::Arc;

use textbook_chat_core::{Embedder, Passage, Result, Subject, SubjectIndex, SubjectSelection};

/// Shared handle to one subject index plus its optional score floor
#[derive(Clone)]
pub struct IndexHandle {
    index: Arc<dyn SubjectIndex>,
    min_score: Option<f32>,
}

impl std::fmt::Debug for IndexHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexHandle")
            .field("subject", &self.subject())
            .field("name", &self.name())
            .field("min_score", &self.min_score)
            .finish()
    }
}

impl IndexHandle {
    pub fn new(index: Arc<dyn SubjectIndex>) -> Self {
        Self {
            index,
            min_score: None,
        }
    }

    pub fn with_min_score(mut self, min_score: Option<f32>) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn subject(&self) -> Subject {
        self.index.subject()
    }

    pub fn name(&self) -> &str {
        self.index.name()
    }

    /// Similarity search with the score floor applied.
    /// Order from the index is preserved.
    pub async fn search(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<Passage>> {
        let mut passages = self.index.similarity_search(query_vector, top_k).await?;
        if self.min_score.is_some() {
            passages.retain(|p| p.meets_score(self.min_score));
        }

        tracing::debug!(
            subject = %self.subject(),
            index = %self.name(),
            hits = passages.len(),
            "Index searched"
        );

        Ok(passages)
    }
}

/// The two subject indexes
#[derive(Debug, Clone)]
pub struct SubjectIndexes {
    innovations: IndexHandle,
    economics: IndexHandle,
}

impl SubjectIndexes {
    pub fn new(innovations: IndexHandle, economics: IndexHandle) -> Self {
        Self {
            innovations,
            economics,
        }
    }

    pub fn get(&self, subject: Subject) -> &IndexHandle {
        match subject {
            Subject::Innovations => &self.innovations,
            Subject::Economics => &self.economics,
        }
    }

    /// Handles in canonical subject order
    pub fn iter(&self) -> impl Iterator<Item = &IndexHandle> {
        Subject::ALL.into_iter().map(move |s| self.get(s))
    }
}

/// One selected index together with the passages its probe returned
#[derive(Debug, Clone)]
struct Probe {
    handle: IndexHandle,
    passages: Vec<Passage>,
}

/// Result of routing one question
#[derive(Debug, Clone)]
pub struct Classification {
    selection: SubjectSelection,
    probes: Vec<Probe>,
}

impl Classification {
    fn from_probes(probes: Vec<Probe>) -> Self {
        let subjects: Vec<Subject> = probes.iter().map(|p| p.handle.subject()).collect();
        Self {
            selection: SubjectSelection::from_subjects(&subjects),
            probes,
        }
    }

    pub fn selection(&self) -> SubjectSelection {
        self.selection
    }

    /// Selected indexes, innovations first
    pub fn indexes(&self) -> Vec<IndexHandle> {
        self.probes.iter().map(|p| p.handle.clone()).collect()
    }

    /// Probe passages of every selected index, concatenated in selection order
    pub fn into_passages(self) -> Vec<Passage> {
        self.probes.into_iter().flat_map(|p| p.passages).collect()
    }
}

/// Query router
pub struct QueryRouter {
    embedder: Arc<dyn Embedder>,
    indexes: SubjectIndexes,
    top_k: usize,
}

impl QueryRouter {
    pub fn new(embedder: Arc<dyn Embedder>, indexes: SubjectIndexes, top_k: usize) -> Self {
        Self {
            embedder,
            indexes,
            top_k,
        }
    }

    pub fn indexes(&self) -> &SubjectIndexes {
        &self.indexes
    }

    /// Embed the question and classify it
    pub async fn classify(&self, question: &str) -> Result<Classification> {
        let vector = self.embedder.embed(question).await?;
        self.classify_vector(&vector).await
    }

    /// Classify an already embedded question.
    ///
    /// Both indexes are probed concurrently; if either probe fails the
    /// whole classification fails.
    pub async fn classify_vector(&self, query_vector: &[f32]) -> Result<Classification> {
        let (innovations, economics) = tokio::try_join!(
            self.indexes.innovations.search(query_vector, self.top_k),
            self.indexes.economics.search(query_vector, self.top_k),
        )?;

        let probes: Vec<Probe> = [
            (&self.indexes.innovations, innovations),
            (&self.indexes.economics, economics),
        ]
        .into_iter()
        .filter(|(_, passages)| !passages.is_empty())
        .map(|(handle, passages)| Probe {
            handle: handle.clone(),
            passages,
        })
        .collect();

        let classification = Classification::from_probes(probes);
        tracing::info!(selection = %classification.selection(), "Question routed");

        Ok(classification)
    }
}
