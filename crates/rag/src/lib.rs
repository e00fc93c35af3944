//! Retrieval for the textbook assistant
//!
//! Features:
//! - OpenAI-compatible query embeddings
//! - Subject indexes backed by Pinecone (REST) or Qdrant
//! - Query routing: probe both textbooks, select the ones with hits
//! - Evidence aggregation in canonical subject order

pub mod aggregator;
pub mod embeddings;
pub mod factory;
pub mod pinecone;
pub mod router;
pub mod vector_store;

pub use aggregator::EvidenceAggregator;
pub use embeddings::{OpenAIEmbedder, OpenAIEmbeddingConfig};
pub use factory::{build_embedder, connect_indexes};
pub use pinecone::{PineconeIndex, PineconeIndexConfig};
pub use router::{Classification, IndexHandle, QueryRouter, SubjectIndexes};
pub use vector_store::{QdrantIndex, QdrantIndexConfig};

use thiserror::Error;

/// RAG errors
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<RagError> for textbook_chat_core::Error {
    fn from(err: RagError) -> Self {
        use textbook_chat_core::Error;

        match err {
            RagError::Embedding(msg) => Error::Embedding(msg),
            RagError::Timeout(what) => Error::Timeout(what),
            RagError::Configuration(msg) => Error::Config(msg),
            other => Error::Index(other.to_string()),
        }
    }
}
