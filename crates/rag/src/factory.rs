//! Builds the retrieval providers from settings
//!
//! ```ignore
//! let embedder = build_embedder(&settings)?;
//! let indexes = connect_indexes(&settings).await?;
//! let router = QueryRouter::new(Arc::new(embedder), indexes, settings.index.top_k);
//! ```

use std::sync::Arc;

use textbook_chat_config::{IndexBackend, Settings};
use textbook_chat_core::{Subject, SubjectIndex};

use crate::embeddings::{OpenAIEmbedder, OpenAIEmbeddingConfig};
use crate::pinecone::{PineconeIndex, PineconeIndexConfig};
use crate::router::{IndexHandle, SubjectIndexes};
use crate::vector_store::{QdrantIndex, QdrantIndexConfig};
use crate::RagError;

/// Create the query embedder
pub fn build_embedder(settings: &Settings) -> Result<OpenAIEmbedder, RagError> {
    OpenAIEmbedder::new(OpenAIEmbeddingConfig::from_settings(settings))
}

/// Connect both subject indexes using the configured backend
pub async fn connect_indexes(settings: &Settings) -> Result<SubjectIndexes, RagError> {
    let innovations = connect_index(settings, Subject::Innovations).await?;
    let economics = connect_index(settings, Subject::Economics).await?;
    Ok(SubjectIndexes::new(innovations, economics))
}

async fn connect_index(settings: &Settings, subject: Subject) -> Result<IndexHandle, RagError> {
    let index: Arc<dyn SubjectIndex> = match settings.index.backend {
        IndexBackend::Pinecone => Arc::new(
            PineconeIndex::connect(PineconeIndexConfig::from_settings(settings, subject)).await?,
        ),
        IndexBackend::Qdrant => Arc::new(
            QdrantIndex::connect(QdrantIndexConfig::from_settings(settings, subject)).await?,
        ),
    };

    let min_score = settings.index.for_subject(subject).min_score;
    Ok(IndexHandle::new(index).with_min_score(min_score))
}

#[cfg(test)]
mod tests {
    use super::*;
    use textbook_chat_config::SubjectIndexConfig;

    #[test]
    fn test_build_embedder_uses_settings_model() {
        let mut settings = Settings::default();
        settings.embedding.model = "text-embedding-3-small".to_string();
        let embedder = build_embedder(&settings).unwrap();
        assert_eq!(
            textbook_chat_core::Embedder::model_name(&embedder),
            "text-embedding-3-small"
        );
    }

    #[tokio::test]
    async fn test_connect_fails_without_index_names() {
        let mut settings = Settings::default();
        settings.index.innovations = SubjectIndexConfig::default();
        assert!(matches!(
            connect_indexes(&settings).await,
            Err(RagError::Configuration(_))
        ));

        settings.index.backend = IndexBackend::Qdrant;
        assert!(matches!(
            connect_indexes(&settings).await,
            Err(RagError::Configuration(_))
        ));
    }
}
