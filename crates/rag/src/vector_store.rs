//! Subject index backed by a Qdrant collection

use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::{
    qdrant::{point_id::PointIdOptions, value::Kind, ScoredPoint, SearchPointsBuilder},
    Qdrant,
};

use textbook_chat_config::constants::{endpoints, rag};
use textbook_chat_config::Settings;
use textbook_chat_core::{Passage, Result, Subject, SubjectIndex};

use crate::RagError;

/// Qdrant index configuration
#[derive(Debug, Clone)]
pub struct QdrantIndexConfig {
    pub subject: Subject,
    /// Qdrant endpoint
    pub endpoint: String,
    /// Collection name
    pub collection: String,
    /// API key (optional)
    pub api_key: Option<String>,
    /// Payload key holding the passage text
    pub text_key: String,
    pub timeout: Duration,
}

impl QdrantIndexConfig {
    pub fn new(subject: Subject, collection: impl Into<String>) -> Self {
        Self {
            subject,
            endpoint: endpoints::QDRANT_DEFAULT.to_string(),
            collection: collection.into(),
            api_key: None,
            text_key: rag::TEXT_KEY.to_string(),
            timeout: Duration::from_secs(20),
        }
    }

    pub fn from_settings(settings: &Settings, subject: Subject) -> Self {
        let index = &settings.index;

        Self {
            subject,
            endpoint: index.qdrant.endpoint.clone(),
            collection: index.for_subject(subject).name.clone(),
            api_key: index.qdrant.api_key.clone(),
            text_key: index.qdrant.text_key.clone(),
            timeout: Duration::from_secs(index.timeout_seconds),
        }
    }
}

/// Qdrant-backed subject index
pub struct QdrantIndex {
    client: Qdrant,
    config: QdrantIndexConfig,
}

impl QdrantIndex {
    /// Create a client and check that the collection exists
    pub async fn connect(config: QdrantIndexConfig) -> std::result::Result<Self, RagError> {
        if config.collection.trim().is_empty() {
            return Err(RagError::Configuration(format!(
                "No Qdrant collection configured for {}",
                config.subject
            )));
        }

        let mut builder = Qdrant::from_url(&config.endpoint).timeout(config.timeout);

        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
            tracing::info!("Qdrant connection using API key authentication");
        }

        let client = builder
            .build()
            .map_err(|e| RagError::Connection(e.to_string()))?;

        let exists = client
            .collection_exists(&config.collection)
            .await
            .map_err(|e| RagError::Connection(e.to_string()))?;
        if !exists {
            return Err(RagError::NotFound(format!(
                "Qdrant collection {}",
                config.collection
            )));
        }

        tracing::info!(
            subject = %config.subject,
            collection = %config.collection,
            "Connected Qdrant index"
        );

        Ok(Self { client, config })
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> std::result::Result<Vec<Passage>, RagError> {
        let request = SearchPointsBuilder::new(
            &self.config.collection,
            query_embedding.to_vec(),
            top_k as u64,
        )
        .with_payload(true);

        let results = self
            .client
            .search_points(request)
            .await
            .map_err(|e| RagError::Search(e.to_string()))?;

        Ok(results
            .result
            .into_iter()
            .filter_map(|point| point_to_passage(point, self.config.subject, &self.config.text_key))
            .collect())
    }
}

/// Convert a scored point into a passage; points without text are dropped
fn point_to_passage(point: ScoredPoint, subject: Subject, text_key: &str) -> Option<Passage> {
    let text = point.payload.get(text_key).and_then(|v| match &v.kind {
        Some(Kind::StringValue(s)) => Some(s.clone()),
        _ => None,
    });

    let id = point.id.and_then(|pid| match pid.point_id_options {
        Some(PointIdOptions::Uuid(u)) => Some(u),
        Some(PointIdOptions::Num(n)) => Some(n.to_string()),
        None => None,
    });

    let Some(text) = text else {
        tracing::warn!(?id, "Point has no text payload, skipping");
        return None;
    };

    let mut passage = Passage::new(subject, text).with_score(point.score);
    passage.id = id;
    Some(passage)
}

#[async_trait]
impl SubjectIndex for QdrantIndex {
    async fn similarity_search(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<Passage>> {
        Ok(self.search(query_vector, top_k).await?)
    }

    fn subject(&self) -> Subject {
        self.config.subject
    }

    fn name(&self) -> &str {
        &self.config.collection
    }
}
