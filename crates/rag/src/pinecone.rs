//! Pinecone subject index
//!
//! Talks to the Pinecone data plane over REST. When no host is configured the
//! index name is resolved through the control plane once, at connect time.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use textbook_chat_config::constants::{endpoints, rag};
use textbook_chat_config::Settings;
use textbook_chat_core::{Passage, Result, Subject, SubjectIndex};

use crate::RagError;

/// Pinecone index configuration
#[derive(Clone)]
pub struct PineconeIndexConfig {
    pub subject: Subject,
    /// Index name
    pub index_name: String,
    /// Data-plane host; resolved from `index_name` when `None`
    pub host: Option<String>,
    pub api_key: String,
    pub control_plane_url: String,
    pub namespace: Option<String>,
    /// Metadata key holding the passage text
    pub text_key: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for PineconeIndexConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PineconeIndexConfig")
            .field("subject", &self.subject)
            .field("index_name", &self.index_name)
            .field("host", &self.host)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl PineconeIndexConfig {
    pub fn new(subject: Subject, index_name: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            subject,
            index_name: index_name.into(),
            host: None,
            api_key: api_key.into(),
            control_plane_url: endpoints::PINECONE_CONTROL_PLANE.to_string(),
            namespace: None,
            text_key: rag::TEXT_KEY.to_string(),
            timeout: Duration::from_secs(20),
        }
    }

    pub fn from_settings(settings: &Settings, subject: Subject) -> Self {
        let index = &settings.index;
        let subject_config = index.for_subject(subject);

        Self {
            subject,
            index_name: subject_config.name.clone(),
            host: subject_config.host.clone(),
            api_key: index.pinecone.api_key.clone(),
            control_plane_url: index.pinecone.control_plane_url.clone(),
            namespace: index.pinecone.namespace.clone(),
            text_key: rag::TEXT_KEY.to_string(),
            timeout: Duration::from_secs(index.timeout_seconds),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: Option<f32>,
    #[serde(default)]
    metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct DescribeIndexResponse {
    host: String,
}

/// Pinecone-backed subject index
pub struct PineconeIndex {
    client: Client,
    config: PineconeIndexConfig,
    /// Resolved data-plane base URL
    host: String,
}

impl PineconeIndex {
    /// Create the client and resolve the data-plane host
    pub async fn connect(config: PineconeIndexConfig) -> std::result::Result<Self, RagError> {
        if config.index_name.trim().is_empty() && config.host.is_none() {
            return Err(RagError::Configuration(format!(
                "No Pinecone index configured for {}",
                config.subject
            )));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RagError::Configuration(e.to_string()))?;

        let host = match config.host.as_deref() {
            Some(host) => normalize_host(host),
            None => resolve_host(&client, &config).await?,
        };

        tracing::info!(
            subject = %config.subject,
            index = %config.index_name,
            host = %host,
            "Connected Pinecone index"
        );

        Ok(Self {
            client,
            config,
            host,
        })
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
    ) -> std::result::Result<Vec<Passage>, RagError> {
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
            namespace: self.config.namespace.as_deref(),
        };

        let response = self
            .client
            .post(format!("{}/query", self.host))
            .header("Api-Key", &self.config.api_key)
            .header("X-Pinecone-API-Version", endpoints::PINECONE_API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_request_error(e, &self.config.index_name))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(RagError::Search(format!(
                "Pinecone query on {} failed: {} - {}",
                self.config.index_name, status, text
            )));
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| RagError::Search(format!("Failed to parse Pinecone response: {}", e)))?;

        Ok(body
            .matches
            .into_iter()
            .filter_map(|m| self.to_passage(m))
            .collect())
    }

    fn to_passage(&self, m: QueryMatch) -> Option<Passage> {
        let text = m
            .metadata
            .as_ref()
            .and_then(|meta| meta.get(&self.config.text_key))
            .and_then(|v| v.as_str());

        let Some(text) = text else {
            tracing::warn!(
                index = %self.config.index_name,
                id = %m.id,
                "Match has no text metadata, skipping"
            );
            return None;
        };

        let mut passage = Passage::new(self.config.subject, text).with_id(m.id);
        passage.score = m.score;
        Some(passage)
    }
}

/// Look up the data-plane host for an index name
async fn resolve_host(
    client: &Client,
    config: &PineconeIndexConfig,
) -> std::result::Result<String, RagError> {
    let url = format!(
        "{}/indexes/{}",
        config.control_plane_url.trim_end_matches('/'),
        config.index_name
    );

    let response = client
        .get(&url)
        .header("Api-Key", &config.api_key)
        .header("X-Pinecone-API-Version", endpoints::PINECONE_API_VERSION)
        .send()
        .await
        .map_err(|e| RagError::Connection(format!("Pinecone control plane: {}", e)))?;

    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(RagError::NotFound(format!(
            "Pinecone index {}",
            config.index_name
        )));
    }
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(RagError::Connection(format!(
            "Describe index {} failed: {} - {}",
            config.index_name, status, text
        )));
    }

    let described: DescribeIndexResponse = response
        .json()
        .await
        .map_err(|e| RagError::Connection(format!("Failed to parse index description: {}", e)))?;

    Ok(normalize_host(&described.host))
}

/// Pinecone reports hosts without a scheme
fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

fn map_request_error(err: reqwest::Error, index: &str) -> RagError {
    if err.is_timeout() {
        RagError::Timeout(format!("Pinecone query on {}", index))
    } else {
        RagError::Connection(format!("Pinecone query on {}: {}", index, err))
    }
}

#[async_trait]
impl SubjectIndex for PineconeIndex {
    async fn similarity_search(&self, query_vector: &[f32], top_k: usize) -> Result<Vec<Passage>> {
        Ok(self.query(query_vector, top_k).await?)
    }

    fn subject(&self) -> Subject {
        self.config.subject
    }

    fn name(&self) -> &str {
        &self.config.index_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Path,
        http::{HeaderMap, StatusCode},
        routing::{get, post},
        Json, Router,
    };
    use textbook_chat_core::Error;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn query_handler(
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> std::result::Result<Json<serde_json::Value>, StatusCode> {
        if headers.get("Api-Key").and_then(|v| v.to_str().ok()) != Some("pc-test") {
            return Err(StatusCode::UNAUTHORIZED);
        }
        assert_eq!(body["includeMetadata"], true);
        let top_k = body["topK"].as_u64().unwrap_or(0) as usize;

        let matches: Vec<_> = [
            serde_json::json!({"id": "a", "score": 0.9, "metadata": {"text": "Първи пасаж"}}),
            serde_json::json!({"id": "b", "score": 0.8, "metadata": {"page": 3}}),
            serde_json::json!({"id": "c", "score": 0.7, "metadata": {"text": "Трети пасаж"}}),
        ]
        .into_iter()
        .take(top_k)
        .collect();

        Ok(Json(serde_json::json!({"matches": matches, "namespace": ""})))
    }

    fn config(host: Option<String>, api_key: &str) -> PineconeIndexConfig {
        let mut config = PineconeIndexConfig::new(Subject::Economics, "inst-ikonomika", api_key);
        config.host = host;
        config
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(
            normalize_host("idx-abc.svc.pinecone.io"),
            "https://idx-abc.svc.pinecone.io"
        );
        assert_eq!(normalize_host("http://127.0.0.1:5080/"), "http://127.0.0.1:5080");
    }

    #[test]
    fn test_query_request_serialization() {
        let request = QueryRequest {
            vector: &[0.1, 0.2],
            top_k: 4,
            include_metadata: true,
            include_values: false,
            namespace: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["topK"], 4);
        assert_eq!(json["includeMetadata"], true);
        assert!(json.get("namespace").is_none());
    }

    #[tokio::test]
    async fn test_connect_requires_name_or_host() {
        let mut config = config(None, "pc-test");
        config.index_name.clear();
        assert!(matches!(
            PineconeIndex::connect(config).await,
            Err(RagError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_similarity_search_skips_matches_without_text() {
        let host = serve(Router::new().route("/query", post(query_handler))).await;
        let index = PineconeIndex::connect(config(Some(host), "pc-test"))
            .await
            .unwrap();

        let passages = index.similarity_search(&[0.1, 0.2], 4).await.unwrap();
        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].text, "Първи пасаж");
        assert_eq!(passages[0].id.as_deref(), Some("a"));
        assert_eq!(passages[0].score, Some(0.9));
        assert_eq!(passages[1].text, "Трети пасаж");
        assert!(passages.iter().all(|p| p.subject == Subject::Economics));
        assert_eq!(index.subject(), Subject::Economics);
        assert_eq!(index.name(), "inst-ikonomika");
    }

    #[tokio::test]
    async fn test_auth_failure_is_provider_error() {
        let host = serve(Router::new().route("/query", post(query_handler))).await;
        let index = PineconeIndex::connect(config(Some(host), "wrong"))
            .await
            .unwrap();

        let err = index.similarity_search(&[0.1], 4).await.unwrap_err();
        assert!(err.is_provider_failure());
    }

    #[tokio::test]
    async fn test_host_resolved_via_control_plane() {
        // One server plays both control plane and data plane
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let data_plane = format!("http://{}", addr);
        let described_host = data_plane.clone();

        let app = Router::new()
            .route(
                "/indexes/:name",
                get(move |Path(name): Path<String>| {
                    let host = described_host.clone();
                    async move {
                        if name == "inst-ikonomika" {
                            Ok(Json(serde_json::json!({"name": name, "host": host})))
                        } else {
                            Err(StatusCode::NOT_FOUND)
                        }
                    }
                }),
            )
            .route("/query", post(query_handler));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let mut found = config(None, "pc-test");
        found.control_plane_url = data_plane.clone();
        let index = PineconeIndex::connect(found).await.unwrap();
        assert_eq!(index.similarity_search(&[0.1], 1).await.unwrap().len(), 1);

        let mut missing = config(None, "pc-test");
        missing.control_plane_url = data_plane;
        missing.index_name = "unknown".to_string();
        assert!(matches!(
            PineconeIndex::connect(missing).await,
            Err(RagError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_slow_query_times_out() {
        let host = serve(Router::new().route(
            "/query",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Json(serde_json::json!({"matches": []}))
            }),
        ))
        .await;
        let mut slow = config(Some(host), "pc-test");
        slow.timeout = Duration::from_secs(1);
        let index = PineconeIndex::connect(slow).await.unwrap();

        let err = index.similarity_search(&[0.1], 4).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)), "got {:?}", err);
    }
}
