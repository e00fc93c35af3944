//! OpenAI-compatible embeddings
//!
//! Embeds questions with the same model the textbook indexes were built with.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use textbook_chat_config::{constants::endpoints, Settings};
use textbook_chat_core::{Embedder, Result};

use crate::RagError;

/// Embedding configuration
#[derive(Clone)]
pub struct OpenAIEmbeddingConfig {
    /// API endpoint
    pub endpoint: String,
    pub api_key: String,
    /// Model name
    pub model: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for OpenAIEmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIEmbeddingConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Default for OpenAIEmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: endpoints::OPENAI_DEFAULT.to_string(),
            api_key: String::new(),
            model: "text-embedding-ada-002".to_string(),
            timeout: Duration::from_secs(20),
        }
    }
}

impl OpenAIEmbeddingConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            endpoint: settings.openai.endpoint.clone(),
            api_key: settings.openai.api_key.clone(),
            model: settings.embedding.model.clone(),
            timeout: Duration::from_secs(settings.embedding.timeout_seconds),
        }
    }
}

/// Request to the embedding API
#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

/// Response from the embedding API
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// OpenAI embedder
pub struct OpenAIEmbedder {
    client: Client,
    config: OpenAIEmbeddingConfig,
}

impl OpenAIEmbedder {
    pub fn new(config: OpenAIEmbeddingConfig) -> std::result::Result<Self, RagError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RagError::Configuration(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn url(&self) -> String {
        format!("{}/embeddings", self.config.endpoint.trim_end_matches('/'))
    }

    async fn embed_raw(&self, text: &str) -> std::result::Result<Vec<f32>, RagError> {
        let request = EmbedRequest {
            model: &self.config.model,
            input: text,
        };

        let mut builder = self.client.post(self.url()).json(&request);
        if !self.config.api_key.is_empty() {
            builder = builder.bearer_auth(&self.config.api_key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                RagError::Timeout("embedding request".to_string())
            } else {
                RagError::Embedding(format!("Embedding request failed: {}", e))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(RagError::Embedding(format!(
                "Embedding failed: {} - {}",
                status, text
            )));
        }

        let embed_response: EmbedResponse = response
            .json()
            .await
            .map_err(|e| RagError::Embedding(format!("Failed to parse embedding response: {}", e)))?;

        embed_response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| RagError::Embedding("No embedding returned".to_string()))
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_raw(text).await?)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use textbook_chat_core::Error;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn config(endpoint: String) -> OpenAIEmbeddingConfig {
        OpenAIEmbeddingConfig {
            endpoint,
            api_key: "sk-test".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_config_default() {
        let config = OpenAIEmbeddingConfig::default();
        assert_eq!(config.model, "text-embedding-ada-002");
        assert!(!format!("{:?}", config).contains("api_key"));
    }

    #[tokio::test]
    async fn test_embed() {
        let app = Router::new().route(
            "/embeddings",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["model"], "text-embedding-ada-002");
                let len = body["input"].as_str().unwrap_or_default().chars().count();
                Json(serde_json::json!({
                    "data": [{"embedding": [len as f32, 0.5], "index": 0}],
                    "model": "text-embedding-ada-002"
                }))
            }),
        );
        let embedder = OpenAIEmbedder::new(config(serve(app).await)).unwrap();

        let vector = embedder.embed("иновация").await.unwrap();
        assert_eq!(vector, vec![8.0, 0.5]);
        assert_eq!(embedder.model_name(), "text-embedding-ada-002");
    }

    #[tokio::test]
    async fn test_embed_error_is_provider_failure() {
        let app = Router::new().route(
            "/embeddings",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "quota exceeded") }),
        );
        let embedder = OpenAIEmbedder::new(config(serve(app).await)).unwrap();

        let err = embedder.embed("q").await.unwrap_err();
        assert!(matches!(err, Error::Embedding(ref msg) if msg.contains("quota exceeded")));
        assert!(err.is_provider_failure());
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let app = Router::new().route(
            "/embeddings",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Json(serde_json::json!({"data": [{"embedding": [1.0]}]}))
            }),
        );
        let embedder = OpenAIEmbedder::new(OpenAIEmbeddingConfig {
            timeout: Duration::from_secs(1),
            ..config(serve(app).await)
        })
        .unwrap();

        let err = embedder.embed("q").await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)), "got {:?}", err);
        assert!(err.is_provider_failure());
    }
}
